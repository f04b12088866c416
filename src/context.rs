//! What a request actually queried, carried on responses and errors

use crate::connections::ConnectionHandle;
use crate::error::AppError;
use crate::search::TimeWindow;
use crate::store::StoreError;
use crate::tenants::Operation;
use serde::{Deserialize, Serialize};

/// Tenant, resolved environment, operation and effective window of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    pub tenant_id: String,
    pub environment: String,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
}

impl QueryContext {
    pub fn new(
        tenant_id: impl Into<String>,
        environment: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            environment: environment.into(),
            operation,
            window: None,
        }
    }

    pub fn for_handle(handle: &ConnectionHandle, operation: Operation) -> Self {
        Self::new(&handle.tenant_id, &handle.environment, operation)
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Attach this context to a store failure
    pub fn search_error(&self, source: StoreError) -> AppError {
        AppError::SearchExecution {
            tenant_id: self.tenant_id.clone(),
            environment: self.environment.clone(),
            operation: self.operation.to_string(),
            source,
        }
    }
}

/// Operation payload together with its query context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse<T> {
    pub context: QueryContext,
    pub data: T,
}

impl<T> OperationResponse<T> {
    pub fn new(context: QueryContext, data: T) -> Self {
        Self { context, data }
    }
}
