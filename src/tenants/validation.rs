//! Cross-field validation of tenant configuration

use crate::error::{AppError, Result};
use crate::tenants::models::TenantConfig;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate one tenant, reporting every problem found in a single error
pub fn validate_tenant(tenant_id: &str, tenant: &TenantConfig) -> Result<()> {
    let mut problems = Vec::new();

    if tenant_id.trim().is_empty() {
        problems.push("tenant id must not be empty".to_string());
    }

    if let Err(errors) = tenant.validate() {
        collect_messages(&errors, &mut problems);
    }

    if tenant.environments.is_empty() {
        problems.push("at least one environment is required".to_string());
    } else if !tenant.environments.values().any(|env| env.has_endpoint()) {
        problems.push("at least one environment must have an endpoint".to_string());
    }

    if let Some(default_env) = &tenant.default_environment {
        match tenant.environments.get(default_env) {
            None => problems.push(format!(
                "default environment '{}' is not configured",
                default_env
            )),
            Some(env) if !env.has_endpoint() => problems.push(format!(
                "default environment '{}' has no endpoint",
                default_env
            )),
            Some(_) => {}
        }
    }

    let patterns = &tenant.index_patterns;
    let all_patterns = patterns
        .exceptions
        .iter()
        .chain(patterns.applications.iter())
        .chain(patterns.logs.iter().flatten());
    if all_patterns.into_iter().any(|p| p.trim().is_empty()) {
        problems.push("index patterns must not contain empty entries".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Configuration(format!(
            "invalid configuration for tenant '{}': {}",
            tenant_id,
            problems.join("; ")
        )))
    }
}

fn collect_messages(errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    match &error.message {
                        Some(message) => out.push(message.to_string()),
                        None => out.push(format!("{} is invalid ({})", field, error.code)),
                    }
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(nested, out),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect_messages(nested, out);
                }
            }
        }
    }
}
