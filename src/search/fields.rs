//! Document field names shared by queries and record mapping

pub const TIMESTAMP: &str = "@timestamp";

pub const MESSAGE: &str = "message";
pub const ERROR_MESSAGE: &str = "error.message";
pub const LOG_MESSAGE: &str = "log.message";
pub const EXCEPTION_MESSAGE: &str = "exception.message";

pub const ERROR_STACK_TRACE: &str = "error.stack_trace";
pub const EXCEPTION_STACKTRACE: &str = "exception.stacktrace";
pub const STACK_TRACE: &str = "stack_trace";

pub const SERVICE: &str = "service.name";
pub const SERVICE_KEYWORD: &str = "service.name.keyword";
pub const LOG_LEVEL: &str = "log.level";
pub const ENVIRONMENT: &str = "environment";
pub const SERVICE_ENVIRONMENT: &str = "service.environment";
pub const TAGS: &str = "tags";

/// Exact-message key used by summary and trend aggregations
pub const ERROR_MESSAGE_KEYWORD: &str = "error.message.keyword";
/// Exact-message key used by frequency ranking
pub const MESSAGE_KEYWORD: &str = "message.keyword";

/// Message precedence when normalizing a document: first non-empty wins
pub const MESSAGE_PRECEDENCE: [&str; 4] = [MESSAGE, ERROR_MESSAGE, LOG_MESSAGE, EXCEPTION_MESSAGE];

pub const STACK_TRACE_PRECEDENCE: [&str; 3] = [ERROR_STACK_TRACE, EXCEPTION_STACKTRACE, STACK_TRACE];

/// Fields searched by free text in exception indices
pub const EXCEPTION_TEXT_FIELDS: [&str; 5] = [
    MESSAGE,
    ERROR_MESSAGE,
    EXCEPTION_MESSAGE,
    ERROR_STACK_TRACE,
    EXCEPTION_STACKTRACE,
];

/// Fields searched by free text in log indices
pub const LOG_TEXT_FIELDS: [&str; 2] = [MESSAGE, LOG_MESSAGE];

/// Fields phrase-matched when analyzing one exception
pub const MESSAGE_FIELDS: [&str; 4] = [MESSAGE, ERROR_MESSAGE, EXCEPTION_MESSAGE, LOG_MESSAGE];
