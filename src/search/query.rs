//! Translation of caller filters into store query documents

use crate::error::{AppError, Result};
use crate::search::fields;
use crate::tenants::TenantConfig;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use validator::Validate;

/// Result size for exception search when the caller gives no limit
pub const DEFAULT_EXCEPTION_LIMIT: usize = 20;

/// Relative window shorthand
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    #[strum(serialize = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    #[strum(serialize = "6h")]
    SixHours,
    #[serde(rename = "12h")]
    #[strum(serialize = "12h")]
    TwelveHours,
    #[serde(rename = "24h")]
    #[strum(serialize = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    #[strum(serialize = "7d")]
    SevenDays,
}

impl Timeframe {
    /// Parse a token, falling back to 24h for anything unrecognized
    pub fn parse_lenient(token: &str) -> Self {
        Timeframe::from_str(token.trim()).unwrap_or(Timeframe::OneDay)
    }

    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::OneHour => Duration::hours(1),
            Timeframe::SixHours => Duration::hours(6),
            Timeframe::TwelveHours => Duration::hours(12),
            Timeframe::OneDay => Duration::hours(24),
            Timeframe::SevenDays => Duration::hours(168),
        }
    }
}

/// Absolute time window, both bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `duration` ending at `now`
    pub fn last(duration: Duration, now: DateTime<Utc>) -> Self {
        Self {
            start: now - duration,
            end: now,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Point splitting the window into first and second halves
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start + self.duration() / 2
    }
}

/// Caller-supplied search and analysis filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
    pub text_query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeWindow>,

    /// One of `1h`, `6h`, `12h`, `24h`, `7d`; other tokens mean `24h`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "limit must be at least 1"))]
    pub limit: Option<usize>,

    #[serde(default)]
    pub sort_by_frequency: bool,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_text_query(mut self, text: impl Into<String>) -> Self {
        self.text_query = Some(text.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.time_range = Some(TimeWindow::new(start, end));
        self
    }

    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = Some(timeframe.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sort_by_frequency(mut self, enabled: bool) -> Self {
        self.sort_by_frequency = enabled;
        self
    }

    /// Trimmed free-text query, if any
    pub fn text(&self) -> Option<&str> {
        self.text_query
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Field rules plus the `timeRange`/`timeframe` exclusivity rule
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        if self.time_range.is_some() && self.timeframe.is_some() {
            return Err(AppError::Validation(
                "timeRange and timeframe are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective window: explicit range verbatim, else timeframe, else the default
    pub fn resolve_window(&self, default: Duration, now: DateTime<Utc>) -> TimeWindow {
        if let Some(range) = self.time_range {
            return range;
        }
        match &self.timeframe {
            Some(token) => TimeWindow::last(Timeframe::parse_lenient(token).duration(), now),
            None => TimeWindow::last(default, now),
        }
    }
}

/// Document family a search targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchKind {
    Exceptions,
    Logs,
}

impl SearchKind {
    pub fn default_window(&self) -> Duration {
        match self {
            SearchKind::Exceptions => Duration::hours(24),
            SearchKind::Logs => Duration::hours(1),
        }
    }

    pub fn text_fields(&self) -> &'static [&'static str] {
        match self {
            SearchKind::Exceptions => &fields::EXCEPTION_TEXT_FIELDS,
            SearchKind::Logs => &fields::LOG_TEXT_FIELDS,
        }
    }
}

/// How free text is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    BestFields,
    Phrase,
}

impl TextMatch {
    fn as_str(&self) -> &'static str {
        match self {
            TextMatch::BestFields => "best_fields",
            TextMatch::Phrase => "phrase",
        }
    }
}

/// A query ready to send, plus what it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub kind: SearchKind,
    pub indices: Vec<String>,
    pub window: TimeWindow,
    pub size: usize,
    pub query: Value,
    pub sort: Value,
    pub aggregations: Option<Value>,
}

impl BuiltQuery {
    /// Full `_search` request body
    pub fn body(&self) -> Value {
        let mut body = json!({
            "query": self.query,
            "sort": self.sort,
            "size": self.size,
            "track_total_hits": true,
        });
        if let Some(aggs) = &self.aggregations {
            body["aggs"] = aggs.clone();
        }
        body
    }
}

/// Builds search queries for one tenant at one instant
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    tenant: &'a TenantConfig,
    now: DateTime<Utc>,
    default_exception_limit: usize,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(tenant: &'a TenantConfig) -> Self {
        Self {
            tenant,
            now: Utc::now(),
            default_exception_limit: DEFAULT_EXCEPTION_LIMIT,
        }
    }

    /// Pin the clock used for relative windows
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_default_exception_limit(mut self, limit: usize) -> Self {
        self.default_exception_limit = limit;
        self
    }

    pub fn target_indices(&self, kind: SearchKind) -> Vec<String> {
        match kind {
            SearchKind::Exceptions => self.tenant.exception_indices(),
            SearchKind::Logs => self.tenant.log_indices(),
        }
    }

    pub fn window(&self, kind: SearchKind, spec: &FilterSpec) -> TimeWindow {
        spec.resolve_window(kind.default_window(), self.now)
    }

    /// Requested or default size, capped by the tenant maximum
    pub fn result_size(&self, kind: SearchKind, spec: &FilterSpec) -> usize {
        let default = match kind {
            SearchKind::Exceptions => self.default_exception_limit,
            SearchKind::Logs => self.tenant.max_search_results,
        };
        spec.limit
            .unwrap_or(default)
            .min(self.tenant.max_search_results)
    }

    /// Build with the filter's own text query matched across fields
    pub fn build(&self, kind: SearchKind, spec: &FilterSpec) -> BuiltQuery {
        self.build_text(kind, spec, spec.text(), TextMatch::BestFields)
    }

    /// Build with an explicit text clause in place of the filter's text query
    pub fn build_text(
        &self,
        kind: SearchKind,
        spec: &FilterSpec,
        text: Option<&str>,
        mode: TextMatch,
    ) -> BuiltQuery {
        let window = self.window(kind, spec);

        let mut filters = vec![range_filter(&window)];
        if let Some(service) = spec.service.as_deref().filter(|s| !s.is_empty()) {
            filters.push(term_filter(fields::SERVICE_KEYWORD, service));
        }
        if kind == SearchKind::Exceptions {
            if let Some(severity) = spec.severity.as_deref().filter(|s| !s.is_empty()) {
                filters.push(term_filter(fields::LOG_LEVEL, &severity.to_lowercase()));
            }
        }

        let mut bool_query = json!({ "filter": filters });
        if let Some(text) = text {
            bool_query["must"] = json!([text_clause(text, kind.text_fields(), mode)]);
        }

        BuiltQuery {
            kind,
            indices: self.target_indices(kind),
            window,
            size: self.result_size(kind, spec),
            query: json!({ "bool": bool_query }),
            sort: timestamp_sort("desc"),
            aggregations: None,
        }
    }
}

/// Wire form of a timestamp; keeps sub-second precision
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn range_filter(window: &TimeWindow) -> Value {
    json!({
        "range": {
            (fields::TIMESTAMP): {
                "gte": format_timestamp(&window.start),
                "lte": format_timestamp(&window.end),
            }
        }
    })
}

pub fn term_filter(field: &str, value: &str) -> Value {
    json!({ "term": { (field): value } })
}

pub fn text_clause(text: &str, fields: &[&str], mode: TextMatch) -> Value {
    json!({
        "multi_match": {
            "query": text,
            "fields": fields,
            "type": mode.as_str(),
        }
    })
}

pub fn timestamp_sort(order: &str) -> Value {
    json!([{ (fields::TIMESTAMP): { "order": order } }])
}

/// Recover the time window from a built query's range filter
pub fn window_from_query(query: &Value) -> Option<TimeWindow> {
    let filters = query.pointer("/bool/filter")?.as_array()?;
    let range = filters
        .iter()
        .find_map(|filter| filter.get("range")?.get(fields::TIMESTAMP))?;

    let parse = |key: &str| {
        DateTime::parse_from_rfc3339(range.get(key)?.as_str()?)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    };
    Some(TimeWindow::new(parse("gte")?, parse("lte")?))
}
