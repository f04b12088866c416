//! Aggregation request bodies and bucket parsing

use crate::analytics::models::{
    AggregationSummary, FrequencyRanking, MessageSummary, ServiceCount, TimeBucket, TrendRecord,
};
use crate::analytics::statistics::trend_between;
use crate::search::fields;
use crate::search::{
    first_text, format_timestamp, lookup, parse_timestamp, range_filter, term_filter,
    text_clause, text_at, timestamp_sort, TextMatch, TimeWindow,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Histogram granularity
pub const HISTOGRAM_INTERVAL: &str = "1h";

fn histogram(window: &TimeWindow) -> Value {
    json!({
        "date_histogram": {
            "field": fields::TIMESTAMP,
            "fixed_interval": HISTOGRAM_INTERVAL,
            "min_doc_count": 0,
            "extended_bounds": {
                "min": format_timestamp(&window.start),
                "max": format_timestamp(&window.end),
            }
        }
    })
}

fn terms(field: &str, size: usize) -> Value {
    json!({ "terms": { "field": field, "size": size } })
}

fn single_hit(order: &str) -> Value {
    json!({ "top_hits": { "size": 1, "sort": timestamp_sort(order) } })
}

/// Zero-hit summary: totals, distinct messages, top messages and an hourly histogram
pub fn summary_body(window: &TimeWindow, top_messages: usize, affected_services: usize) -> Value {
    let mut top = terms(fields::ERROR_MESSAGE_KEYWORD, top_messages);
    top["aggs"] = json!({
        "first_seen": single_hit("asc"),
        "last_seen": single_hit("desc"),
        "services": terms(fields::SERVICE_KEYWORD, affected_services),
    });

    json!({
        "size": 0,
        "track_total_hits": true,
        "query": { "bool": { "filter": [range_filter(window)] } },
        "aggs": {
            "total_count": { "value_count": { "field": fields::TIMESTAMP } },
            "unique_messages": { "cardinality": { "field": fields::ERROR_MESSAGE_KEYWORD } },
            "top_messages": top,
            "timeline": histogram(window),
        }
    })
}

pub fn parse_summary(aggs: &Value) -> AggregationSummary {
    let top_messages = buckets(aggs, "top_messages")
        .iter()
        .map(|bucket| MessageSummary {
            message: bucket_key(bucket),
            count: doc_count(bucket),
            first_seen: top_hit_source(bucket, "first_seen")
                .and_then(|source| lookup(source, fields::TIMESTAMP))
                .and_then(parse_timestamp),
            last_seen: top_hit_source(bucket, "last_seen")
                .and_then(|source| lookup(source, fields::TIMESTAMP))
                .and_then(parse_timestamp),
            affected_services: buckets(bucket, "services").iter().map(bucket_key).collect(),
        })
        .collect();

    AggregationSummary {
        total_count: metric_value(aggs, "total_count"),
        unique_message_count: metric_value(aggs, "unique_messages"),
        top_messages,
        time_distribution: parse_histogram(aggs, "timeline"),
    }
}

/// Frequency ranking over documents carrying an error marker
pub fn frequent_body(window: &TimeWindow, limit: usize, service: Option<&str>) -> Value {
    let mut filters = vec![range_filter(window)];
    if let Some(service) = service.filter(|s| !s.is_empty()) {
        filters.push(term_filter(fields::SERVICE_KEYWORD, service));
    }

    let mut messages = terms(fields::MESSAGE_KEYWORD, limit);
    messages["terms"]["order"] = json!({ "_count": "desc" });
    messages["aggs"] = json!({ "latest": single_hit("desc") });

    json!({
        "size": 0,
        "query": {
            "bool": {
                "filter": filters,
                "should": [
                    { "exists": { "field": fields::ERROR_MESSAGE } },
                    { "exists": { "field": fields::EXCEPTION_MESSAGE } },
                    term_filter(fields::LOG_LEVEL, "error"),
                    term_filter(fields::LOG_LEVEL, "ERROR"),
                ],
                "minimum_should_match": 1,
            }
        },
        "aggs": { "messages": messages }
    })
}

/// Whether a document carries an error or exception message or an ERROR level
pub fn is_error_document(source: &Value) -> bool {
    first_text(source, &[fields::ERROR_MESSAGE, fields::EXCEPTION_MESSAGE]).is_some()
        || text_at(source, fields::LOG_LEVEL)
            .map_or(false, |level| level.eq_ignore_ascii_case("error"))
}

/// Ranked messages, at most `limit`, each backed by a qualifying latest occurrence
pub fn parse_frequent(aggs: &Value, limit: usize) -> Vec<FrequencyRanking> {
    let mut rankings: Vec<FrequencyRanking> = buckets(aggs, "messages")
        .iter()
        .filter_map(|bucket| {
            let message = bucket_key(bucket);
            let latest = top_hit_source(bucket, "latest")?;
            if message.trim().is_empty() || !is_error_document(latest) {
                return None;
            }
            Some(FrequencyRanking {
                message,
                count: doc_count(bucket),
                last_service: text_at(latest, fields::SERVICE),
                last_seen: lookup(latest, fields::TIMESTAMP).and_then(parse_timestamp),
                stack_trace: first_text(latest, &fields::STACK_TRACE_PRECEDENCE),
            })
        })
        .collect();

    rankings.sort_by(|a, b| b.count.cmp(&a.count));
    rankings.truncate(limit);
    rankings
}

fn halves(window: &TimeWindow) -> Value {
    let mid = format_timestamp(&window.midpoint());
    json!({
        "first_half": {
            "filter": { "range": { (fields::TIMESTAMP): {
                "gte": format_timestamp(&window.start),
                "lt": mid,
            } } }
        },
        "second_half": {
            "filter": { "range": { (fields::TIMESTAMP): {
                "gte": mid,
                "lte": format_timestamp(&window.end),
            } } }
        }
    })
}

/// Top services and messages, each counted per window half
pub fn trend_body(window: &TimeWindow, services: usize, messages: usize) -> Value {
    let mut by_service = terms(fields::SERVICE_KEYWORD, services);
    by_service["aggs"] = halves(window);
    let mut by_message = terms(fields::ERROR_MESSAGE_KEYWORD, messages);
    by_message["aggs"] = halves(window);

    json!({
        "size": 0,
        "query": { "bool": { "filter": [range_filter(window)] } },
        "aggs": {
            "services": by_service,
            "messages": by_message,
        }
    })
}

/// Trend records for every bucket of a half-split terms aggregation
pub fn parse_trend_records(aggs: &Value, name: &str) -> Vec<TrendRecord> {
    buckets(aggs, name)
        .iter()
        .map(|bucket| {
            let first_half_count = doc_count(&bucket["first_half"]);
            let second_half_count = doc_count(&bucket["second_half"]);
            let (trend, percentage_change) = trend_between(first_half_count, second_half_count);
            TrendRecord {
                subject: bucket_key(bucket),
                count: doc_count(bucket),
                trend,
                percentage_change,
                first_half_count,
                second_half_count,
            }
        })
        .collect()
}

/// Newest phrase matches plus affected services and an hourly histogram
pub fn specific_body(
    message: &str,
    window: &TimeWindow,
    sample_size: usize,
    affected_services: usize,
) -> Value {
    json!({
        "size": sample_size,
        "track_total_hits": true,
        "sort": timestamp_sort("desc"),
        "query": {
            "bool": {
                "must": [text_clause(message, &fields::MESSAGE_FIELDS, TextMatch::Phrase)],
                "filter": [range_filter(window)],
            }
        },
        "aggs": {
            "services": terms(fields::SERVICE_KEYWORD, affected_services),
            "timeline": histogram(window),
        }
    })
}

pub fn parse_service_counts(aggs: &Value, name: &str) -> Vec<ServiceCount> {
    buckets(aggs, name)
        .iter()
        .map(|bucket| ServiceCount {
            service: bucket_key(bucket),
            count: doc_count(bucket),
        })
        .collect()
}

/// Histogram buckets in time order; unparseable keys are skipped
pub fn parse_histogram(aggs: &Value, name: &str) -> Vec<TimeBucket> {
    buckets(aggs, name)
        .iter()
        .filter_map(|bucket| {
            Some(TimeBucket {
                bucket_start: histogram_key(bucket)?,
                count: doc_count(bucket),
            })
        })
        .collect()
}

fn histogram_key(bucket: &Value) -> Option<DateTime<Utc>> {
    bucket
        .get("key")
        .and_then(parse_timestamp)
        .or_else(|| bucket.get("key_as_string").and_then(parse_timestamp))
}

fn buckets<'a>(aggs: &'a Value, name: &str) -> &'a [Value] {
    aggs.get(name)
        .and_then(|agg| agg.get("buckets"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn bucket_key(bucket: &Value) -> String {
    if let Some(key) = bucket.get("key_as_string").and_then(Value::as_str) {
        return key.to_string();
    }
    match bucket.get("key") {
        Some(Value::String(key)) => key.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn doc_count(bucket: &Value) -> u64 {
    bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0)
}

fn metric_value(aggs: &Value, name: &str) -> u64 {
    aggs.get(name)
        .and_then(|agg| agg.get("value"))
        .and_then(Value::as_f64)
        .map(|value| value.max(0.0) as u64)
        .unwrap_or(0)
}

fn top_hit_source<'a>(bucket: &'a Value, name: &str) -> Option<&'a Value> {
    bucket
        .get(name)?
        .pointer("/hits/hits/0/_source")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::models::Trend;
    use chrono::{Duration, TimeZone};

    fn window() -> TimeWindow {
        let end = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        TimeWindow::last(Duration::days(7), end)
    }

    fn latest(source: Value) -> Value {
        json!({ "hits": { "hits": [{ "_index": "i", "_id": "x", "_source": source }] } })
    }

    #[test]
    fn test_summary_body_shape() {
        let body = summary_body(&window(), 10, 10);
        assert_eq!(body["size"], 0);
        assert_eq!(body["aggs"]["top_messages"]["terms"]["size"], 10);
        assert_eq!(body["aggs"]["top_messages"]["terms"]["field"], "error.message.keyword");
        assert_eq!(body["aggs"]["timeline"]["date_histogram"]["fixed_interval"], "1h");
        assert_eq!(
            body["aggs"]["top_messages"]["aggs"]["first_seen"]["top_hits"]["sort"],
            json!([{"@timestamp": {"order": "asc"}}])
        );
    }

    #[test]
    fn test_parse_summary() {
        let aggs = json!({
            "total_count": {"value": 120},
            "unique_messages": {"value": 7},
            "top_messages": {"buckets": [{
                "key": "Connection refused",
                "doc_count": 40,
                "first_seen": latest(json!({"@timestamp": "2024-03-04T01:00:00Z"})),
                "last_seen": latest(json!({"@timestamp": "2024-03-10T11:00:00Z"})),
                "services": {"buckets": [{"key": "payment", "doc_count": 30}, {"key": "cart", "doc_count": 10}]}
            }]},
            "timeline": {"buckets": [
                {"key_as_string": "2024-03-10T10:00:00.000Z", "key": 1710064800000_i64, "doc_count": 3},
                {"key": 1710068400000_i64, "doc_count": 5}
            ]}
        });

        let summary = parse_summary(&aggs);
        assert_eq!(summary.total_count, 120);
        assert_eq!(summary.unique_message_count, 7);
        assert_eq!(summary.top_messages[0].message, "Connection refused");
        assert_eq!(summary.top_messages[0].affected_services, vec!["payment", "cart"]);
        assert!(summary.top_messages[0].first_seen < summary.top_messages[0].last_seen);
        assert_eq!(summary.time_distribution.len(), 2);
        assert_eq!(summary.time_distribution[1].count, 5);
    }

    #[test]
    fn test_parse_summary_tolerates_missing_aggregations() {
        let summary = parse_summary(&Value::Null);
        assert_eq!(summary, AggregationSummary::default());
    }

    #[test]
    fn test_frequent_body_filters() {
        let body = frequent_body(&window(), 10, Some("payment"));
        let bool_query = &body["query"]["bool"];
        assert_eq!(bool_query["filter"].as_array().unwrap().len(), 2);
        assert_eq!(bool_query["minimum_should_match"], 1);
        assert_eq!(body["aggs"]["messages"]["terms"]["field"], "message.keyword");
        assert_eq!(body["aggs"]["messages"]["terms"]["size"], 10);
    }

    #[test]
    fn test_parse_frequent_drops_non_error_buckets() {
        let aggs = json!({"messages": {"buckets": [
            {"key": "GET /health 200", "doc_count": 900,
             "latest": latest(json!({"message": "GET /health 200", "log": {"level": "info"}}))},
            {"key": "Timeout calling ledger", "doc_count": 12,
             "latest": latest(json!({"log.level": "ERROR", "service": {"name": "payment"},
                                      "@timestamp": "2024-03-10T11:00:00Z"}))},
            {"key": "NPE in handler", "doc_count": 30,
             "latest": latest(json!({"error": {"message": "NPE in handler", "stack_trace": "at X"}}))},
            {"key": "", "doc_count": 50,
             "latest": latest(json!({"error": {"message": "blank"}}))}
        ]}});

        let ranked = parse_frequent(&aggs, 10);
        let messages: Vec<&str> = ranked.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["NPE in handler", "Timeout calling ledger"]);
        assert_eq!(ranked[0].stack_trace.as_deref(), Some("at X"));
        assert_eq!(ranked[1].last_service.as_deref(), Some("payment"));

        assert_eq!(parse_frequent(&aggs, 1).len(), 1);
    }

    #[test]
    fn test_trend_body_splits_at_midpoint() {
        let w = window();
        let body = trend_body(&w, 10, 5);
        let mid = format_timestamp(&w.midpoint());

        let first = &body["aggs"]["services"]["aggs"]["first_half"]["filter"]["range"]["@timestamp"];
        let second = &body["aggs"]["services"]["aggs"]["second_half"]["filter"]["range"]["@timestamp"];
        assert_eq!(first["lt"], mid.as_str());
        assert_eq!(second["gte"], mid.as_str());
        assert_eq!(body["aggs"]["messages"]["terms"]["size"], 5);
    }

    #[test]
    fn test_parse_trend_records() {
        let aggs = json!({"services": {"buckets": [
            {"key": "payment", "doc_count": 150,
             "first_half": {"doc_count": 50}, "second_half": {"doc_count": 100}},
            {"key": "cart", "doc_count": 10,
             "first_half": {"doc_count": 0}, "second_half": {"doc_count": 10}}
        ]}});

        let records = parse_trend_records(&aggs, "services");
        assert_eq!(records[0].subject, "payment");
        assert_eq!(records[0].trend, Trend::Increasing);
        assert_eq!(records[0].percentage_change, 100);
        assert_eq!(records[1].trend, Trend::Stable);
        assert_eq!(records[1].percentage_change, 0);
    }

    #[test]
    fn test_specific_body_is_phrase_match() {
        let body = specific_body("Connection refused", &window(), 100, 10);
        let clause = &body["query"]["bool"]["must"][0]["multi_match"];
        assert_eq!(clause["type"], "phrase");
        assert_eq!(clause["fields"].as_array().unwrap().len(), 4);
        assert_eq!(body["size"], 100);
    }
}
