//! Multi-strategy text search with merged, deduplicated results

use crate::connections::ConnectionHandle;
use crate::context::QueryContext;
use crate::metrics::SMART_SEARCH_STRATEGY_FAILURES_TOTAL;
use crate::search::document::SearchResultRecord;
use crate::search::executor::SearchExecutor;
use crate::search::query::{FilterSpec, QueryBuilder, SearchKind, TextMatch};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Most key terms kept from a query
pub const MAX_KEY_TERMS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "been", "before", "being", "but", "by", "can", "could", "did", "do", "does", "for", "from",
    "had", "has", "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "just", "may", "me", "might", "must", "my", "no", "not", "of", "on", "once", "only", "or",
    "our", "over", "she", "should", "so", "some", "such", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "to", "too", "under", "very", "was", "we",
    "were", "what", "when", "where", "which", "who", "why", "will", "with", "would", "you",
    "your",
];

/// Match strategies, in the order their results take precedence
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    ExactPhrase,
    KeyTerms,
    StrongTerm,
}

/// Text and match mode for one strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyQuery {
    pub strategy: Strategy,
    pub text: String,
    pub mode: TextMatch,
}

/// Lower-cased distinct terms longer than two characters that are not stop
/// words, in first-seen order. Punctuation other than `-` and `_` separates
/// terms, so `java.lang.Foo` yields `java`, `lang` and `foo`.
pub fn extract_key_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let lowered = text.to_lowercase();

    for token in lowered.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_')) {
        let term = token.trim_matches(|c| c == '-' || c == '_');

        if term.chars().count() <= 2 || STOP_WORDS.contains(&term) {
            continue;
        }
        if !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
        if terms.len() == MAX_KEY_TERMS {
            break;
        }
    }

    terms
}

/// Strategies applicable to a text query; empty text yields none
pub fn plan_strategies(text: &str) -> Vec<StrategyQuery> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut plan = vec![StrategyQuery {
        strategy: Strategy::ExactPhrase,
        text: text.to_string(),
        mode: TextMatch::Phrase,
    }];

    let terms = extract_key_terms(text);
    if !terms.is_empty() {
        plan.push(StrategyQuery {
            strategy: Strategy::KeyTerms,
            text: terms.join(" "),
            mode: TextMatch::BestFields,
        });
    }
    if let Some(strong) = terms.iter().find(|t| t.chars().count() > 4) {
        plan.push(StrategyQuery {
            strategy: Strategy::StrongTerm,
            text: strong.clone(),
            mode: TextMatch::BestFields,
        });
    }

    plan
}

/// Union of result batches keyed by `(sourceIndex, id)`; first occurrence wins
pub fn merge_results(
    batches: impl IntoIterator<Item = Vec<SearchResultRecord>>,
    limit: usize,
) -> Vec<SearchResultRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut merged = Vec::new();

    for record in batches.into_iter().flatten() {
        let key = (record.source_index.clone(), record.id.clone());
        if seen.insert(key) {
            merged.push(record);
        }
    }

    merged.truncate(limit);
    merged
}

/// Result of a smart search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartSearchOutcome {
    pub records: Vec<SearchResultRecord>,
    pub strategies_run: Vec<Strategy>,
    pub strategies_failed: Vec<Strategy>,
}

/// Runs every applicable strategy concurrently and merges what succeeds
pub struct SmartSearchMerger<'a> {
    executor: &'a SearchExecutor,
}

impl<'a> SmartSearchMerger<'a> {
    pub fn new(executor: &'a SearchExecutor) -> Self {
        Self { executor }
    }

    /// A failing strategy contributes nothing; if all fail the result is empty
    pub async fn search(
        &self,
        handle: &ConnectionHandle,
        builder: &QueryBuilder<'_>,
        spec: &FilterSpec,
        ctx: &QueryContext,
    ) -> SmartSearchOutcome {
        let plan = plan_strategies(spec.text().unwrap_or_default());
        let limit = builder.result_size(SearchKind::Exceptions, spec);

        let runs = plan.iter().map(|step| async move {
            let query = builder.build_text(
                SearchKind::Exceptions,
                spec,
                Some(step.text.as_str()),
                step.mode,
            );
            (step.strategy, self.executor.execute(handle, &query, ctx).await)
        });
        let results = join_all(runs).await;

        let mut outcome = SmartSearchOutcome::default();
        let mut batches = Vec::with_capacity(results.len());
        for (strategy, result) in results {
            outcome.strategies_run.push(strategy);
            match result {
                Ok(page) => {
                    debug!(
                        strategy = %strategy,
                        hits = page.records.len(),
                        "Smart search strategy finished"
                    );
                    batches.push(page.records);
                }
                Err(e) => {
                    warn!(
                        tenant_id = %ctx.tenant_id,
                        environment = %ctx.environment,
                        strategy = %strategy,
                        error = %e,
                        "Smart search strategy failed"
                    );
                    SMART_SEARCH_STRATEGY_FAILURES_TOTAL
                        .with_label_values(&[strategy.as_ref()])
                        .inc();
                    outcome.strategies_failed.push(strategy);
                }
            }
        }

        outcome.records = merge_results(batches, limit);
        outcome
    }
}
