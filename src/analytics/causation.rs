//! Rule table mapping exception text to likely causes and fixes

use serde::{Deserialize, Serialize};

/// One row of the rule table: any keyword match contributes all causes and solutions
#[derive(Debug, Clone, Copy)]
pub struct CausationRule {
    pub keywords: &'static [&'static str],
    pub causes: &'static [&'static str],
    pub solutions: &'static [&'static str],
}

impl CausationRule {
    /// `lowered` must already be lower-cased
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(*keyword))
    }
}

/// Rules in evaluation order
pub const CAUSATION_RULES: &[CausationRule] = &[
    CausationRule {
        keywords: &["null"],
        causes: &[
            "Object used before it was initialized",
            "Missing null check on an optional value or dependency response",
        ],
        solutions: &[
            "Add null checks or optional handling at the failing call site",
            "Validate inputs and upstream responses before use",
        ],
    },
    CausationRule {
        keywords: &["connection", "network"],
        causes: &[
            "Network connectivity problem between services",
            "Downstream service or database unavailable",
            "Connection pool exhausted or timeouts set too low",
        ],
        solutions: &[
            "Check health and reachability of the downstream service",
            "Review connection pool sizing and timeout settings",
            "Retry transient failures with backoff",
        ],
    },
    CausationRule {
        keywords: &["memory", "heap"],
        causes: &[
            "Memory leak or unbounded cache growth",
            "Heap or container memory limit too small for the workload",
        ],
        solutions: &[
            "Profile memory usage and look for leaks",
            "Raise heap or container memory limits",
            "Bound cache and batch sizes",
        ],
    },
    CausationRule {
        keywords: &["permission", "access"],
        causes: &[
            "Missing or misconfigured permissions",
            "Expired or revoked credentials",
        ],
        solutions: &[
            "Verify roles and resource permissions for the service account",
            "Rotate or refresh the credentials in use",
        ],
    },
];

/// Returned when no rule matches
pub const FALLBACK_CAUSES: &[&str] = &[
    "Unexpected input or application state",
    "Recent deployment or configuration change",
    "Failure in a downstream dependency",
];

pub const FALLBACK_SOLUTIONS: &[&str] = &[
    "Review the stack trace to locate the failing code path",
    "Correlate the first occurrence with recent deployments and configuration changes",
    "Check logs of related services around the same time",
    "Add targeted logging around the failure",
];

/// Candidate causes and remediations for a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub causes: Vec<String>,
    pub solutions: Vec<String>,
}

/// Evaluates a rule table against exception messages
#[derive(Debug, Clone, Copy)]
pub struct CausationHeuristics {
    rules: &'static [CausationRule],
}

impl CausationHeuristics {
    pub fn new(rules: &'static [CausationRule]) -> Self {
        Self { rules }
    }

    /// Accumulate every matching rule in table order, or the fallback when none match
    pub fn suggest(&self, message: &str) -> Suggestions {
        let lowered = message.to_lowercase();
        let mut suggestions = Suggestions::default();

        for rule in self.rules.iter().filter(|rule| rule.matches(&lowered)) {
            suggestions.causes.extend(rule.causes.iter().map(|s| s.to_string()));
            suggestions
                .solutions
                .extend(rule.solutions.iter().map(|s| s.to_string()));
        }

        if suggestions.causes.is_empty() && suggestions.solutions.is_empty() {
            suggestions.causes = FALLBACK_CAUSES.iter().map(|s| s.to_string()).collect();
            suggestions.solutions = FALLBACK_SOLUTIONS.iter().map(|s| s.to_string()).collect();
        }

        suggestions
    }
}

impl Default for CausationHeuristics {
    fn default() -> Self {
        Self::new(CAUSATION_RULES)
    }
}
