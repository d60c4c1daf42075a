//! # Classification
//! Remote classification of extracted post text behind a provider seam, with
//! bounded in-flight concurrency, linear retry backoff, a per-request
//! timeout, and a circuit breaker around repeated provider failures.

pub mod breaker;
pub mod client;
pub mod error;
pub mod provider;
pub mod retry;

pub use breaker::CircuitBreaker;
pub use client::ClassifyClient;
pub use error::ClassifyError;
pub use provider::{ClassifierProvider, DisabledProvider, MockProvider, OpenAiProvider};
pub use retry::{RetryDecision, RetryPolicy};

use serde::{Deserialize, Serialize};

/// Closed label set the remote classifier maps posts onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    PromotionalHype,
    HumbleBrag,
    GenericMotivational,
    NoMatch,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::PromotionalHype => "promotional-hype",
            Label::HumbleBrag => "humble-brag",
            Label::GenericMotivational => "generic-motivational",
            Label::NoMatch => "no-match",
        }
    }

    /// Lenient parse of a provider-returned label. Anything unrecognized
    /// maps to `NoMatch` so a drifting model vocabulary fails closed.
    pub fn parse(s: &str) -> Label {
        let t = s.trim().to_lowercase();
        match t.as_str() {
            "promotional-hype" | "promotional hype" | "hype" => Label::PromotionalHype,
            "humble-brag" | "humble brag" | "humblebrag" => Label::HumbleBrag,
            "generic-motivational" | "generic motivational" | "motivational" => {
                Label::GenericMotivational
            }
            _ => Label::NoMatch,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable classification outcome: the label plus an optional short
/// human-readable annotation (the `Replace` treatment renders it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub label: Label,
    pub annotation: Option<String>,
}

impl Classification {
    pub fn of(label: Label) -> Self {
        Self {
            label,
            annotation: None,
        }
    }

    pub fn with_annotation(label: Label, annotation: impl Into<String>) -> Self {
        Self {
            label,
            annotation: Some(annotation.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_parse_round_trips_slugs() {
        for l in [
            Label::PromotionalHype,
            Label::HumbleBrag,
            Label::GenericMotivational,
            Label::NoMatch,
        ] {
            assert_eq!(Label::parse(l.as_str()), l);
        }
    }

    #[test]
    fn unknown_label_fails_closed() {
        assert_eq!(Label::parse("totally-new-category"), Label::NoMatch);
        assert_eq!(Label::parse(""), Label::NoMatch);
    }
}
