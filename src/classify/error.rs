//! Classification failure taxonomy. Every variant resolves locally to a
//! `Skipped` item; nothing here propagates to the pipeline's caller.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider server error")]
    ServerError,
    #[error("request timed out")]
    Timeout,
    #[error("credential rejected by provider")]
    Unauthorized,
    #[error("malformed provider response")]
    MalformedResponse,
    /// Shed locally: the in-flight bound was hit. Never queued.
    #[error("too many classification requests in flight")]
    Busy,
    /// Synthetic: short-circuited before any network attempt.
    #[error("circuit breaker open")]
    CircuitOpen,
    #[error("no API key configured")]
    MissingKey,
}

impl ClassifyError {
    /// Only transient provider faults are worth retrying. `Unauthorized`
    /// and `MalformedResponse` are surfaced directly; a timed-out request
    /// has already been cancelled and is not re-issued.
    pub fn retryable(self) -> bool {
        matches!(self, ClassifyError::RateLimited | ClassifyError::ServerError)
    }

    /// Whether this failure counts against the circuit breaker. Local
    /// shedding and short-circuits are not provider faults.
    pub fn counts_as_breaker_failure(self) -> bool {
        !matches!(self, ClassifyError::Busy | ClassifyError::CircuitOpen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_only_transient_kinds() {
        assert!(ClassifyError::RateLimited.retryable());
        assert!(ClassifyError::ServerError.retryable());
        assert!(!ClassifyError::Timeout.retryable());
        assert!(!ClassifyError::Unauthorized.retryable());
        assert!(!ClassifyError::MalformedResponse.retryable());
        assert!(!ClassifyError::Busy.retryable());
    }

    #[test]
    fn shedding_does_not_count_as_provider_fault() {
        assert!(!ClassifyError::Busy.counts_as_breaker_failure());
        assert!(!ClassifyError::CircuitOpen.counts_as_breaker_failure());
        assert!(ClassifyError::Timeout.counts_as_breaker_failure());
    }
}
