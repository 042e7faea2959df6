//! Per-operation accounting shared by metrics and traces.
//!
//! Each guarded operation records an `attempt` counter at entry and exactly
//! one terminal counter (`success`, `failure`, `blocked` or `error`) plus a
//! latency sample on the way out, under the same `operation` label the
//! matching span is named after.

use crate::api::error::ApiError;
use std::future::Future;
use std::time::Instant;
use tracing::{Instrument, Span};
use uuid::Uuid;

pub const OPERATIONS_TOTAL: &str = "pordisto_operations_total";
pub const OPERATION_DURATION_SECONDS: &str = "pordisto_operation_duration_seconds";

/// Canonical operation names, used both as metric labels and span names.
pub mod op {
    pub const LOGIN: &str = "auth.login";
    pub const REGISTER: &str = "auth.register";
    pub const USER_CREATE: &str = "user.create";
    pub const FILE_DOWNLOAD: &str = "file.download";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Blocked,
    Error,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Blocked => "blocked",
            Self::Error => "error",
        }
    }
}

/// Guard owning the books for one operation. Creating it records the
/// attempt; dropping it records the terminal counter and the duration.
/// Dropping without `finish` counts as `error`, so an abandoned request
/// can never leave the attempt unaccounted for.
#[derive(Debug)]
pub struct Observation {
    operation: &'static str,
    started: Instant,
    outcome: Option<Outcome>,
}

impl Observation {
    #[must_use]
    pub fn begin(operation: &'static str) -> Self {
        metrics::counter!(OPERATIONS_TOTAL, "operation" => operation, "result" => "attempt")
            .increment(1);

        Self {
            operation,
            started: Instant::now(),
            outcome: None,
        }
    }

    pub fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        let outcome = self.outcome.unwrap_or(Outcome::Error);
        let elapsed = self.started.elapsed().as_secs_f64();

        metrics::counter!(
            OPERATIONS_TOTAL,
            "operation" => self.operation,
            "result" => outcome.as_str()
        )
        .increment(1);

        metrics::histogram!(
            OPERATION_DURATION_SECONDS,
            "operation" => self.operation,
            "result" => outcome.as_str()
        )
        .record(elapsed);
    }
}

/// Runs a handler body inside its operation span with an [`Observation`]
/// around it. The terminal outcome comes from the result: `Ok` is a success,
/// errors map through [`ApiError::outcome`].
pub async fn observed<T, F>(operation: &'static str, span: Span, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let mut observation = Observation::begin(operation);

    let result = fut.instrument(span).await;

    match &result {
        Ok(_) => observation.finish(Outcome::Success),
        Err(err) => observation.finish(err.outcome()),
    }

    result
}

/// Fills the `user_id` field of the current operation span once the acting
/// user is known. The span must declare the field with
/// `tracing::field::Empty`.
pub fn record_user(id: Uuid) {
    Span::current().record("user_id", tracing::field::display(id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tracing::info_span;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Success.as_str(), "success");
        assert_eq!(Outcome::Failure.as_str(), "failure");
        assert_eq!(Outcome::Blocked.as_str(), "blocked");
        assert_eq!(Outcome::Error.as_str(), "error");
    }

    #[test]
    fn test_observation_drop_without_finish() {
        // No recorder installed, the drop path must still be safe.
        let observation = Observation::begin(op::LOGIN);
        drop(observation);
    }

    #[tokio::test]
    async fn test_observed_passes_through_success() -> Result<()> {
        let value = observed(op::LOGIN, info_span!("auth.login"), async {
            Ok::<_, ApiError>(42)
        })
        .await?;

        assert_eq!(value, 42);

        Ok(())
    }

    #[tokio::test]
    async fn test_observed_passes_through_error() {
        let result = observed(op::LOGIN, info_span!("auth.login"), async {
            Err::<(), _>(ApiError::validation("Invalid email"))
        })
        .await;

        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
