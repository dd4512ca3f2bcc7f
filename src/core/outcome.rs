//! Failure-isolating results for fan-out stages.
//!
//! Publication stages run concurrently and must never take each other down.
//! `settle` converts a stage future into a `StageOutcome` that records the
//! failure instead of propagating it; combining settled futures with
//! `tokio::join!` waits for every branch regardless of individual failures.

use std::future::Future;

use tracing::error;

/// Result of one fan-out stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome<T> {
    Success(T),
    Failure(String),
}

impl<T> StageOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success(_))
    }

    /// The success value, if any
    pub fn value(self) -> Option<T> {
        match self {
            StageOutcome::Success(value) => Some(value),
            StageOutcome::Failure(_) => None,
        }
    }

    pub fn as_ref(&self) -> StageOutcome<&T> {
        match self {
            StageOutcome::Success(value) => StageOutcome::Success(value),
            StageOutcome::Failure(reason) => StageOutcome::Failure(reason.clone()),
        }
    }

    /// Outcome for a stage that was configured off
    pub fn disabled() -> Self {
        StageOutcome::Failure("disabled".to_string())
    }
}

/// Run a stage to completion and capture its outcome. Failures are logged
/// under `label` and absorbed; they never cancel sibling stages.
pub async fn settle<T, F>(label: &str, fut: F) -> StageOutcome<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match fut.await {
        Ok(value) => StageOutcome::Success(value),
        Err(err) => {
            error!(stage = label, error = format!("{err:#}"), "Stage failed");
            StageOutcome::Failure(format!("{err:#}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settle_captures_success() {
        let outcome = settle("ok", async { Ok::<_, anyhow::Error>(42) }).await;
        assert_eq!(outcome, StageOutcome::Success(42));
    }

    #[tokio::test]
    async fn test_settle_absorbs_failure() {
        let outcome: StageOutcome<i32> =
            settle("bad", async { anyhow::bail!("collaborator down") }).await;

        match outcome {
            StageOutcome::Failure(reason) => assert!(reason.contains("collaborator down")),
            StageOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_join_waits_for_every_branch() {
        // A failing branch must not short-circuit its siblings.
        let (a, b, c) = tokio::join!(
            settle("a", async { Ok::<_, anyhow::Error>("one") }),
            settle("b", async {
                anyhow::bail!("boom")
            }),
            settle("c", async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok::<_, anyhow::Error>("three")
            }),
        );

        let b: StageOutcome<&str> = b;
        assert!(a.is_success());
        assert!(!b.is_success());
        assert_eq!(c.value(), Some("three"));
    }

    #[test]
    fn test_disabled_outcome() {
        let outcome: StageOutcome<()> = StageOutcome::disabled();
        assert_eq!(outcome, StageOutcome::Failure("disabled".to_string()));
    }
}
