use super::error::{SyncError, Warning};

/// Result of one synchronization or reporting operation.
///
/// `Warn` means the operation was deliberately not carried out and nothing is
/// wrong with the run; `Fail` means it was attempted and aborted.
#[derive(Debug)]
pub enum Outcome<T> {
    Ok(T),
    Warn(Warning),
    Fail(SyncError),
}

impl<T> Outcome<T> {
    /// Collapse an early-returning computation into an outcome
    pub fn flatten(result: Result<Outcome<T>, SyncError>) -> Self {
        match result {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Fail(e),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(v) => Some(v),
            _ => None,
        }
    }
}

/// Failure of one item inside a best-effort loop
#[derive(Debug)]
pub struct ItemFailure {
    pub item: String,
    pub error: SyncError,
}

/// Accumulated per-item results of a best-effort loop.
///
/// Individual failures never stop the loop; they are collected and logged once
/// through [`BatchOutcome::log_failures`].
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<ItemFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn push(&mut self, item: impl Into<String>, result: Result<T, SyncError>) {
        match result {
            Ok(v) => self.succeeded.push(v),
            Err(error) => self.failed.push(ItemFailure {
                item: item.into(),
                error,
            }),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn log_failures(&self, what: &str) {
        if self.failed.is_empty() {
            return;
        }
        log::error!(
            "{}: {} of {} item(s) failed",
            what,
            self.failed.len(),
            self.failed.len() + self.succeeded.len()
        );
        for failure in &self.failed {
            log::error!("  {}: {}", failure.item, failure.error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;

    #[test]
    fn test_batch_keeps_going_after_failure() {
        let mut batch = BatchOutcome::default();
        batch.push("step 1", Ok(1));
        batch.push(
            "step 2",
            Err(SyncError::gateway(
                "createTestStep",
                GatewayError::UnexpectedStatus {
                    status: 500,
                    body: String::new(),
                },
            )),
        );
        batch.push("step 3", Ok(3));

        assert_eq!(batch.succeeded, vec![1, 3]);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].item, "step 2");
        assert!(!batch.is_complete());
    }

    #[test]
    fn test_flatten_turns_error_into_fail() {
        let outcome: Outcome<()> = Outcome::flatten(Err(SyncError::NoActiveSession));
        assert!(matches!(outcome, Outcome::Fail(SyncError::NoActiveSession)));
    }
}
