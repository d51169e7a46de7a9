//! Reconciliation between cluster secrets and remote records.
//!
//! Pulls copy cluster secrets into the selected folder, matching existing
//! records by name. Pushes write remote records back into the cluster.
//! Batches run strictly one item at a time and nothing is rolled back.

mod engine;

pub use engine::SyncEngine;

use crate::error::Error;
use crate::models::Id;

/// What happened to one item of a pull or push.
#[derive(Debug)]
pub struct ItemOutcome {
    /// Secret or record name. Unparseable documents are named by position.
    pub name: String,
    pub result: Result<SyncAction, Error>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// A remote record was created or updated.
    Saved { id: Id },
    /// A cluster secret was written.
    Inserted,
}

/// Per-item results of a batch that ran to the end.
///
/// Failures that concern a single item are collected here; anything else
/// stops the batch and is returned as the error of the call instead.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub items: Vec<ItemOutcome>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.result.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|i| i.result.is_err())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Record `result`, or hand back the error when it must end the batch.
    fn record(&mut self, name: String, result: Result<SyncAction, Error>) -> Result<(), Error> {
        match result {
            Err(e) if !e.is_item_scoped() => Err(e),
            Err(e) => {
                tracing::warn!(item = %name, error = %e, "skipping item");
                self.items.push(ItemOutcome {
                    name,
                    result: Err(e),
                });
                Ok(())
            }
            Ok(action) => {
                self.items.push(ItemOutcome {
                    name,
                    result: Ok(action),
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_item_failures() {
        let mut report = SyncReport::default();
        report
            .record("a".to_string(), Ok(SyncAction::Saved { id: Id::from(1) }))
            .unwrap();
        report
            .record(
                "b".to_string(),
                Err(Error::CredentialNotFound {
                    name: "b".to_string(),
                    folder: "1".to_string(),
                }),
            )
            .unwrap();

        assert_eq!(report.succeeded(), 1);
        assert!(report.has_failures());
        assert_eq!(report.failed().next().unwrap().name, "b");
    }

    #[test]
    fn test_report_stops_on_batch_failures() {
        let mut report = SyncReport::default();
        let err = report
            .record(
                "a".to_string(),
                Err(Error::Unauthorized {
                    username: "bob".to_string(),
                }),
            )
            .unwrap_err();

        assert!(matches!(err, Error::Unauthorized { .. }));
        assert!(report.items.is_empty());
    }
}
