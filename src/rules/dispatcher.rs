//! Action dispatcher — turns abstract actions into mail client calls.
//!
//! Failures are isolated per action: one failed call is recorded and the
//! dispatcher moves on to the remaining actions and records. Nothing is
//! rolled back. After a successful call the store's provider-state mirror
//! (`is_read`, `labels`) is updated to match.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::MailClient;
use crate::error::ClientError;
use crate::rules::engine::MatchResult;
use crate::rules::model::RuleAction;
use crate::store::traits::RecordStore;

/// Outcome of one attempted action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub record_id: i64,
    pub message_id: String,
    pub action: &'static str,
    pub status: ActionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Applied,
    Failed { reason: String },
}

impl ActionOutcome {
    pub fn failed(&self) -> bool {
        matches!(self.status, ActionStatus::Failed { .. })
    }
}

/// Applies a matched rule's actions through the mail client.
pub struct ActionDispatcher {
    client: Arc<dyn MailClient>,
    store: Arc<dyn RecordStore>,
}

impl ActionDispatcher {
    pub fn new(client: Arc<dyn MailClient>, store: Arc<dyn RecordStore>) -> Self {
        Self { client, store }
    }

    /// Apply every action of a match, in the rule's declared order.
    ///
    /// Returns one outcome per action. A failed action never aborts the
    /// remaining ones.
    pub async fn apply(&self, matched: &MatchResult<'_>) -> Vec<ActionOutcome> {
        let record = matched.record;
        let mut outcomes = Vec::with_capacity(matched.rule.actions.len());

        for action in &matched.rule.actions {
            let status = match self.apply_one(action, record.id, &record.message_id).await {
                Ok(()) => {
                    debug!(
                        record_id = record.id,
                        message_id = %record.message_id,
                        action = action.label(),
                        "Action applied"
                    );
                    ActionStatus::Applied
                }
                Err(e) => {
                    warn!(
                        record_id = record.id,
                        message_id = %record.message_id,
                        action = action.label(),
                        error = %e,
                        "Action failed; continuing"
                    );
                    ActionStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            outcomes.push(ActionOutcome {
                record_id: record.id,
                message_id: record.message_id.clone(),
                action: action.label(),
                status,
            });
        }

        outcomes
    }

    /// One provider call plus its store mirror update.
    ///
    /// A mirror update failure is logged but does not fail the action: the
    /// provider-side mutation already succeeded.
    async fn apply_one(
        &self,
        action: &RuleAction,
        record_id: i64,
        message_id: &str,
    ) -> Result<(), ClientError> {
        match action {
            RuleAction::MarkAsRead => {
                self.client.mark_as_read(message_id).await?;
                if let Err(e) = self.store.mark_read(record_id).await {
                    warn!(record_id, error = %e, "Failed to mirror read state");
                }
            }
            RuleAction::Move { destination } => {
                self.client.add_label(message_id, destination).await?;
                if let Err(e) = self.store.add_label(record_id, destination).await {
                    warn!(record_id, error = %e, "Failed to mirror label state");
                }
            }
        }
        Ok(())
    }
}
