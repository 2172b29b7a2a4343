//! Mail provider client — trait plus the Gmail implementation.

pub mod auth;
pub mod gmail;

use async_trait::async_trait;

use crate::error::ClientError;

pub use auth::{AuthConfig, TokenProvider};
pub use gmail::GmailClient;

/// Operations the rule run needs from the mail provider.
///
/// All calls are idempotent: repeating a call with the same arguments after
/// a success is a no-op success on the provider side.
#[async_trait]
pub trait MailClient: Send + Sync {
    /// Remove the unread marker from a message.
    async fn mark_as_read(&self, message_id: &str) -> Result<(), ClientError>;

    /// Attach a label (by resolved label id) to a message.
    async fn add_label(&self, message_id: &str, label_id: &str) -> Result<(), ClientError>;

    /// Resolve a label display name to its provider identifier.
    ///
    /// Name resolution is the client's responsibility; the dispatcher only
    /// ever sees resolved identifiers.
    async fn resolve_label(&self, name: &str) -> Result<String, ClientError>;
}
