use async_trait::async_trait;

#[derive(thiserror::Error, Debug)]
#[error("failed to notify {recipient}: {reason}")]
pub struct NotifyError {
    pub recipient: i64,
    pub reason: String,
}

/// Outbound plain-text channel to a single chat.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, recipient: i64, text: &str) -> Result<(), NotifyError>;
}
