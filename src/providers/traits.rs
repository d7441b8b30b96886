use async_trait::async_trait;

/// A hosted chat model that answers one user message at a time.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Whether a credential is available. Callers check this before
    /// [`ChatProvider::reply`] so a missing key never becomes an upstream call.
    fn has_credential(&self) -> bool {
        true
    }

    /// Send `message` and return the model's reply text.
    async fn reply(&self, message: &str) -> anyhow::Result<String>;
}
