//! Chat relay: a few canned answers, everything else goes to the provider.

use crate::providers::ChatProvider;
use std::sync::Arc;

const NAME_TRIGGERS: [&str; 5] = [
    "your name",
    "what is your name",
    "who are you",
    "may i know your name",
    "tell me your name",
];

const DEVELOPER_TRIGGERS: [&str; 5] = [
    "who created you",
    "who is your developer",
    "who made you",
    "your creator",
    "developer name",
];

pub const NAME_REPLY: &str = "My name is Champak. Chappal walla";
pub const DEVELOPER_REPLY: &str = "I was created by The OG Boss Dayanand Gawade. 👑";

/// Sent alongside the error when the upstream model cannot be reached.
pub const FALLBACK_REPLY: &str = "Sorry, I'm having trouble connecting to the AI service.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No message provided")]
    EmptyMessage,

    #[error("Chat API key not configured")]
    MissingApiKey,

    #[error("Failed to connect to the chat service")]
    Upstream(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedTopic {
    Name,
    Developer,
}

impl CannedTopic {
    pub fn reply(self) -> &'static str {
        match self {
            CannedTopic::Name => NAME_REPLY,
            CannedTopic::Developer => DEVELOPER_REPLY,
        }
    }
}

/// Case-insensitive substring match against the canned triggers.
/// Name questions win when both match.
pub fn canned_topic(text: &str) -> Option<CannedTopic> {
    let normalized = text.to_lowercase();
    if NAME_TRIGGERS.iter().any(|t| normalized.contains(t)) {
        Some(CannedTopic::Name)
    } else if DEVELOPER_TRIGGERS.iter().any(|t| normalized.contains(t)) {
        Some(CannedTopic::Developer)
    } else {
        None
    }
}

pub struct ChatBot {
    provider: Arc<dyn ChatProvider>,
}

impl ChatBot {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn respond(&self, text: &str) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        if let Some(topic) = canned_topic(text) {
            tracing::debug!(?topic, "Answering with canned reply");
            return Ok(topic.reply().to_string());
        }

        if !self.provider.has_credential() {
            return Err(ChatError::MissingApiKey);
        }

        self.provider.reply(text).await.map_err(|e| {
            tracing::error!(provider = self.provider.name(), "Chat upstream failed: {e:#}");
            ChatError::Upstream(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        credential: bool,
        fail: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(credential: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                credential,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn reply(&self, message: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("upstream 503");
            }
            Ok(format!("model says: {message}"))
        }
    }

    #[test]
    fn triggers_match_case_insensitively_inside_sentences() {
        assert_eq!(canned_topic("Hey, WHAT IS YOUR NAME?"), Some(CannedTopic::Name));
        assert_eq!(canned_topic("so who made you then"), Some(CannedTopic::Developer));
        assert_eq!(canned_topic("what's the weather"), None);
    }

    #[test]
    fn name_wins_over_developer() {
        assert_eq!(
            canned_topic("who are you and who made you"),
            Some(CannedTopic::Name)
        );
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let bot = ChatBot::new(ScriptedProvider::new(true, false));
        assert!(matches!(bot.respond("   ").await, Err(ChatError::EmptyMessage)));
    }

    #[tokio::test]
    async fn canned_reply_bypasses_provider_even_without_key() {
        let provider = ScriptedProvider::new(false, false);
        let bot = ChatBot::new(provider.clone());

        assert_eq!(bot.respond("Tell me your name").await.unwrap(), NAME_REPLY);
        assert_eq!(bot.respond("Who is your developer?").await.unwrap(), DEVELOPER_REPLY);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_calling_upstream() {
        let provider = ScriptedProvider::new(false, false);
        let bot = ChatBot::new(provider.clone());

        let err = bot.respond("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "Chat API key not configured");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_reply_is_passed_through_trimmed_input() {
        let provider = ScriptedProvider::new(true, false);
        let bot = ChatBot::new(provider.clone());

        assert_eq!(bot.respond("  hello  ").await.unwrap(), "model says: hello");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upstream_failure_keeps_source() {
        let bot = ChatBot::new(ScriptedProvider::new(true, true));
        let err = bot.respond("hello").await.unwrap_err();
        let ChatError::Upstream(source) = err else {
            panic!("expected upstream error");
        };
        assert!(source.to_string().contains("503"));
    }
}
