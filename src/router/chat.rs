use async_trait::async_trait;
use std::path::Path;
use teloxide::types::UserId;
use teloxide::utils::html;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Request(String),

    #[error("file not readable: {0}")]
    File(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;

/// The person (and chat) a message came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub chat_id: i64,
    pub user_id: u64,
    pub username: Option<String>,
    pub display_name: String,
}

impl Requester {
    /// `@handle` when available, otherwise the display name
    pub fn handle(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.display_name)
    }

    /// HTML link that mentions the user
    pub fn mention_html(&self) -> String {
        html::user_mention(UserId(self.user_id), &self.display_name)
    }
}

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    async fn send_html(&self, chat_id: i64, html: &str) -> Result<()>;

    async fn send_document(&self, chat_id: i64, path: &Path) -> Result<()>;
}
