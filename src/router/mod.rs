//! Request router
//!
//! Classifies inbound text and drives the conversation: greeting, help,
//! URL rejection, or a download job followed by delivery and cleanup.

mod chat;
mod link;

pub use chat::{ChatApi, ChatError, Requester};
pub use link::is_url;

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::dispatcher::{Dispatcher, DownloadOutcome};

pub const HELP_TEXT: &str = "Send me a video URL, and I'll download it for you!";
pub const INVALID_URL_TEXT: &str = "This is not a valid URL. Please send a video URL.";
pub const STARTING_TEXT: &str = "Starting download. Please wait...";
pub const COMPLETED_TEXT: &str = "Download completed and file sent!";

pub fn greeting_html(requester: &Requester) -> String {
    format!(
        "Hi {}! Send me a video URL to download.",
        requester.mention_html()
    )
}

pub fn failure_text(max_attempts: u32) -> String {
    format!(
        "Failed to download after {} attempts. Please try again later.",
        max_attempts
    )
}

/// What an inbound message asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    Start,
    Help,
    /// A command this bot does not know; ignored
    UnknownCommand(&'a str),
    Text(&'a str),
}

impl<'a> Inbound<'a> {
    pub fn classify(text: &'a str) -> Self {
        let Some(command) = text.strip_prefix('/') else {
            return Inbound::Text(text);
        };

        // "/start@my_bot args" -> "start"
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or("")
            .split('@')
            .next()
            .unwrap_or("");

        match name {
            "start" => Inbound::Start,
            "help" => Inbound::Help,
            _ => Inbound::UnknownCommand(name),
        }
    }
}

pub struct Router {
    chat: Arc<dyn ChatApi>,
    dispatcher: Arc<Dispatcher>,
}

impl Router {
    pub fn new(chat: Arc<dyn ChatApi>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { chat, dispatcher }
    }

    /// Entry point for every inbound text message
    pub async fn handle(&self, requester: &Requester, text: &str) -> Result<(), ChatError> {
        match Inbound::classify(text) {
            Inbound::Start => self.on_start(requester).await,
            Inbound::Help => self.on_help(requester).await,
            Inbound::UnknownCommand(name) => {
                info!(user_id = requester.user_id, command = name, "Ignoring unknown command");
                Ok(())
            }
            Inbound::Text(text) => self.on_text(requester, text).await,
        }
    }

    pub async fn on_start(&self, requester: &Requester) -> Result<(), ChatError> {
        info!(
            "User {} ({}) started the bot",
            requester.user_id,
            requester.handle()
        );
        self.chat
            .send_html(requester.chat_id, &greeting_html(requester))
            .await
    }

    pub async fn on_help(&self, requester: &Requester) -> Result<(), ChatError> {
        info!(
            "User {} ({}) requested help",
            requester.user_id,
            requester.handle()
        );
        self.chat.send_text(requester.chat_id, HELP_TEXT).await
    }

    pub async fn on_text(&self, requester: &Requester, text: &str) -> Result<(), ChatError> {
        info!(
            "Received message from user {} ({}): {}",
            requester.user_id,
            requester.handle(),
            text
        );

        if !is_url(text) {
            warn!(
                "User {} ({}) sent invalid URL: {}",
                requester.user_id,
                requester.handle(),
                text
            );
            return self.chat.send_text(requester.chat_id, INVALID_URL_TEXT).await;
        }

        self.chat.send_text(requester.chat_id, STARTING_TEXT).await?;
        info!(url = text, "Starting download process");

        match self.dispatcher.submit(text).await {
            DownloadOutcome::Success(path) => {
                info!(path = %path.display(), "Sending file to user");
                let sent = self.chat.send_document(requester.chat_id, &path).await;

                info!(path = %path.display(), "Deleting file");
                if let Err(e) = self.dispatcher.release(&path).await {
                    warn!(path = %path.display(), error = %e, "Failed to delete file");
                }

                if let Err(e) = sent {
                    error!(user_id = requester.user_id, error = %e, "Failed to send file");
                    let notice = failure_text(self.dispatcher.max_attempts());
                    if let Err(notify) = self.chat.send_text(requester.chat_id, &notice).await {
                        warn!(user_id = requester.user_id, error = %notify, "Failed to report delivery failure");
                    }
                    return Err(e);
                }

                info!("Download and send process completed successfully");
                self.chat.send_text(requester.chat_id, COMPLETED_TEXT).await
            }
            DownloadOutcome::Failure(reason) => {
                let attempts = self.dispatcher.max_attempts();
                error!(
                    url = text,
                    "Failed to download after {} attempts: {}",
                    attempts,
                    reason
                );
                self.chat
                    .send_text(requester.chat_id, &failure_text(attempts))
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_commands() {
        assert_eq!(Inbound::classify("/start"), Inbound::Start);
        assert_eq!(Inbound::classify("/help"), Inbound::Help);
        assert_eq!(Inbound::classify("/start@audiograb_bot"), Inbound::Start);
        assert_eq!(Inbound::classify("/help me"), Inbound::Help);
        assert_eq!(Inbound::classify("/stop"), Inbound::UnknownCommand("stop"));
        assert_eq!(Inbound::classify("/"), Inbound::UnknownCommand(""));
    }

    #[test]
    fn test_classify_text() {
        assert_eq!(Inbound::classify("hello world"), Inbound::Text("hello world"));
        assert_eq!(
            Inbound::classify("https://example.com/video"),
            Inbound::Text("https://example.com/video")
        );
        // Commands are recognised only at the very start
        assert_eq!(Inbound::classify(" /start"), Inbound::Text(" /start"));
    }

    #[test]
    fn test_failure_text_names_attempts() {
        assert_eq!(
            failure_text(3),
            "Failed to download after 3 attempts. Please try again later."
        );
    }
}
