//! Telegram transport via teloxide

use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
// The router's `Requester` shadows the prelude trait that provides the send methods
use teloxide::requests::Requester as _;
use teloxide::types::{InputFile, ParseMode, User};
use tracing::{error, info};

use crate::router::{ChatApi, ChatError, Requester, Router};

/// Outbound chat operations backed by the Bot API
#[derive(Clone)]
pub struct TelegramChat {
    bot: Bot,
}

impl TelegramChat {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatApi for TelegramChat {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;
        Ok(())
    }

    async fn send_html(&self, chat_id: i64, html: &str) -> Result<(), ChatError> {
        self.bot
            .send_message(ChatId(chat_id), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, path: &Path) -> Result<(), ChatError> {
        // Surface a missing file as an I/O error rather than an API error
        tokio::fs::metadata(path).await?;

        let mut document = InputFile::file(path.to_path_buf());
        if let Some(name) = path.file_name() {
            document = document.file_name(name.to_string_lossy().into_owned());
        }

        self.bot
            .send_document(ChatId(chat_id), document)
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;
        Ok(())
    }
}

pub fn requester_from(chat_id: ChatId, user: Option<&User>) -> Requester {
    match user {
        Some(user) => Requester {
            chat_id: chat_id.0,
            user_id: user.id.0,
            username: user.username.clone(),
            display_name: user.full_name(),
        },
        None => Requester {
            chat_id: chat_id.0,
            user_id: 0,
            username: None,
            display_name: "there".to_string(),
        },
    }
}

/// Poll for updates and route text messages until Ctrl+C
///
/// Updates are handled fully concurrently, so a long download for one user
/// never holds up messages from anyone else (including the same chat).
pub async fn run(bot: Bot, router: Arc<Router>) {
    info!("Bot is now polling for updates");

    let handler = Update::filter_message().endpoint(move |msg: Message| {
        let router = Arc::clone(&router);
        async move {
            let Some(text) = msg.text() else {
                return respond(());
            };
            let requester = requester_from(msg.chat.id, msg.from.as_ref());

            if let Err(e) = router.handle(&requester, text).await {
                error!(
                    user_id = requester.user_id,
                    chat_id = requester.chat_id,
                    error = %e,
                    "Failed to answer message"
                );
            }
            respond(())
        }
    });

    Dispatcher::builder(bot, handler)
        .distribution_function(|_| None::<Infallible>)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Stopped polling for updates");
}
