//! Telegram update handlers.
//!
//! Every handler first records who it saw (user and chat), then replies
//! through the messaging ports in `AppState`. Reply failures are logged and
//! never abort the dispatcher.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Chat, Message, User},
};
use tracing::warn;

use idf_core::{domain::ChatId, formatting::escape_html, utils::now_ts};

use crate::{convert, router::AppState};

mod callback;
pub(crate) mod commands;
mod forwarded;
mod members;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    record(&state, msg.from(), Some(&msg.chat)).await;

    if let Some(members) = msg.new_chat_members() {
        members::welcome_members(&state, &msg, members).await;
        return Ok(());
    }

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(msg, state).await;
        }
    }

    if msg.chat.is_private() {
        forwarded::handle_forwarded(&state, &msg).await;
    }

    Ok(())
}

/// Upsert the user and chat behind an event. Storage errors are only logged.
pub(crate) async fn record(state: &AppState, user: Option<&User>, chat: Option<&Chat>) {
    let now = now_ts();
    if let Some(user) = user {
        if let Err(e) = state
            .directory
            .upsert_user(convert::user_profile(user, now))
            .await
        {
            warn!(user = user.id.0, error = %e, "failed to record user");
        }
    }
    if let Some(chat) = chat {
        if let Err(e) = state
            .directory
            .upsert_chat(convert::chat_record(chat, now))
            .await
        {
            warn!(chat = chat.id.0, error = %e, "failed to record chat");
        }
    }
}

pub(crate) async fn reply_html(state: &AppState, chat_id: ChatId, html: &str) {
    let limit = state.messenger.capabilities().max_message_len;
    for part in idf_core::formatting::split_lines(html, limit) {
        if let Err(e) = state.messenger.send_html(chat_id, &part).await {
            warn!(chat = %chat_id, error = %e, "reply failed");
            return;
        }
    }
}

/// Plain text reply; escaped so `<user_id>` style placeholders survive.
pub(crate) async fn reply_text(state: &AppState, chat_id: ChatId, text: &str) {
    reply_html(state, chat_id, &escape_html(text)).await
}
