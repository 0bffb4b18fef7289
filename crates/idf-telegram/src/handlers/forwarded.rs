use teloxide::types::Message;

use idf_core::formatting::{forwarded_text, FORWARD_HINT};

use crate::{convert, router::AppState};

use super::{reply_html, reply_text};

/// Private chats: reveal both ids of a forwarded message, or hint how to use the bot.
pub async fn handle_forwarded(state: &AppState, msg: &Message) {
    let chat = convert::chat_id(&msg.chat);
    match convert::forward_origin(msg) {
        Some(origin) => {
            let sender = msg.from().map(convert::user_id);
            reply_html(state, chat, &forwarded_text(sender, &origin)).await;
        }
        None => reply_text(state, chat, FORWARD_HINT).await,
    }
}
