use teloxide::types::{Message, User};
use tracing::warn;

use idf_core::{formatting::welcome_text, messaging::types::InlineKeyboard};

use crate::{convert, router::AppState};

use super::record;

pub async fn welcome_members(state: &AppState, msg: &Message, members: &[User]) {
    let chat = convert::chat_id(&msg.chat);
    let title = msg.chat.title();

    for member in members.iter().filter(|m| !m.is_bot) {
        record(state, Some(member), None).await;

        let text = welcome_text(&convert::display_name(member), title);
        if let Err(e) = state
            .messenger
            .send_inline_keyboard(chat, &text, InlineKeyboard::copy_id())
            .await
        {
            warn!(chat = %chat, user = member.id.0, error = %e, "failed to welcome member");
        }
    }
}
