use std::sync::Arc;

use teloxide::{prelude::*, types::CallbackQuery};
use tracing::warn;

use idf_core::{
    domain::{MessageId, MessageRef},
    formatting::{help_text, id_text},
    messaging::types::CallbackAction,
};

use crate::{convert, router::AppState};

use super::record;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    record(&state, Some(&q.from), None).await;

    let user = convert::user_id(&q.from);
    let origin = q.message.as_ref().map(|m| MessageRef {
        chat_id: convert::chat_id(&m.chat),
        message_id: MessageId(m.id.0),
    });
    let action = q.data.as_deref().and_then(CallbackAction::parse);

    // Inline-mode messages carry no chat; the buttons only edit bot messages.
    let edit = match (action, origin) {
        (Some(CallbackAction::MyId), Some(m)) => Some((m, id_text(user))),
        (Some(CallbackAction::Help), Some(m)) => Some((m, help_text())),
        _ => None,
    };
    if let Some((target, html)) = edit {
        if let Err(e) = state.messenger.edit_html(target, &html).await {
            warn!(chat = %target.chat_id, error = %e, "callback edit failed");
        }
    }

    let res = match action {
        Some(CallbackAction::CopyId) => {
            let text = format!("Your ID: {user}");
            state
                .messenger
                .answer_callback_query(&q.id, Some(text.as_str()), true)
                .await
        }
        _ => state.messenger.answer_callback_query(&q.id, None, false).await,
    };
    if let Err(e) = res {
        warn!(user = %user, error = %e, "failed to answer callback");
    }

    Ok(())
}
