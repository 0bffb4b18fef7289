use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, UserId},
    messaging::types::{InlineKeyboard, MessagingCapabilities},
    Result,
};

/// Outbound transport port.
///
/// The broadcast engine only needs `send_html`; the rest serves the
/// interactive handlers.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    /// `show_alert` pops a modal instead of a toast.
    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()>;
}

/// Group moderation actions.
#[async_trait]
pub trait ModerationPort: Send + Sync {
    async fn ban_member(&self, chat_id: ChatId, user: UserId) -> Result<()>;
    async fn unban_member(&self, chat_id: ChatId, user: UserId) -> Result<()>;

    /// Remove a member without leaving them banned.
    async fn kick_member(&self, chat_id: ChatId, user: UserId) -> Result<()> {
        self.ban_member(chat_id, user).await?;
        self.unban_member(chat_id, user).await
    }
}
