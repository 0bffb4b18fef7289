//! Mapping from teloxide types to `idf-core` records.

use teloxide::types::{Chat, Message, User};

use idf_core::{
    domain::{ChatId, UserId},
    formatting::ForwardOrigin,
    model::{ChatKind, ChatRecord, UserProfile},
};

pub fn user_id(user: &User) -> UserId {
    UserId(user.id.0 as i64)
}

pub fn chat_id(chat: &Chat) -> ChatId {
    ChatId(chat.id.0)
}

pub fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Channel
    }
}

pub fn user_profile(user: &User, seen_at: i64) -> UserProfile {
    UserProfile {
        id: user_id(user),
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        language_code: user.language_code.clone(),
        last_seen: seen_at,
    }
}

/// Group and channel titles; private chats fall back to the peer's name.
pub fn chat_title(chat: &Chat) -> String {
    chat.title()
        .or_else(|| chat.username())
        .or_else(|| chat.first_name())
        .unwrap_or_default()
        .to_string()
}

pub fn chat_record(chat: &Chat, seen_at: i64) -> ChatRecord {
    ChatRecord {
        id: chat_id(chat),
        title: chat_title(chat),
        kind: chat_kind(chat),
        last_seen: seen_at,
    }
}

/// Display name: full name, else @username, else empty.
pub fn display_name(user: &User) -> String {
    let full = user.full_name();
    let full = full.trim();
    if !full.is_empty() {
        return full.to_string();
    }
    user.username.clone().unwrap_or_default()
}

pub fn forward_origin(msg: &Message) -> Option<ForwardOrigin> {
    if let Some(user) = msg.forward_from_user() {
        return Some(ForwardOrigin::User {
            id: user_id(user),
            name: display_name(user),
        });
    }
    if let Some(chat) = msg.forward_from_chat() {
        return Some(ForwardOrigin::Chat {
            id: chat_id(chat),
            kind: chat_kind(chat),
            title: chat_title(chat),
        });
    }
    msg.forward_from_sender_name()
        .map(|name| ForwardOrigin::Hidden {
            sender_name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tg_user(first: &str, last: Option<&str>, username: Option<&str>) -> User {
        User {
            id: teloxide::types::UserId(42),
            is_bot: false,
            first_name: first.to_string(),
            last_name: last.map(str::to_string),
            username: username.map(str::to_string),
            language_code: Some("en".to_string()),
            is_premium: false,
            added_to_attachment_menu: false,
        }
    }

    #[test]
    fn profile_carries_all_fields() {
        let p = user_profile(&tg_user("Ada", Some("Lovelace"), Some("ada")), 7);
        assert_eq!(p.id, UserId(42));
        assert_eq!(p.first_name, "Ada");
        assert_eq!(p.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(p.username.as_deref(), Some("ada"));
        assert_eq!(p.language_code.as_deref(), Some("en"));
        assert_eq!(p.last_seen, 7);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(display_name(&tg_user("Ada", Some("L"), None)), "Ada L");
        assert_eq!(display_name(&tg_user("", None, Some("ada"))), "ada");
        assert_eq!(display_name(&tg_user("", None, None)), "");
    }
}
