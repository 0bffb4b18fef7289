//! Reply texts (Telegram HTML parse mode).

use crate::{
    domain::{ChatId, JobId, UserId},
    model::{AdminRecord, BotStats, BroadcastJob, ChatKind, UserProfile},
    utils::{format_date, truncate_chars, truncate_text},
};

pub const BROADCAST_USAGE: &str =
    "Usage: /broadcast your message here\nOr reply to a message with /broadcast.";
pub const FORWARD_HINT: &str = "Forward a message to me and I’ll show you the IDs.";
pub const PING_TEXT: &str = "🏓 Pinging...";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn start_text(name: &str) -> String {
    let name = if name.trim().is_empty() { "there" } else { name };
    format!(
        "👋 Hello <b>{}</b>!\n\n\
🔹 <b>IDFinderBot</b> — your quick tool to get IDs on Telegram.\n\n\
✨ <b>Commands</b>\n\
• /myid — Show your User ID & Chat ID\n\
• /whoami — Full details about you\n\
• /ping — Test bot response\n\
• /stats — Bot statistics (Admins)\n\
• /broadcast — Send to all users (Owner)\n\n\
📌 Forward any message here to reveal:\n\
▫️ <b>UR ID</b>\n▫️ <b>FORWARDED ID</b>\n\n\
⚡ Fast • 📱 Simple • 🎨 Clean",
        escape_html(name)
    )
}

pub fn help_text() -> String {
    "ℹ️ <b>Help</b>\n\n\
/myid - Show your ID & chat ID\n\
/whoami - Your full info\n\
/ping - latency\n\
/stats - admin stats\n\
/broadcast - owner only\n\
Forward a message to get UR ID and FORWARDED ID"
        .to_string()
}

/// Short form used by the inline "Get My ID" button.
pub fn id_text(user: UserId) -> String {
    format!("🆔 <b>Your ID</b>\n<code>{user}</code>")
}

pub fn myid_text(user: UserId, chat: Option<(ChatId, ChatKind)>) -> String {
    let (chat_id, kind) = match chat {
        Some((id, kind)) => (id.to_string(), kind.as_str()),
        None => ("Unknown".to_string(), "Unknown"),
    };
    format!(
        "{}\n\n💬 <b>Chat ID</b>\n<code>{chat_id}</code>\nType: {}",
        id_text(user),
        escape_html(kind)
    )
}

pub fn whoami_text(user: &UserProfile) -> String {
    let uname = match user.username.as_deref().filter(|s| !s.is_empty()) {
        Some(u) => format!("@{u}"),
        None => "-".to_string(),
    };
    let full_name = user.full_name();
    let full_name = if full_name.is_empty() { "-" } else { full_name.as_str() };

    let mut out = format!(
        "👤 <b>Your Profile</b>\n\n\
🆔 <b>User ID:</b> <code>{}</code>\n\
📛 <b>Name:</b> {}\n\
🔗 <b>Username:</b> {}\n",
        user.id,
        escape_html(full_name),
        escape_html(&uname)
    );
    if let Some(lang) = user.language_code.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("🌐 <b>Language:</b> {}\n", escape_html(lang)));
    }
    out
}

pub fn pong_text(latency_ms: u128) -> String {
    format!("🏓 <b>Pong!</b>\nLatency: <code>{latency_ms} ms</code>")
}

/// Where a forwarded message originally came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForwardOrigin {
    User { id: UserId, name: String },
    Chat { id: ChatId, kind: ChatKind, title: String },
    /// The original sender hides their account; only a display name is known.
    Hidden { sender_name: String },
}

pub fn forwarded_text(sender: Option<UserId>, origin: &ForwardOrigin) -> String {
    let sender = sender
        .map(|u| u.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let head = format!("✅ <b>UR ID</b>\n<code>{sender}</code>\n\n🔁 <b>FORWARDED ID</b>\n");

    match origin {
        ForwardOrigin::User { id, name } => {
            let name = if name.trim().is_empty() { "User" } else { name.as_str() };
            format!("{head}<code>{id}</code>\n\nName: {}", escape_html(name))
        }
        ForwardOrigin::Chat { id, kind, title } => {
            let title = if title.trim().is_empty() { "Chat" } else { title.as_str() };
            format!(
                "{head}<code>{id}</code>\n\nForwarded from {}: {}",
                escape_html(kind.as_str()),
                escape_html(title)
            )
        }
        ForwardOrigin::Hidden { sender_name } => format!(
            "{head}<code>Not available</code>\n\nForwarded sender name: {}",
            escape_html(sender_name)
        ),
    }
}

pub fn welcome_text(name: &str, group_title: Option<&str>) -> String {
    let name = if name.trim().is_empty() { "there" } else { name };
    let title = group_title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("this group");
    format!(
        "🎉 <b>Welcome {}!</b>\n\n\
Glad to have you in <b>{}</b>.\n\
Use <code>/myid</code> to find your Telegram ID.",
        escape_html(name),
        escape_html(title)
    )
}

pub fn stats_text(s: &BotStats) -> String {
    format!(
        "📊 <b>Bot stats</b>\n\n\
👥 Tracked users: <code>{}</code>\n\
💬 Tracked chats: <code>{}</code>\n\
📣 Broadcasts: <code>{}</code>",
        s.users, s.chats, s.broadcasts
    )
}

pub fn user_list_text(users: &[UserProfile]) -> String {
    let mut lines = vec!["👥 <b>Recent known users</b>\n".to_string()];
    for u in users {
        let uname = match u.username.as_deref().filter(|s| !s.is_empty()) {
            Some(name) => format!("@{name}"),
            None => "-".to_string(),
        };
        let name = u.full_name();
        lines.push(format!(
            "{} — {} — {} — {}",
            u.id,
            escape_html(if name.is_empty() { "-" } else { name.as_str() }),
            escape_html(&uname),
            format_date(u.last_seen)
        ));
    }
    lines.join("\n")
}

pub fn admin_list_text(admins: &[AdminRecord]) -> String {
    if admins.is_empty() {
        return "No admins.".to_string();
    }
    let mut lines = vec!["👮 <b>Admins</b>\n".to_string()];
    for a in admins {
        lines.push(format!(
            "{} — added_by: {} — {}",
            a.user_id,
            a.added_by,
            format_date(a.added_at)
        ));
    }
    lines.join("\n")
}

pub fn broadcast_started_text(job: JobId) -> String {
    format!("Broadcast started — id {job}. Sending to users...")
}

pub fn broadcast_list_text(jobs: &[BroadcastJob]) -> String {
    if jobs.is_empty() {
        return "No broadcasts yet.".to_string();
    }
    let mut lines = vec!["📣 <b>Recent broadcasts</b>\n".to_string()];
    for j in jobs {
        lines.push(format!(
            "#{} — {} — {} — delivered <code>{}</code> — by {}\n<i>{}</i>",
            j.id,
            format_date(j.created_at),
            j.status,
            j.delivered,
            j.initiator,
            escape_html(&truncate_text(&j.payload, 40))
        ));
    }
    lines.join("\n")
}

/// Split a multi-line reply into messages of at most `limit` chars, breaking
/// between lines. A single line longer than `limit` is cut.
pub fn split_lines(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut out = Vec::new();
    let mut chunk = String::new();
    let mut chunk_len = 0usize;

    for line in text.split('\n') {
        let line = truncate_chars(line, limit);
        let line_len = line.chars().count();
        let needed = if chunk.is_empty() { line_len } else { chunk_len + 1 + line_len };
        if needed > limit && !chunk.is_empty() {
            out.push(std::mem::take(&mut chunk));
            chunk_len = 0;
        }
        if !chunk.is_empty() {
            chunk.push('\n');
            chunk_len += 1;
        }
        chunk.push_str(&line);
        chunk_len += line_len;
    }
    if !chunk.is_empty() || out.is_empty() {
        out.push(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::JobStatus;

    #[test]
    fn split_lines_breaks_between_lines() {
        assert_eq!(split_lines("short", 100), vec!["short"]);
        assert_eq!(split_lines("aaa\nbbb\nccc", 7), vec!["aaa\nbbb", "ccc"]);
        assert_eq!(split_lines("abcdef\nx", 3), vec!["abc", "x"]);

        let long = (0..300).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let parts = split_lines(&long, 4096);
        assert!(parts.len() == 1 || parts.iter().all(|p| p.chars().count() <= 4096));
        assert_eq!(parts.join("\n"), long);
    }

    fn user(username: Option<&str>, lang: Option<&str>) -> UserProfile {
        UserProfile {
            id: UserId(42),
            username: username.map(str::to_string),
            first_name: "Ada".to_string(),
            last_name: Some("<Lovelace>".to_string()),
            language_code: lang.map(str::to_string),
            last_seen: 0,
        }
    }

    #[test]
    fn start_text_escapes_and_defaults_name() {
        assert!(start_text("<b>").contains("Hello <b>&lt;b&gt;</b>"));
        assert!(start_text("").contains("Hello <b>there</b>"));
    }

    #[test]
    fn myid_handles_missing_chat() {
        let t = myid_text(UserId(7), Some((ChatId(-100), ChatKind::Supergroup)));
        assert!(t.contains("<code>7</code>"));
        assert!(t.contains("<code>-100</code>"));
        assert!(t.contains("Type: supergroup"));

        let t = myid_text(UserId(7), None);
        assert!(t.contains("<code>Unknown</code>"));
    }

    #[test]
    fn whoami_lists_optional_fields() {
        let t = whoami_text(&user(Some("ada"), Some("en")));
        assert!(t.contains("Ada &lt;Lovelace&gt;"));
        assert!(t.contains("@ada"));
        assert!(t.contains("Language:</b> en"));

        let t = whoami_text(&user(None, None));
        assert!(t.contains("Username:</b> -"));
        assert!(!t.contains("Language"));
    }

    #[test]
    fn forwarded_from_user_chat_and_hidden_sender() {
        let t = forwarded_text(
            Some(UserId(1)),
            &ForwardOrigin::User {
                id: UserId(2),
                name: "Bob".to_string(),
            },
        );
        assert!(t.contains("UR ID</b>\n<code>1</code>"));
        assert!(t.contains("FORWARDED ID</b>\n<code>2</code>"));
        assert!(t.ends_with("Name: Bob"));

        let t = forwarded_text(
            None,
            &ForwardOrigin::Chat {
                id: ChatId(-1001),
                kind: ChatKind::Channel,
                title: String::new(),
            },
        );
        assert!(t.contains("<code>Unknown</code>"));
        assert!(t.ends_with("Forwarded from channel: Chat"));

        let t = forwarded_text(
            Some(UserId(1)),
            &ForwardOrigin::Hidden {
                sender_name: "Anon & co".to_string(),
            },
        );
        assert!(t.contains("<code>Not available</code>"));
        assert!(t.ends_with("Forwarded sender name: Anon &amp; co"));
    }

    #[test]
    fn welcome_defaults_group_title() {
        let t = welcome_text("Eve", None);
        assert!(t.contains("Welcome Eve!"));
        assert!(t.contains("<b>this group</b>"));
    }

    #[test]
    fn admin_list_handles_empty() {
        assert_eq!(admin_list_text(&[]), "No admins.");
        let t = admin_list_text(&[AdminRecord {
            user_id: UserId(5),
            added_by: UserId(1),
            added_at: 0,
        }]);
        assert!(t.contains("5 — added_by: 1 — -"));
    }

    #[test]
    fn broadcast_list_shows_status_and_preview() {
        let t = broadcast_list_text(&[BroadcastJob {
            id: JobId(3),
            created_at: 0,
            initiator: UserId(42),
            payload: "x".repeat(100),
            delivered: 17,
            status: JobStatus::Running,
        }]);
        assert!(t.contains("#3 — - — running — delivered <code>17</code> — by 42"));
        assert!(t.contains(&format!("<i>{}...</i>", "x".repeat(40))));
        assert_eq!(broadcast_started_text(JobId(9)), "Broadcast started — id 9. Sending to users...");
    }

    #[test]
    fn user_list_escapes_names() {
        let t = user_list_text(&[user(Some("ada"), None)]);
        assert!(t.starts_with("👥 <b>Recent known users</b>\n"));
        assert!(t.contains("42 — Ada &lt;Lovelace&gt; — @ada — -"));
    }
}
