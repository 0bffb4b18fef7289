use std::{sync::Arc, time::Instant};

use teloxide::prelude::*;
use tracing::{debug, error, info, warn};

use idf_core::{
    domain::{ChatId, JobId, UserId},
    errors::Error,
    export::export_users,
    formatting::{
        admin_list_text, broadcast_list_text, broadcast_started_text, myid_text, pong_text,
        start_text, stats_text, user_list_text, whoami_text, BROADCAST_USAGE, PING_TEXT,
    },
    messaging::types::InlineKeyboard,
    utils::now_ts,
};

use crate::{convert, router::AppState};

use super::{reply_html, reply_text};

const GROUP_ONLY: &str = "This command must be used in a group (reply to a user's message).";
const UNBAN_USAGE: &str = "Usage: /unban <user_id> or reply to a user's message.";

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ParsedCommand {
    pub name: String,
    /// Bot named in `/cmd@botname`, if any.
    pub target: Option<String>,
    pub args: String,
}

pub(crate) fn parse_command(text: &str) -> ParsedCommand {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let args = parts.next().unwrap_or("").trim().to_string();

    let (cmd, target) = match first.trim_start_matches('/').split_once('@') {
        Some((cmd, target)) => (cmd, Some(target.to_string())),
        None => (first.trim_start_matches('/'), None),
    };

    ParsedCommand {
        name: cmd.to_lowercase(),
        target,
        args,
    }
}

/// A `/cmd@other_bot` command is meant for another bot in the same chat.
/// Without our own username any explicit target is treated as foreign.
fn addressed_elsewhere(target: Option<&str>, me: Option<&str>) -> bool {
    match (target, me) {
        (None, _) => false,
        (Some(target), Some(me)) => !target.eq_ignore_ascii_case(me),
        (Some(_), None) => true,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    MyId,
    WhoAmI,
    Ping,
    Stats,
    ListUsers,
    Export,
    Ban,
    Unban,
    Kick,
    Broadcasts,
    Broadcast,
    AddAdmin,
    RemoveAdmin,
    ListAdmins,
}

impl Command {
    fn parse(name: &str) -> Option<Self> {
        let cmd = match name {
            "start" => Command::Start,
            "help" => Command::Help,
            "myid" => Command::MyId,
            "whoami" => Command::WhoAmI,
            "ping" => Command::Ping,
            "stats" => Command::Stats,
            "listusers" => Command::ListUsers,
            "export" => Command::Export,
            "ban" => Command::Ban,
            "unban" => Command::Unban,
            "kick" => Command::Kick,
            "broadcasts" => Command::Broadcasts,
            "broadcast" => Command::Broadcast,
            "addadmin" => Command::AddAdmin,
            "removeadmin" => Command::RemoveAdmin,
            "listadmins" => Command::ListAdmins,
            _ => return None,
        };
        Some(cmd)
    }

    fn access(self) -> Access {
        match self {
            Command::Start | Command::Help | Command::MyId | Command::WhoAmI | Command::Ping => {
                Access::Anyone
            }
            Command::Stats
            | Command::ListUsers
            | Command::Export
            | Command::Ban
            | Command::Unban
            | Command::Kick
            | Command::Broadcasts => Access::Admin,
            Command::Broadcast
            | Command::AddAdmin
            | Command::RemoveAdmin
            | Command::ListAdmins => Access::Owner,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Access {
    Anyone,
    Admin,
    Owner,
}

pub(crate) fn is_known(name: &str) -> bool {
    Command::parse(name).is_some()
}

/// Broadcast text: the replied message's text or caption wins over arguments.
fn broadcast_source(replied: Option<&str>, args: &str) -> Option<String> {
    match replied.filter(|t| !t.is_empty()) {
        Some(t) => Some(t.to_string()),
        None if !args.is_empty() => Some(args.to_string()),
        None => None,
    }
}

fn parse_user_id(args: &str) -> Option<UserId> {
    args.split_whitespace()
        .next()?
        .parse::<i64>()
        .ok()
        .map(UserId)
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let text = msg.text().unwrap_or_default();
    let ParsedCommand { name, target, args } = parse_command(text);
    if addressed_elsewhere(target.as_deref(), state.bot_username.as_deref()) {
        debug!(command = %name, target = ?target, "command addressed to another bot");
        return Ok(());
    }
    let Some(cmd) = Command::parse(&name) else {
        return Ok(());
    };

    let chat = convert::chat_id(&msg.chat);
    let caller = msg.from().map(convert::user_id);

    let allowed = match cmd.access() {
        Access::Anyone => Ok(()),
        Access::Admin => state.guard.require_admin(caller).await,
        Access::Owner => state.guard.require_owner(caller),
    };
    if let Err(denied) = allowed {
        info!(command = %name, caller = ?caller.map(|u| u.0), "command denied");
        reply_text(&state, chat, denied.message()).await;
        return Ok(());
    }

    match cmd {
        Command::Start | Command::Help => start(&state, &msg, chat).await,
        Command::MyId => myid(&state, &msg, chat).await,
        Command::WhoAmI => whoami(&state, &msg, chat).await,
        Command::Ping => ping(&state, chat).await,
        Command::Stats => stats(&state, chat).await,
        Command::ListUsers => list_users(&state, chat).await,
        Command::Export => export(&state, chat).await,
        Command::Ban => ban(&state, &msg, chat, false).await,
        Command::Kick => ban(&state, &msg, chat, true).await,
        Command::Unban => unban(&state, &msg, chat, &args).await,
        Command::Broadcasts => list_broadcasts(&state, chat).await,
        Command::Broadcast => broadcast(&state, &msg, chat, &args).await,
        Command::AddAdmin => add_admin(&state, chat, caller, &args).await,
        Command::RemoveAdmin => remove_admin(&state, chat, &args).await,
        Command::ListAdmins => list_admins(&state, chat).await,
    }

    Ok(())
}

async fn start(state: &AppState, msg: &Message, chat: ChatId) {
    let Some(user) = msg.from() else {
        return;
    };
    if state.guard.is_owner(Some(convert::user_id(user))) {
        if let Err(e) = state.guard.register_owner().await {
            warn!(error = %e, "failed to register owner as admin");
        }
    }

    let name = if user.first_name.is_empty() {
        user.username.clone().unwrap_or_default()
    } else {
        user.first_name.clone()
    };
    if let Err(e) = state
        .messenger
        .send_inline_keyboard(chat, &start_text(&name), InlineKeyboard::start_menu())
        .await
    {
        warn!(chat = %chat, error = %e, "failed to send greeting");
    }
}

async fn myid(state: &AppState, msg: &Message, chat: ChatId) {
    let Some(user) = msg.from() else {
        return;
    };
    let text = myid_text(
        convert::user_id(user),
        Some((chat, convert::chat_kind(&msg.chat))),
    );
    reply_html(state, chat, &text).await;
}

async fn whoami(state: &AppState, msg: &Message, chat: ChatId) {
    let Some(user) = msg.from() else {
        return;
    };
    let profile = convert::user_profile(user, now_ts());
    reply_html(state, chat, &whoami_text(&profile)).await;
}

async fn ping(state: &AppState, chat: ChatId) {
    let started = Instant::now();
    let sent = match state.messenger.send_html(chat, PING_TEXT).await {
        Ok(m) => m,
        Err(e) => {
            warn!(chat = %chat, error = %e, "ping failed");
            return;
        }
    };
    let latency = started.elapsed().as_millis();
    if let Err(e) = state.messenger.edit_html(sent, &pong_text(latency)).await {
        warn!(chat = %chat, error = %e, "failed to edit ping reply");
    }
}

async fn stats(state: &AppState, chat: ChatId) {
    match state.directory.stats().await {
        Ok(s) => reply_html(state, chat, &stats_text(&s)).await,
        Err(e) => {
            error!(error = %e, "stats query failed");
            reply_text(state, chat, &format!("Failed to load stats: {e}")).await;
        }
    }
}

async fn list_users(state: &AppState, chat: ChatId) {
    match state.directory.recent_users(state.cfg.list_users_limit).await {
        Ok(users) => reply_html(state, chat, &user_list_text(&users)).await,
        Err(e) => {
            error!(error = %e, "user listing failed");
            reply_text(state, chat, &format!("Failed to list users: {e}")).await;
        }
    }
}

async fn export(state: &AppState, chat: ChatId) {
    let users = match state.directory.all_users().await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "export query failed");
            reply_text(state, chat, &format!("Export failed: {e}")).await;
            return;
        }
    };

    let path = state.cfg.export_path.clone();
    let written = {
        let path = path.clone();
        tokio::task::spawn_blocking(move || export_users(&path, &users))
            .await
            .map_err(|e| Error::External(format!("export task failed: {e}")))
            .and_then(|r| r)
    };

    match written {
        Ok(n) => {
            info!(rows = n, path = %path.display(), "users exported");
            reply_text(
                state,
                chat,
                &format!("Exported {n} users to {}", path.display()),
            )
            .await;
        }
        Err(e) => {
            error!(error = %e, path = %path.display(), "export failed");
            reply_text(state, chat, &format!("Export failed: {e}")).await;
        }
    }
}

/// `/ban` and `/kick`: both need a group and a replied-to message.
async fn ban(state: &AppState, msg: &Message, chat: ChatId, kick: bool) {
    if !convert::chat_kind(&msg.chat).is_group_like() {
        reply_text(state, chat, GROUP_ONLY).await;
        return;
    }
    let verb = if kick { "kick" } else { "ban" };
    let Some(target) = msg.reply_to_message().and_then(|m| m.from()) else {
        reply_text(
            state,
            chat,
            &format!("Reply to the user's message you want to {verb}."),
        )
        .await;
        return;
    };
    let target = convert::user_id(target);

    let res = if kick {
        state.moderation.kick_member(chat, target).await
    } else {
        state.moderation.ban_member(chat, target).await
    };
    match res {
        Ok(()) => {
            let done = if kick { "kicked" } else { "banned" };
            info!(chat = %chat, user = %target, action = verb, "moderation applied");
            reply_text(state, chat, &format!("User {target} has been {done}.")).await;
        }
        Err(e) => {
            warn!(chat = %chat, user = %target, action = verb, error = %e, "moderation failed");
            reply_text(state, chat, &format!("Failed to {verb}: {e}")).await;
        }
    }
}

async fn unban(state: &AppState, msg: &Message, chat: ChatId, args: &str) {
    let target = match msg.reply_to_message().and_then(|m| m.from()) {
        Some(u) => Some(convert::user_id(u)),
        None => parse_user_id(args),
    };
    let Some(target) = target else {
        reply_text(state, chat, UNBAN_USAGE).await;
        return;
    };

    match state.moderation.unban_member(chat, target).await {
        Ok(()) => {
            info!(chat = %chat, user = %target, action = "unban", "moderation applied");
            reply_text(state, chat, &format!("User {target} has been unbanned.")).await;
        }
        Err(e) => {
            warn!(chat = %chat, user = %target, action = "unban", error = %e, "moderation failed");
            reply_text(state, chat, &format!("Failed to unban: {e}")).await;
        }
    }
}

async fn list_broadcasts(state: &AppState, chat: ChatId) {
    match state
        .broadcaster
        .recent(state.cfg.list_broadcasts_limit)
        .await
    {
        Ok(jobs) => reply_html(state, chat, &broadcast_list_text(&jobs)).await,
        Err(e) => {
            error!(error = %e, "broadcast listing failed");
            reply_text(state, chat, &format!("Failed to list broadcasts: {e}")).await;
        }
    }
}

async fn broadcast(state: &AppState, msg: &Message, chat: ChatId, args: &str) {
    let Some(initiator) = msg.from().map(convert::user_id) else {
        return;
    };
    let replied = msg
        .reply_to_message()
        .and_then(|m| m.text().or_else(|| m.caption()));
    let Some(payload) = broadcast_source(replied, args) else {
        reply_text(state, chat, BROADCAST_USAGE).await;
        return;
    };

    let submitted = state.broadcaster.submit(&payload, initiator).await;
    if let Err(e) = &submitted {
        if !matches!(e, Error::Validation(_)) {
            error!(initiator = %initiator, error = %e, "broadcast submission failed");
        }
    }
    reply_text(state, chat, &submission_reply(&submitted)).await;
}

/// Reply for a `/broadcast` submission. Rejected payloads get the usage text.
fn submission_reply(submitted: &idf_core::Result<JobId>) -> String {
    match submitted {
        Ok(job) => broadcast_started_text(*job),
        Err(Error::Validation(_)) => BROADCAST_USAGE.to_string(),
        Err(e) => format!("Broadcast failed: {e}"),
    }
}

async fn add_admin(state: &AppState, chat: ChatId, caller: Option<UserId>, args: &str) {
    if args.is_empty() {
        reply_text(state, chat, "Usage: /addadmin <user_id>").await;
        return;
    }
    let Some(uid) = parse_user_id(args) else {
        reply_text(state, chat, "Invalid user id.").await;
        return;
    };
    let added_by = caller.unwrap_or(UserId(0));
    match state.admins.add_admin(uid, added_by, now_ts()).await {
        Ok(()) => {
            info!(user = %uid, added_by = %added_by, "admin added");
            reply_text(state, chat, &format!("Added admin: {uid}")).await;
        }
        Err(e) => {
            error!(user = %uid, error = %e, "failed to add admin");
            reply_text(state, chat, &format!("Failed to add admin: {e}")).await;
        }
    }
}

async fn remove_admin(state: &AppState, chat: ChatId, args: &str) {
    if args.is_empty() {
        reply_text(state, chat, "Usage: /removeadmin <user_id>").await;
        return;
    }
    let Some(uid) = parse_user_id(args) else {
        reply_text(state, chat, "Invalid user id.").await;
        return;
    };
    match state.admins.remove_admin(uid).await {
        Ok(()) => {
            info!(user = %uid, "admin removed");
            reply_text(state, chat, &format!("Removed admin: {uid}")).await;
        }
        Err(e) => {
            error!(user = %uid, error = %e, "failed to remove admin");
            reply_text(state, chat, &format!("Failed to remove admin: {e}")).await;
        }
    }
}

async fn list_admins(state: &AppState, chat: ChatId) {
    match state.admins.list_admins().await {
        Ok(rows) if rows.is_empty() => reply_text(state, chat, "No admins.").await,
        Ok(rows) => reply_html(state, chat, &admin_list_text(&rows)).await,
        Err(e) => {
            error!(error = %e, "admin listing failed");
            reply_text(state, chat, &format!("Failed to list admins: {e}")).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str, target: Option<&str>, args: &str) -> ParsedCommand {
        ParsedCommand {
            name: name.to_string(),
            target: target.map(str::to_string),
            args: args.to_string(),
        }
    }

    #[test]
    fn parse_command_splits_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/Broadcast@IDFinderBot hello  world"),
            parsed("broadcast", Some("IDFinderBot"), "hello  world")
        );
        assert_eq!(parse_command("/ping"), parsed("ping", None, ""));
        assert_eq!(parse_command("  /unban   123 "), parsed("unban", None, "123"));
    }

    #[test]
    fn commands_for_other_bots_are_ignored() {
        let me = Some("IDFinderBot");
        let target = |text: &str| parse_command(text).target;

        assert!(addressed_elsewhere(target("/ban@SomeOtherBot").as_deref(), me));
        assert!(addressed_elsewhere(target("/kick@idfinderbot_x").as_deref(), me));
        assert!(!addressed_elsewhere(target("/ban@IDFinderBot").as_deref(), me));
        assert!(!addressed_elsewhere(target("/ban@idfinderbot").as_deref(), me));
        assert!(!addressed_elsewhere(target("/ban").as_deref(), me));

        // Unknown own name: only untargeted commands are accepted.
        assert!(addressed_elsewhere(target("/ban@IDFinderBot").as_deref(), None));
        assert!(!addressed_elsewhere(target("/ban").as_deref(), None));
    }

    #[test]
    fn commands_map_to_access_levels() {
        assert_eq!(Command::parse("myid").map(Command::access), Some(Access::Anyone));
        assert_eq!(Command::parse("export").map(Command::access), Some(Access::Admin));
        assert_eq!(Command::parse("broadcasts").map(Command::access), Some(Access::Admin));
        assert_eq!(Command::parse("broadcast").map(Command::access), Some(Access::Owner));
        assert_eq!(Command::parse("listadmins").map(Command::access), Some(Access::Owner));
        assert!(!is_known("frobnicate"));
    }

    #[test]
    fn broadcast_text_prefers_replied_message() {
        assert_eq!(
            broadcast_source(Some("from reply"), "from args"),
            Some("from reply".to_string())
        );
        assert_eq!(
            broadcast_source(Some(""), "from args"),
            Some("from args".to_string())
        );
        assert_eq!(broadcast_source(None, "from args"), Some("from args".to_string()));
        assert_eq!(broadcast_source(None, ""), None);
    }

    #[test]
    fn user_id_arguments() {
        assert_eq!(parse_user_id("12345"), Some(UserId(12345)));
        assert_eq!(parse_user_id("12345 extra"), Some(UserId(12345)));
        assert_eq!(parse_user_id("@someone"), None);
        assert_eq!(parse_user_id(""), None);
    }

    #[test]
    fn submission_reply_reflects_outcome() {
        assert_eq!(submission_reply(&Ok(JobId(7))), broadcast_started_text(JobId(7)));
        assert_eq!(
            submission_reply(&Err(Error::Validation("empty payload".into()))),
            BROADCAST_USAGE
        );
        let failed = submission_reply(&Err(Error::Storage("disk full".into())));
        assert!(failed.starts_with("Broadcast failed"), "{failed}");
        assert!(failed.contains("disk full"), "{failed}");
    }
}
