//! Persistent records shared by the storage ports and the command layer.

use std::fmt;

use crate::domain::{ChatId, JobId, UserId};

/// A known user, refreshed on every interactive event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    /// Unix seconds.
    pub last_seen: i64,
}

impl UserProfile {
    /// "First Last", or an empty string when neither is set.
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().filter(|s| !s.is_empty()) {
            Some(last) => format!("{} {last}", self.first_name).trim().to_string(),
            None => self.first_name.trim().to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
        }
    }

    /// Moderation commands only make sense in these.
    pub fn is_group_like(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRecord {
    pub id: ChatId,
    /// Title for groups/channels, username for private chats, else empty.
    pub title: String,
    pub kind: ChatKind,
    pub last_seen: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminRecord {
    pub user_id: UserId,
    /// `UserId(0)` for the configured owner.
    pub added_by: UserId,
    pub added_at: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable record of one broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastJob {
    pub id: JobId,
    pub created_at: i64,
    pub initiator: UserId,
    pub payload: String,
    pub delivered: u64,
    pub status: JobStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BotStats {
    pub users: u64,
    pub chats: u64,
    pub broadcasts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(first: &str, last: Option<&str>) -> UserProfile {
        UserProfile {
            id: UserId(1),
            username: None,
            first_name: first.to_string(),
            last_name: last.map(str::to_string),
            language_code: None,
            last_seen: 0,
        }
    }

    #[test]
    fn full_name_joins_first_and_last() {
        assert_eq!(profile("Ada", Some("Lovelace")).full_name(), "Ada Lovelace");
        assert_eq!(profile("Ada", None).full_name(), "Ada");
        assert_eq!(profile("Ada", Some("")).full_name(), "Ada");
        assert_eq!(profile("", None).full_name(), "");
    }

    #[test]
    fn job_status_text_is_stable() {
        for s in [JobStatus::Pending, JobStatus::Running, JobStatus::Completed] {
            assert_eq!(JobStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(JobStatus::parse("cancelled"), None);
    }

    #[test]
    fn only_groups_are_moderatable() {
        assert!(ChatKind::Group.is_group_like());
        assert!(ChatKind::Supergroup.is_group_like());
        assert!(!ChatKind::Private.is_group_like());
        assert!(!ChatKind::Channel.is_group_like());
    }
}
