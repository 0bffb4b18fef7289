//! Storage ports.
//!
//! The SQLite adapter implements all of them on one connection; the broadcast
//! engine only sees `RecipientStore` + `JobLedger`.

use async_trait::async_trait;

use crate::{
    domain::{JobId, UserId},
    model::{AdminRecord, BotStats, BroadcastJob, ChatRecord, UserProfile},
    Result,
};

/// Known broadcast recipients.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Point-in-time enumeration of every known recipient id.
    async fn list_all(&self) -> Result<Vec<UserId>>;
}

/// Durable log of broadcast jobs.
#[async_trait]
pub trait JobLedger: Send + Sync {
    /// Persist a new job as `pending` with a delivered count of 0.
    async fn create(&self, initiator: UserId, payload: &str, created_at: i64) -> Result<JobId>;

    /// Record the final delivered count and mark the job `completed`.
    async fn finalize(&self, job: JobId, delivered: u64) -> Result<()>;

    async fn get(&self, job: JobId) -> Result<Option<BroadcastJob>>;

    /// Newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<BroadcastJob>>;
}

/// Users and chats seen by the interactive handlers.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn upsert_user(&self, user: UserProfile) -> Result<()>;
    async fn upsert_chat(&self, chat: ChatRecord) -> Result<()>;

    /// Most recently seen first.
    async fn recent_users(&self, limit: usize) -> Result<Vec<UserProfile>>;
    async fn all_users(&self) -> Result<Vec<UserProfile>>;

    async fn stats(&self) -> Result<BotStats>;
}

#[async_trait]
pub trait AdminRegistry: Send + Sync {
    async fn add_admin(&self, user: UserId, added_by: UserId, added_at: i64) -> Result<()>;
    async fn remove_admin(&self, user: UserId) -> Result<()>;
    async fn list_admins(&self) -> Result<Vec<AdminRecord>>;
    async fn is_admin(&self, user: UserId) -> Result<bool>;
}
