use crate::error::Result;
use crate::models::{Post, User};

/// Rows actually inserted by one `bulk_insert` transaction. Staged rows
/// whose identity already existed are ignored, not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCommit {
    pub users_inserted: u64,
    pub posts_inserted: u64,
}

/// Contract between the core and the record store.
///
/// Implementations must make `bulk_insert` atomic (all-or-nothing per call)
/// and insert-or-ignore on primary identity: a user or post whose id already
/// exists is silently skipped, never updated and never an error.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert users then posts within one atomic batch.
    async fn bulk_insert(&self, users: Vec<User>, posts: Vec<Post>) -> Result<BatchCommit>;

    /// Posts authored by `author_id` that qualify for scoring: language in
    /// `languages` and non-empty text. Ordered by (`created_at`, `post_id`)
    /// ascending so downstream encounter order is deterministic.
    async fn qualifying_posts_by_author(
        &self,
        author_id: &str,
        languages: &[String],
    ) -> Result<Vec<Post>>;

    /// Qualifying posts that reference `user_id`: replies targeting it or
    /// reposts whose source author is it. Same filters and ordering as
    /// `qualifying_posts_by_author`. Used by counterparty attribution.
    async fn qualifying_posts_referencing(
        &self,
        user_id: &str,
        languages: &[String],
    ) -> Result<Vec<Post>>;

    /// Look up one user row.
    async fn find_user(&self, user_id: &str) -> Result<Option<User>>;

    /// The author's most recent post by `created_at`, regardless of
    /// language or text content.
    async fn latest_post_by_author(&self, author_id: &str) -> Result<Option<Post>>;

    /// Connectivity probe for health reporting.
    async fn ping(&self) -> Result<()>;
}
