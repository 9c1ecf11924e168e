use std::collections::HashMap;
use std::sync::RwLock;

use crate::db::store::{BatchCommit, RecordStore};
use crate::error::{AppError, Result};
use crate::models::{Post, User};

/// In-memory record store backend.
///
/// Mirrors the Postgres backend's semantics (atomic batches, insert-or-
/// ignore, deterministic ordering) over plain maps. Used by the integration
/// tests so they run hermetically; batch atomicity falls out of holding the
/// write lock for the whole insert.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    posts: HashMap<String, Post>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.read().users.len()
    }

    pub fn post_count(&self) -> usize {
        self.read().posts.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn qualifies(post: &Post, languages: &[String]) -> bool {
        let lang_ok = post
            .language_code
            .as_ref()
            .map(|lang| languages.iter().any(|l| l == lang))
            .unwrap_or(false);
        lang_ok && !post.text.is_empty()
    }

    fn sorted(mut posts: Vec<Post>) -> Vec<Post> {
        posts.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.post_id.cmp(&b.post_id))
        });
        posts
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn bulk_insert(&self, users: Vec<User>, posts: Vec<Post>) -> Result<BatchCommit> {
        let mut tables = self.write();
        let mut commit = BatchCommit::default();

        for user in users {
            if !tables.users.contains_key(&user.user_id) {
                tables.users.insert(user.user_id.clone(), user);
                commit.users_inserted += 1;
            }
        }
        for post in posts {
            if !tables.posts.contains_key(&post.post_id) {
                tables.posts.insert(post.post_id.clone(), post);
                commit.posts_inserted += 1;
            }
        }

        Ok(commit)
    }

    async fn qualifying_posts_by_author(
        &self,
        author_id: &str,
        languages: &[String],
    ) -> Result<Vec<Post>> {
        let posts = self
            .read()
            .posts
            .values()
            .filter(|p| p.author_id == author_id && Self::qualifies(p, languages))
            .cloned()
            .collect();
        Ok(Self::sorted(posts))
    }

    async fn qualifying_posts_referencing(
        &self,
        user_id: &str,
        languages: &[String],
    ) -> Result<Vec<Post>> {
        let posts = self
            .read()
            .posts
            .values()
            .filter(|p| {
                let references = p.reply_target_user_id.as_deref() == Some(user_id)
                    || p.repost_author_id() == Some(user_id);
                references && Self::qualifies(p, languages)
            })
            .cloned()
            .collect();
        Ok(Self::sorted(posts))
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.read().users.get(user_id).cloned())
    }

    async fn latest_post_by_author(&self, author_id: &str) -> Result<Option<Post>> {
        Ok(self
            .read()
            .posts
            .values()
            .filter(|p| p.author_id == author_id)
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.post_id.cmp(&b.post_id))
            })
            .cloned())
    }

    async fn ping(&self) -> Result<()> {
        // A poisoned lock is the only way this backend can be unhealthy.
        self.inner
            .read()
            .map(|_| ())
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn post(id: &str, author: &str, lang: &str, text: &str, ts: i64) -> Post {
        Post {
            post_id: id.to_string(),
            author_id: author.to_string(),
            text: text.to_string(),
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
            reply_target_user_id: None,
            repost_source: None,
            language_code: Some(lang.to_string()),
            hashtags: Vec::new(),
        }
    }

    fn langs() -> Vec<String> {
        vec!["en".to_string(), "fr".to_string()]
    }

    #[tokio::test]
    async fn insert_or_ignore_on_duplicate_identity() {
        let store = MemoryStore::new();
        let first = post("p1", "u1", "en", "first", 1);
        let second = post("p1", "u1", "en", "second", 2);

        let commit = store.bulk_insert(Vec::new(), vec![first, second]).await.unwrap();
        assert_eq!(commit.posts_inserted, 1);
        assert_eq!(store.post_count(), 1);

        let kept = store.latest_post_by_author("u1").await.unwrap().unwrap();
        assert_eq!(kept.text, "first");
    }

    #[tokio::test]
    async fn qualifying_filters_language_and_empty_text() {
        let store = MemoryStore::new();
        store
            .bulk_insert(
                Vec::new(),
                vec![
                    post("p1", "u1", "en", "keep", 1),
                    post("p2", "u1", "xx", "wrong language", 2),
                    post("p3", "u1", "en", "", 3),
                ],
            )
            .await
            .unwrap();

        let pool = store.qualifying_posts_by_author("u1", &langs()).await.unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].post_id, "p1");
    }

    #[tokio::test]
    async fn referencing_matches_reply_target_and_repost_author() {
        let store = MemoryStore::new();
        let mut reply = post("p1", "u2", "en", "a reply", 1);
        reply.reply_target_user_id = Some("u1".to_string());
        let mut repost = post("p2", "u3", "en", "a repost", 2);
        repost.repost_source = Some(json!({"user": {"id_str": "u1"}}));
        let unrelated = post("p3", "u4", "en", "unrelated", 3);

        store
            .bulk_insert(Vec::new(), vec![reply, repost, unrelated])
            .await
            .unwrap();

        let pool = store.qualifying_posts_referencing("u1", &langs()).await.unwrap();
        let ids: Vec<_> = pool.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }
}
