use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::db::store::{BatchCommit, RecordStore};
use crate::error::Result;
use crate::models::{Hashtag, Post, User};

const POST_COLUMNS: &str = "post_id, author_id, text, created_at, \
     reply_target_user_id, repost_source, language_code, hashtags";

/// Postgres-backed record store.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn post_from_row(row: &PgRow) -> std::result::Result<Post, sqlx::Error> {
    let hashtags: Json<Vec<Hashtag>> = row.try_get("hashtags")?;
    Ok(Post {
        post_id: row.try_get("post_id")?,
        author_id: row.try_get("author_id")?,
        text: row.try_get("text")?,
        created_at: row.try_get("created_at")?,
        reply_target_user_id: row.try_get("reply_target_user_id")?,
        repost_source: row.try_get("repost_source")?,
        language_code: row.try_get("language_code")?,
        hashtags: hashtags.0,
    })
}

fn user_from_row(row: &PgRow) -> std::result::Result<User, sqlx::Error> {
    Ok(User {
        user_id: row.try_get("user_id")?,
        display_name: row.try_get("display_name")?,
        description: row.try_get("description")?,
        latest_contact_post_id: row.try_get("latest_contact_post_id")?,
    })
}

#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn bulk_insert(&self, users: Vec<User>, posts: Vec<Post>) -> Result<BatchCommit> {
        let mut tx = self.pool.begin().await?;
        let mut commit = BatchCommit::default();

        for user in &users {
            let result = sqlx::query(
                r#"
                INSERT INTO users (user_id, display_name, description, latest_contact_post_id)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id) DO NOTHING
                "#,
            )
            .bind(&user.user_id)
            .bind(&user.display_name)
            .bind(&user.description)
            .bind(&user.latest_contact_post_id)
            .execute(&mut *tx)
            .await?;
            commit.users_inserted += result.rows_affected();
        }

        for post in &posts {
            let result = sqlx::query(
                r#"
                INSERT INTO posts (post_id, author_id, text, created_at,
                                   reply_target_user_id, repost_source, language_code, hashtags)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (post_id) DO NOTHING
                "#,
            )
            .bind(&post.post_id)
            .bind(&post.author_id)
            .bind(&post.text)
            .bind(post.created_at)
            .bind(&post.reply_target_user_id)
            .bind(&post.repost_source)
            .bind(&post.language_code)
            .bind(Json(&post.hashtags))
            .execute(&mut *tx)
            .await?;
            commit.posts_inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(commit)
    }

    async fn qualifying_posts_by_author(
        &self,
        author_id: &str,
        languages: &[String],
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE author_id = $1
              AND language_code = ANY($2)
              AND text <> ''
            ORDER BY created_at ASC, post_id ASC
            "#
        ))
        .bind(author_id)
        .bind(languages.to_vec())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| post_from_row(row).map_err(Into::into))
            .collect()
    }

    async fn qualifying_posts_referencing(
        &self,
        user_id: &str,
        languages: &[String],
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE (reply_target_user_id = $1
                   OR repost_source -> 'user' ->> 'id_str' = $1)
              AND language_code = ANY($2)
              AND text <> ''
            ORDER BY created_at ASC, post_id ASC
            "#
        ))
        .bind(user_id)
        .bind(languages.to_vec())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| post_from_row(row).map_err(Into::into))
            .collect()
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, display_name, description, latest_contact_post_id
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose().map_err(Into::into)
    }

    async fn latest_post_by_author(&self, author_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE author_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(post_from_row).transpose().map_err(Into::into)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
