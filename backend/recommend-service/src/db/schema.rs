use sqlx::PgPool;
use tracing::info;

use crate::error::Result;

/// Create the record store tables and indexes if they do not exist yet.
///
/// This is a create-if-absent bootstrap, not a migration layer: existing
/// tables are left untouched.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL DEFAULT '',
            description TEXT,
            latest_contact_post_id TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            post_id TEXT PRIMARY KEY,
            author_id TEXT NOT NULL,
            text TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL,
            reply_target_user_id TEXT,
            repost_source JSONB,
            language_code TEXT,
            hashtags JSONB NOT NULL DEFAULT '[]'::jsonb
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts (author_id)",
        "CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts (created_at)",
        "CREATE INDEX IF NOT EXISTS idx_posts_language ON posts (language_code)",
        "CREATE INDEX IF NOT EXISTS idx_posts_reply_target ON posts (reply_target_user_id)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Record store schema ensured");
    Ok(())
}
