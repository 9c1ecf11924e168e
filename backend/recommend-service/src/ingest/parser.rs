use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{Hashtag, Post, User};

/// Source timestamp layout, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Per-line parse failures. These are recoverable: the pipeline skips the
/// offending line and continues.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid created_at timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("missing created_at timestamp")]
    MissingTimestamp,
}

/// A successfully extracted line: the post plus its (pending) author.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub post: Post,
    pub author: User,
}

/// Outcome of parsing one well-formed line.
#[derive(Debug)]
pub enum LineOutcome {
    Record(ParsedRecord),
    /// No post identity or no author identity: no valid Post/User pair can
    /// be formed, the line is skipped silently.
    MissingIdentity,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id_str: Option<String>,
    user: Option<RawUser>,
    text: Option<String>,
    created_at: Option<String>,
    /// The upstream feed emits this as either a JSON string or a number.
    in_reply_to_user_id: Option<serde_json::Value>,
    retweeted_status: Option<serde_json::Value>,
    lang: Option<String>,
    entities: Option<RawEntities>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id_str: Option<String>,
    screen_name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntities {
    #[serde(default)]
    hashtags: Vec<Hashtag>,
}

fn id_from_value(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse one raw input line into a pending post/author pair.
pub fn parse_line(line: &str) -> Result<LineOutcome, ParseError> {
    let raw: RawRecord = serde_json::from_str(line)?;

    let Some(post_id) = raw.id_str else {
        return Ok(LineOutcome::MissingIdentity);
    };
    let Some(user) = raw.user else {
        return Ok(LineOutcome::MissingIdentity);
    };
    let Some(author_id) = user.id_str else {
        return Ok(LineOutcome::MissingIdentity);
    };

    let created_at = raw.created_at.ok_or(ParseError::MissingTimestamp)?;
    let created_at: DateTime<Utc> = DateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)?
        .with_timezone(&Utc);

    let post = Post {
        post_id,
        author_id: author_id.clone(),
        text: raw.text.unwrap_or_default(),
        created_at,
        reply_target_user_id: raw.in_reply_to_user_id.and_then(id_from_value),
        repost_source: raw.retweeted_status,
        language_code: raw.lang,
        hashtags: raw.entities.map(|e| e.hashtags).unwrap_or_default(),
    };
    let author = User {
        user_id: author_id,
        display_name: user.screen_name.unwrap_or_default(),
        description: Some(user.description.unwrap_or_default()),
        latest_contact_post_id: None,
    };

    Ok(LineOutcome::Record(ParsedRecord { post, author }))
}
