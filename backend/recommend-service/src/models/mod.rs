/// Data models for recommend-service
///
/// - `Post`: one authored content item, immutable after ingestion
/// - `User`: one account/author, created on first sighting during ingestion
/// - `RecommendationEntry` / `RecommendationResponse`: the wire-facing
///   serving contract (field names match the historical API verbatim)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hashtag attached to a post. The wire format carries additional
/// fields (indices, ranges); only `text` participates in scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashtag {
    pub text: String,
}

/// A single authored post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Set iff the post is a reply.
    pub reply_target_user_id: Option<String>,
    /// The source document of a repost, carrying at least the original
    /// author under `user.id_str`. Set iff the post is a repost. Stored
    /// verbatim as JSON.
    pub repost_source: Option<serde_json::Value>,
    pub language_code: Option<String>,
    /// Always present, possibly empty.
    pub hashtags: Vec<Hashtag>,
}

impl Post {
    pub fn is_reply(&self) -> bool {
        self.reply_target_user_id.is_some()
    }

    pub fn is_repost(&self) -> bool {
        self.repost_source.is_some()
    }

    /// Original author of a repost, when the source document names one.
    pub fn repost_author_id(&self) -> Option<&str> {
        self.repost_source
            .as_ref()
            .and_then(|source| source.get("user"))
            .and_then(|user| user.get("id_str"))
            .and_then(|id| id.as_str())
    }
}

/// An account/author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub display_name: String,
    pub description: Option<String>,
    /// Weak display-only reference; may be stale or absent. Never written
    /// by the ingestion or scoring paths.
    pub latest_contact_post_id: Option<String>,
}

/// One ranked recommendation as served to clients. Field names follow the
/// historical wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub user_id: String,
    pub screen_name: String,
    pub description: Option<String>,
    #[serde(rename = "contact_tweet_text")]
    pub contact_post_text: String,
}

/// Response envelope for the recommendation endpoint. `team_id` and
/// `account_id` are static identification fields passed through from
/// configuration, unrelated to the ranking itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub team_id: String,
    pub account_id: String,
    pub recommendations: Vec<RecommendationEntry>,
}
