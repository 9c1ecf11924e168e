use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::RecommendationCache;
use crate::config::AttributionMode;
use crate::db::RecordStore;
use crate::error::Result;
use crate::models::{Post, RecommendationEntry};
use crate::services::scoring::{self, RecommendationQuery};

/// Orchestrates one recommendation request: candidate pool fetch, scoring,
/// ranking, and display resolution, fronted by the injected result cache.
pub struct RecommendationService {
    store: Arc<dyn RecordStore>,
    cache: Arc<RecommendationCache>,
    attribution: AttributionMode,
    languages: Vec<String>,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: Arc<RecommendationCache>,
        attribution: AttributionMode,
    ) -> Self {
        Self {
            store,
            cache,
            attribution,
            languages: scoring::supported_languages(),
        }
    }

    /// Deterministic cache key for one query tuple. The phrase is used
    /// verbatim; the hashtag was lowercased by the façade before it got
    /// here.
    pub fn cache_key(query: &RecommendationQuery) -> String {
        format!(
            "recommendation:{}:{}:{}:{}",
            query.seed_user_id,
            query.query_type.as_wire(),
            query.phrase,
            query.hashtag
        )
    }

    pub async fn recommend(&self, query: &RecommendationQuery) -> Result<Vec<RecommendationEntry>> {
        self.cache
            .get_or_compute(Self::cache_key(query), || self.compute(query))
            .await
    }

    async fn compute(&self, query: &RecommendationQuery) -> Result<Vec<RecommendationEntry>> {
        let pool = match self.attribution {
            AttributionMode::Seed => {
                self.store
                    .qualifying_posts_by_author(&query.seed_user_id, &self.languages)
                    .await?
            }
            AttributionMode::Counterparty => {
                self.store
                    .qualifying_posts_referencing(&query.seed_user_id, &self.languages)
                    .await?
            }
        };
        let pool = dedup_by_post_id(pool);

        let ranked = scoring::score_candidates(&pool, query);

        let mut entries = Vec::with_capacity(ranked.len());
        for candidate in ranked {
            let Some(user) = self.store.find_user(&candidate.user_id).await? else {
                debug!(user_id = %candidate.user_id, "Dropping candidate without a user row");
                continue;
            };
            let Some(latest) = self.store.latest_post_by_author(&candidate.user_id).await? else {
                debug!(user_id = %candidate.user_id, "Dropping candidate with no posts");
                continue;
            };
            entries.push(RecommendationEntry {
                user_id: user.user_id,
                screen_name: user.display_name,
                description: user.description,
                contact_post_text: latest.text,
            });
        }

        info!(
            seed = %query.seed_user_id,
            pool = pool.len(),
            recommended = entries.len(),
            "Recommendation computed"
        );
        Ok(entries)
    }
}

/// Read-time guard against double-stored identities; keeps the first
/// occurrence so ordering stays deterministic.
fn dedup_by_post_id(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::with_capacity(posts.len());
    posts
        .into_iter()
        .filter(|post| seen.insert(post.post_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(id: &str) -> Post {
        Post {
            post_id: id.to_string(),
            author_id: "u1".to_string(),
            text: "text".to_string(),
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
            reply_target_user_id: None,
            repost_source: None,
            language_code: Some("en".to_string()),
            hashtags: Vec::new(),
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut duplicate = post("p1");
        duplicate.text = "later copy".to_string();
        let deduped = dedup_by_post_id(vec![post("p1"), duplicate, post("p2")]);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].post_id, "p1");
        assert_eq!(deduped[0].text, "text");
        assert_eq!(deduped[1].post_id, "p2");
    }
}
