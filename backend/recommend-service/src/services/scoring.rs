// ============================================
// Recommendation scoring
// ============================================
//
// Three independent signal channels over a candidate post pool:
// - interaction: ln(1 + 2*replies + reposts), grouped by post author
// - hashtag affinity: flat 1.0 up to 10 matching tags, then logarithmic
// - keyword: non-overlapping phrase occurrences plus a hashtag bonus,
//   restricted by query type
//
// Every channel attributes to the author of the observed post. With the
// default pool (the seed user's own posts) all three therefore collapse
// onto the seed, reproducing the historical ranking byte-for-byte; the
// counterparty pool (posts referencing the seed) turns the same math into
// a per-candidate ranking. See `config::AttributionMode`.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::models::Post;

/// Languages eligible for scoring pools.
pub const SUPPORTED_LANGUAGES: [&str; 8] = ["ar", "en", "fr", "in", "pt", "es", "tr", "ja"];

pub fn supported_languages() -> Vec<String> {
    SUPPORTED_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

/// Which posts the keyword channel considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Reply,
    Repost,
    Both,
}

impl QueryType {
    /// Wire names kept from the historical API (`retweet` means repost).
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "reply" => Some(QueryType::Reply),
            "retweet" => Some(QueryType::Repost),
            "both" => Some(QueryType::Both),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            QueryType::Reply => "reply",
            QueryType::Repost => "retweet",
            QueryType::Both => "both",
        }
    }

    fn includes_replies(self) -> bool {
        matches!(self, QueryType::Reply | QueryType::Both)
    }

    fn includes_reposts(self) -> bool {
        matches!(self, QueryType::Repost | QueryType::Both)
    }
}

/// One scoring request. `hashtag` must already be lowercased by the caller;
/// `phrase` is matched verbatim with no normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationQuery {
    pub seed_user_id: String,
    pub query_type: QueryType,
    pub phrase: String,
    pub hashtag: String,
}

/// A candidate with its component and combined scores. Internal to the
/// engine; scores never reach the wire.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub user_id: String,
    pub interaction_score: f64,
    pub hashtag_score: f64,
    pub keyword_score: f64,
    pub final_score: f64,
}

pub fn interaction_score(reply_count: u64, repost_count: u64) -> f64 {
    (1.0 + 2.0 * reply_count as f64 + repost_count as f64).ln()
}

pub fn hashtag_score(same_tag_count: u64) -> f64 {
    if same_tag_count > 10 {
        1.0 + (1.0 + (same_tag_count - 10) as f64).ln()
    } else {
        1.0
    }
}

pub fn keyword_score(matches: u64) -> f64 {
    if matches == 0 {
        0.0
    } else {
        1.0 + (1.0 + matches as f64).ln()
    }
}

/// Non-overlapping occurrences of `phrase` in `text`.
pub fn phrase_occurrences(text: &str, phrase: &str) -> u64 {
    text.matches(phrase).count() as u64
}

/// Per-channel count accumulator that remembers first-attribution order,
/// so the final ranking has a deterministic tie-break.
#[derive(Default)]
struct Channel {
    counts: HashMap<String, u64>,
    order: Vec<String>,
}

impl Channel {
    fn add(&mut self, user_id: &str, n: u64) {
        match self.counts.get_mut(user_id) {
            Some(count) => *count += n,
            None => {
                self.counts.insert(user_id.to_string(), n);
                self.order.push(user_id.to_string());
            }
        }
    }
}

/// Interaction counts per author. Unlike the other channels, every author
/// seen in the pool gets an entry even with zero replies and reposts; a
/// zero entry scores ln(1) = 0 and is dropped at combination time.
#[derive(Default)]
struct InteractionChannel {
    counts: HashMap<String, (u64, u64)>,
    order: Vec<String>,
}

impl InteractionChannel {
    fn observe(&mut self, user_id: &str, is_reply: bool, is_repost: bool) {
        if !self.counts.contains_key(user_id) {
            self.counts.insert(user_id.to_string(), (0, 0));
            self.order.push(user_id.to_string());
        }
        if let Some((replies, reposts)) = self.counts.get_mut(user_id) {
            if is_reply {
                *replies += 1;
            }
            if is_repost {
                *reposts += 1;
            }
        }
    }
}

/// Score and rank every candidate appearing in any channel over `pool`.
///
/// Missing channel values default to the additive identity for interaction
/// and keyword (0) and the multiplicative identity for hashtag affinity
/// (1); candidates are retained only with a strictly positive product.
/// Sorting is stable on descending score: ties keep encounter order
/// (interaction channel first, then hashtag, then keyword, each in
/// first-attribution order over the pool).
pub fn score_candidates(pool: &[Post], query: &RecommendationQuery) -> Vec<ScoredCandidate> {
    let mut interactions = InteractionChannel::default();
    for post in pool {
        interactions.observe(&post.author_id, post.is_reply(), post.is_repost());
    }

    let mut hashtag_counts = Channel::default();
    for post in pool {
        for tag in &post.hashtags {
            if tag.text.to_lowercase() == query.hashtag {
                hashtag_counts.add(&post.author_id, 1);
            }
        }
    }

    // A post that is both a reply and a repost is visited by both passes
    // of a Both query and double-counts. Intentional; pinned by tests.
    let mut keyword_counts = Channel::default();
    if query.query_type.includes_replies() {
        for post in pool.iter().filter(|p| p.is_reply()) {
            accumulate_keyword(&mut keyword_counts, post, query);
        }
    }
    if query.query_type.includes_reposts() {
        for post in pool.iter().filter(|p| p.is_repost()) {
            accumulate_keyword(&mut keyword_counts, post, query);
        }
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for user_id in interactions
        .order
        .iter()
        .chain(hashtag_counts.order.iter())
        .chain(keyword_counts.order.iter())
    {
        if seen.insert(user_id.clone()) {
            candidates.push(user_id.clone());
        }
    }

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter_map(|user_id| {
            let interaction = interactions
                .counts
                .get(&user_id)
                .map(|&(replies, reposts)| interaction_score(replies, reposts))
                .unwrap_or(0.0);
            let hashtag = hashtag_counts
                .counts
                .get(&user_id)
                .map(|&count| hashtag_score(count))
                .unwrap_or(1.0);
            let keyword = keyword_counts
                .counts
                .get(&user_id)
                .map(|&count| keyword_score(count))
                .unwrap_or(0.0);

            let final_score = interaction * hashtag * keyword;
            if final_score > 0.0 {
                Some(ScoredCandidate {
                    user_id,
                    interaction_score: interaction,
                    hashtag_score: hashtag,
                    keyword_score: keyword,
                    final_score,
                })
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!(
        pool = pool.len(),
        candidates = scored.len(),
        query_type = query.query_type.as_wire(),
        "Scored candidate pool"
    );
    scored
}

fn accumulate_keyword(channel: &mut Channel, post: &Post, query: &RecommendationQuery) {
    let occurrences = phrase_occurrences(&post.text, &query.phrase);
    if occurrences > 0 {
        channel.add(&post.author_id, occurrences);
    }
    if post
        .hashtags
        .iter()
        .any(|tag| tag.text.to_lowercase() == query.hashtag)
    {
        channel.add(&post.author_id, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Hashtag;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const EPSILON: f64 = 1e-9;

    fn post(id: &str, author: &str, text: &str, tags: &[&str]) -> Post {
        Post {
            post_id: id.to_string(),
            author_id: author.to_string(),
            text: text.to_string(),
            created_at: Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap(),
            reply_target_user_id: None,
            repost_source: None,
            language_code: Some("en".to_string()),
            hashtags: tags
                .iter()
                .map(|t| Hashtag { text: t.to_string() })
                .collect(),
        }
    }

    fn reply(id: &str, author: &str, text: &str, tags: &[&str]) -> Post {
        let mut p = post(id, author, text, tags);
        p.reply_target_user_id = Some("target".to_string());
        p
    }

    fn repost(id: &str, author: &str, text: &str, tags: &[&str]) -> Post {
        let mut p = post(id, author, text, tags);
        p.repost_source = Some(json!({"user": {"id_str": "source"}}));
        p
    }

    fn query(query_type: QueryType, phrase: &str, hashtag: &str) -> RecommendationQuery {
        RecommendationQuery {
            seed_user_id: "1".to_string(),
            query_type,
            phrase: phrase.to_string(),
            hashtag: hashtag.to_string(),
        }
    }

    #[test]
    fn interaction_formula() {
        assert!((interaction_score(0, 0) - 0.0).abs() < EPSILON);
        assert!((interaction_score(1, 0) - 3.0_f64.ln()).abs() < EPSILON);
        assert!((interaction_score(1, 1) - 4.0_f64.ln()).abs() < EPSILON);
    }

    #[test]
    fn hashtag_score_flat_through_ten_then_increasing() {
        for count in 0..=10 {
            assert!((hashtag_score(count) - 1.0).abs() < EPSILON, "count={}", count);
        }
        let mut previous = hashtag_score(10);
        for count in 11..=30 {
            let current = hashtag_score(count);
            assert!(current > previous, "count={}", count);
            previous = current;
        }
    }

    #[test]
    fn keyword_score_zero_is_zero() {
        assert!((keyword_score(0) - 0.0).abs() < EPSILON);
        assert!((keyword_score(1) - (1.0 + 2.0_f64.ln())).abs() < EPSILON);
    }

    #[test]
    fn phrase_occurrences_are_non_overlapping() {
        assert_eq!(phrase_occurrences("Hello there, Hello again", "Hello"), 2);
        assert_eq!(phrase_occurrences("aaaa", "aa"), 2);
        assert_eq!(phrase_occurrences("no match", "Hello"), 0);
    }

    #[test]
    fn seed_pool_collapses_onto_single_candidate() {
        // The seed's own reply with a matching tag and phrase: all three
        // channels key the seed, so the seed is the only candidate.
        let pool = vec![reply("p1", "1", "Hello world", &["test"])];
        let ranked = score_candidates(&pool, &query(QueryType::Both, "Hello", "test"));

        assert_eq!(ranked.len(), 1);
        let top = &ranked[0];
        assert_eq!(top.user_id, "1");
        assert!((top.interaction_score - 3.0_f64.ln()).abs() < EPSILON);
        assert!((top.hashtag_score - 1.0).abs() < EPSILON);
        // One phrase occurrence plus the hashtag bonus.
        assert!((top.keyword_score - (1.0 + 3.0_f64.ln())).abs() < EPSILON);
        assert!(
            (top.final_score - 3.0_f64.ln() * (1.0 + 3.0_f64.ln())).abs() < EPSILON
        );
    }

    #[test]
    fn zero_keyword_matches_excludes_candidate() {
        let pool = vec![reply("p1", "1", "nothing relevant", &[])];
        let ranked = score_candidates(&pool, &query(QueryType::Both, "Hello", "test"));
        assert!(ranked.is_empty());
    }

    #[test]
    fn reply_type_ignores_reposts() {
        let pool = vec![repost("p1", "1", "Hello world", &[])];
        let ranked = score_candidates(&pool, &query(QueryType::Reply, "Hello", "test"));
        assert!(ranked.is_empty());

        let ranked = score_candidates(&pool, &query(QueryType::Repost, "Hello", "test"));
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn both_reply_and_repost_post_double_counts_keywords() {
        let mut both_kinds = reply("p1", "1", "Hello world", &[]);
        both_kinds.repost_source = Some(json!({"user": {"id_str": "source"}}));
        let pool = vec![both_kinds];

        let ranked = score_candidates(&pool, &query(QueryType::Both, "Hello", "test"));
        assert_eq!(ranked.len(), 1);
        // Visited once by the reply pass and once by the repost pass.
        assert!((ranked[0].keyword_score - (1.0 + 3.0_f64.ln())).abs() < EPSILON);
    }

    #[test]
    fn hashtag_match_is_case_insensitive() {
        let pool = vec![reply("p1", "1", "Hello", &["TeSt"])];
        let ranked = score_candidates(&pool, &query(QueryType::Both, "Hello", "test"));
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].keyword_score - (1.0 + 3.0_f64.ln())).abs() < EPSILON);
    }

    #[test]
    fn equal_scores_keep_encounter_order() {
        // Two authors with identical signals; the pool order decides.
        let pool = vec![
            reply("p1", "a", "Hello", &[]),
            reply("p2", "b", "Hello", &[]),
        ];
        let ranked = score_candidates(&pool, &query(QueryType::Both, "Hello", "test"));

        assert_eq!(ranked.len(), 2);
        assert!((ranked[0].final_score - ranked[1].final_score).abs() < EPSILON);
        assert_eq!(ranked[0].user_id, "a");
        assert_eq!(ranked[1].user_id, "b");
    }

    #[test]
    fn higher_score_ranks_first() {
        let pool = vec![
            reply("p1", "a", "Hello", &[]),
            reply("p2", "b", "Hello Hello Hello", &[]),
        ];
        let ranked = score_candidates(&pool, &query(QueryType::Both, "Hello", "test"));

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].user_id, "b");
        assert_eq!(ranked[1].user_id, "a");
    }
}
