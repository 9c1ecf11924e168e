use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::IdentityConfig;
use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::RecommendationResponse;
use crate::services::scoring::{QueryType, RecommendationQuery};
use crate::services::RecommendationService;

/// Shared state for the recommendation handlers.
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
    pub store: Arc<dyn RecordStore>,
    pub identity: IdentityConfig,
}

/// All four parameters are required; requests missing any are rejected
/// before the scoring engine is invoked.
#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub query_type: Option<String>,
    pub phrase: Option<String>,
    pub hashtag: Option<String>,
}

pub async fn get_recommendations(
    params: web::Query<RecommendationParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let params = params.into_inner();
    let (user_id, query_type, phrase, hashtag) = match (
        params.user_id,
        params.query_type,
        params.phrase,
        params.hashtag,
    ) {
        (Some(user_id), Some(query_type), Some(phrase), Some(hashtag)) => {
            (user_id, query_type, phrase, hashtag)
        }
        _ => {
            return Err(AppError::BadRequest("Missing query parameters".to_string()));
        }
    };

    let query_type = QueryType::from_wire(&query_type).ok_or_else(|| {
        AppError::BadRequest("Invalid type parameter. Must be 'reply', 'retweet' or 'both'".to_string())
    })?;

    // Only the hashtag is normalized; the phrase is matched verbatim.
    let query = RecommendationQuery {
        seed_user_id: user_id,
        query_type,
        phrase,
        hashtag: hashtag.to_lowercase(),
    };

    debug!(
        seed = %query.seed_user_id,
        query_type = query.query_type.as_wire(),
        "Recommendation request"
    );

    let recommendations = state
        .recommendations
        .recommend(&query)
        .await
        .map_err(|e| {
            // One unified error surface: log the cause, answer generically.
            error!(seed = %query.seed_user_id, %e, "Recommendation computation failed");
            AppError::Internal("Internal server error".to_string())
        })?;

    Ok(HttpResponse::Ok().json(RecommendationResponse {
        team_id: state.identity.team_id.clone(),
        account_id: state.identity.account_id.clone(),
        recommendations,
    }))
}
