use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::error::ScoreError;
use crate::models::{
    BatchMatchRequest, BatchNeighborhoodRequest, BatchResponse, ErrorResponse, HealthResponse,
    MatchScoreRequest, NeighborhoodScoreRequest, SweepResponse,
};
use crate::services::ScoringService;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub scoring: Arc<ScoringService>,
}

/// Configure all score-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/neighborhood/score", web::post().to(score_neighborhood))
        .route("/neighborhood/batch", web::post().to(score_neighborhood_batch))
        .route("/match/score", web::post().to(score_match))
        .route("/match/batch", web::post().to(score_match_batch))
        .route("/cache/stats", web::get().to(cache_stats))
        .route("/cache/sweep", web::post().to(sweep_cache));
}

fn error_response(err: &ScoreError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(ErrorResponse::from(err))
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        indexed_properties: state.scoring.indexed_properties(),
        timestamp: chrono::Utc::now(),
    })
}

/// Neighborhood score endpoint
///
/// POST /api/v1/neighborhood/score
///
/// Request body:
/// ```json
/// { "latitude": 38.9072, "longitude": -77.0369, "radiusMiles": 5 }
/// ```
async fn score_neighborhood(
    state: web::Data<AppState>,
    req: web::Json<NeighborhoodScoreRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for neighborhood request: {}", errors);
        return error_response(&ScoreError::from(errors));
    }

    match state
        .scoring
        .score_neighborhood(req.latitude, req.longitude, req.radius_miles)
        .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => {
            tracing::error!("Neighborhood score failed at ({}, {}): {}", req.latitude, req.longitude, e);
            error_response(&e)
        }
    }
}

/// Batch neighborhood score endpoint
///
/// POST /api/v1/neighborhood/batch
///
/// Each location succeeds or fails on its own; the batch is rejected whole
/// only when it exceeds the size limit.
async fn score_neighborhood_batch(
    state: web::Data<AppState>,
    req: web::Json<BatchNeighborhoodRequest>,
) -> impl Responder {
    match state.scoring.score_neighborhood_batch(&req.locations).await {
        Ok(items) => HttpResponse::Ok().json(BatchResponse::new(items)),
        Err(e) => error_response(&e),
    }
}

/// Match score endpoint
///
/// POST /api/v1/match/score
///
/// Request body:
/// ```json
/// { "propertyId": "string", "opportunityId": "string" }
/// ```
async fn score_match(
    state: web::Data<AppState>,
    req: web::Json<MatchScoreRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(&ScoreError::from(errors));
    }

    match state.scoring.score_match(&req.property_id, &req.opportunity_id).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => {
            tracing::info!(
                "Match score failed for {} / {}: {}",
                req.property_id,
                req.opportunity_id,
                e
            );
            error_response(&e)
        }
    }
}

/// Batch match score endpoint
///
/// POST /api/v1/match/batch
async fn score_match_batch(
    state: web::Data<AppState>,
    req: web::Json<BatchMatchRequest>,
) -> impl Responder {
    match state.scoring.score_match_batch(&req.pairs).await {
        Ok(items) => HttpResponse::Ok().json(BatchResponse::new(items)),
        Err(e) => error_response(&e),
    }
}

/// Cache counters since startup
async fn cache_stats(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.scoring.cache_stats())
}

/// Delete expired cache entries
async fn sweep_cache(state: web::Data<AppState>) -> impl Responder {
    match state.scoring.sweep_cache().await {
        Ok(removed) => HttpResponse::Ok().json(SweepResponse { removed }),
        Err(e) => {
            tracing::error!("Cache sweep failed: {}", e);
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Matcher, NeighborhoodScoreEngine, SharedSpatialIndex, SpatialIndex};
    use crate::models::{GovernmentPropertyRecord, Ownership};
    use crate::services::{InMemoryRecordStore, ScoreCache};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn app_state() -> AppState {
        let records = (0..5)
            .map(|i| GovernmentPropertyRecord {
                id: format!("gov-{}", i),
                latitude: 38.9072 + i as f64 * 0.01,
                longitude: -77.0369,
                ownership: Ownership::Leased,
                rsf: 30_000.0,
                lease_expiration: None,
                agency: Some("SSA".to_string()),
            })
            .collect();

        let scoring = ScoringService::new(
            Arc::new(SharedSpatialIndex::new(SpatialIndex::build(records))),
            NeighborhoodScoreEngine::with_defaults(),
            Matcher::with_defaults(),
            ScoreCache::in_memory(100),
            Arc::new(InMemoryRecordStore::new()),
        );

        AppState {
            scoring: Arc::new(scoring),
        }
    }

    #[actix_web::test]
    async fn test_health_reports_index_size() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["indexed_properties"], 5);
    }

    #[actix_web::test]
    async fn test_neighborhood_score_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/neighborhood/score")
            .set_json(json!({ "lat": 38.9072, "lng": -77.0369, "radiusMiles": 5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["metrics"]["totalProperties"], 5);
        assert_eq!(body["factors"].as_array().map(|f| f.len()), Some(6));
    }

    #[actix_web::test]
    async fn test_invalid_latitude_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/neighborhood/score")
            .set_json(json!({ "latitude": 120.0, "longitude": -77.0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_match_pair_is_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/match/score")
            .set_json(json!({ "propertyId": "p-404", "opportunityId": "o-404" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "not_found");
    }

    #[actix_web::test]
    async fn test_neighborhood_batch_mixed_results() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/neighborhood/batch")
            .set_json(json!({
                "locations": [
                    { "latitude": 38.9072, "longitude": -77.0369 },
                    { "latitude": 38.9072, "longitude": 200.0 },
                    { "latitude": 39.2904, "longitude": -76.6122, "radiusMiles": 3 }
                ]
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["succeeded"], 2);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["results"][1]["error"]["kind"], "validation");
    }

    #[actix_web::test]
    async fn test_neighborhood_batch_item_missing_longitude() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/neighborhood/batch")
            .set_json(json!({
                "locations": [
                    { "latitude": 38.9072, "longitude": -77.0369 },
                    { "latitude": 38.9072 },
                    { "lat": 38.9172, "lng": -77.0369, "radius": 2 }
                ]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["succeeded"], 2);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["results"][1]["index"], 1);
        assert_eq!(body["results"][1]["error"]["kind"], "validation");
        assert_eq!(body["results"][2]["success"], true);
    }

    #[actix_web::test]
    async fn test_match_batch_wrongly_typed_item_fails_alone() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/match/batch")
            .set_json(json!({
                "pairs": [
                    { "propertyId": "missing", "opportunityId": "opp-1" },
                    { "propertyId": 42, "opportunityId": "opp-1" }
                ]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["succeeded"], 0);
        assert_eq!(body["failed"], 2);
        assert_eq!(body["results"][0]["error"]["kind"], "not_found");
        assert_eq!(body["results"][1]["error"]["kind"], "validation");
    }
}
