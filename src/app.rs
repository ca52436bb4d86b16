use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::shared::AppState;
use crate::{audit, auth, matches, month_lock, player, rating, rules, stats, tournament};

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Assembles every route; everything except `/health` and `/signup` requires a bearer token.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let protected = Router::new()
        // Players
        .route("/players", get(player::list_players).post(player::add_player))
        .route("/ranking", get(player::ranking))
        .route("/ranking/changes", get(stats::rank_changes))
        .route(
            "/players/:id",
            get(player::get_player)
                .patch(player::update_player)
                .delete(player::delete_player),
        )
        .route("/players/:id/stats", get(stats::player_stats))
        .route("/players/:id/approve", post(player::approve_signup))
        .route("/players/:id/reject", post(player::reject_signup))
        .route("/players/:id/deactivate", post(player::deactivate_player))
        .route("/players/:id/role", put(player::set_role))
        // Matches
        .route("/matches", get(matches::list_matches).post(matches::create_match))
        .route("/matches/summary/:date", get(matches::day_summary))
        .route(
            "/matches/:id",
            get(matches::get_match)
                .patch(matches::edit_match)
                .delete(matches::delete_match),
        )
        .route("/matches/:id/submit-score", post(matches::submit_score))
        .route("/matches/:id/approve", post(matches::approve_match))
        .route("/matches/:id/reject", post(matches::reject_match))
        .route("/matches/:id/force-confirm", post(matches::force_confirm))
        .route("/matches/:id/cancel", post(matches::cancel_match))
        // Settings
        .route(
            "/settings/rules",
            get(rules::get_rules).put(rules::update_rules),
        )
        .route("/settings/months", get(month_lock::list_locked_months))
        .route("/settings/months/:month/lock", post(month_lock::lock_month))
        .route("/settings/months/:month/unlock", post(month_lock::unlock_month))
        .route("/settings/recalculate/rating", post(rating::recalculate_rating))
        .route("/settings/recalculate/xp", post(rating::recalculate_xp))
        .route("/settings/recalculate/all", post(rating::recalculate_all))
        .route("/tournaments/generate", post(tournament::generate_tournament))
        .route("/audit", get(audit::list_audit_log))
        .layer(middleware::from_fn_with_state(state.clone(), auth::jwt_auth));

    Router::new()
        .route("/health", get(health))
        .route("/signup", post(player::signup))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}
