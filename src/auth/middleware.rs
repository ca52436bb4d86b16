use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::role::Role;
use super::types::{Claims, Principal};
use crate::player::repository::PlayerRepository;
use crate::shared::{AppError, AppState};

/// Builds the principal from the stored player row rather than the token,
/// so role changes and deactivation apply to tokens already issued.
async fn resolve_principal(state: &AppState, claims: Claims) -> Result<Principal, AppError> {
    let player = state
        .player_repository
        .get_player(&claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(player_id = %claims.sub, "Token subject is not a league member");
            AppError::Unauthorized("Unknown league member".to_string())
        })?;

    if matches!(player.role, Role::Pending | Role::Rejected) {
        warn!(player_id = %player.id, role = %player.role, "Membership not approved");
        return Err(AppError::Forbidden(
            "An approved league membership is required".to_string(),
        ));
    }
    if !player.is_active {
        warn!(player_id = %player.id, "Token subject is deactivated");
        return Err(AppError::Unauthorized("Member is deactivated".to_string()));
    }
    if player.role != claims.role {
        debug!(
            player_id = %player.id,
            token_role = %claims.role,
            stored_role = %player.role,
            "Token role is stale; using stored role"
        );
    }

    Ok(Principal::new(player.id, player.name, player.role))
}

/// JWT authentication middleware - validates the Authorization Bearer header and adds a
/// `Principal` to the request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), auth::jwt_auth))
/// Handlers can then extract `Extension(principal): Extension<Principal>`.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    let claims = match state.token_config.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("JWT authentication failed: {}", e);
            return Err(e);
        }
    };

    let principal = resolve_principal(&state, claims).await?;
    debug!(
        principal = %principal.id,
        role = %principal.role,
        "Authentication successful, adding principal to request"
    );

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenConfig;
    use crate::player::PlayerModel;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt; // for `oneshot`

    async fn whoami(Extension(principal): Extension<Principal>) -> String {
        principal.id
    }

    async fn app(members: Vec<PlayerModel>) -> (Router, TokenConfig) {
        let config = TokenConfig::with_secret("middleware-secret", 1);
        let state = AppState::in_memory(config.clone());
        for member in &members {
            state.player_repository.create_player(member).await.unwrap();
        }
        let router = Router::new()
            .route("/me", get(whoami))
            .layer(middleware::from_fn_with_state(state.clone(), jwt_auth))
            .with_state(state);
        (router, config)
    }

    async fn call(app: Router, token: &str) -> axum::response::Response {
        app.oneshot(
            HttpRequest::builder()
                .uri("/me")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let (app, _) = app(vec![]).await;
        let response = app
            .oneshot(HttpRequest::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn attaches_stored_principal_for_valid_token() {
        let (app, config) = app(vec![PlayerModel::new("E42".into(), "Han".into())]).await;
        let token = config
            .create_token(&Principal::new("E42", "Han", Role::Player))
            .unwrap();

        let response = call(app, &token).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"E42");
    }

    #[tokio::test]
    async fn unknown_subject_is_unauthorized() {
        let (app, config) = app(vec![]).await;
        let token = config
            .create_token(&Principal::new("E404", "Ghost", Role::Admin))
            .unwrap();
        assert_eq!(call(app, &token).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn deactivated_member_is_unauthorized() {
        let member = PlayerModel {
            is_active: false,
            ..PlayerModel::new("E9".into(), "Gone".into())
        };
        let (app, config) = app(vec![member]).await;
        let token = config
            .create_token(&Principal::new("E9", "Gone", Role::Player))
            .unwrap();
        assert_eq!(call(app, &token).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejected_member_is_forbidden_even_with_player_token() {
        let member = PlayerModel {
            role: Role::Rejected,
            ..PlayerModel::new("E3".into(), "Late".into())
        };
        let (app, config) = app(vec![member]).await;
        let token = config
            .create_token(&Principal::new("E3", "Late", Role::Player))
            .unwrap();
        assert_eq!(call(app, &token).await.status(), StatusCode::FORBIDDEN);
    }
}
