use clubleague::{build_router, config::AppConfig, player::seed_super_admin, AppState};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clubleague=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting club league server");

    let config = AppConfig::from_env()?;

    let app_state = match &config.database_url {
        Some(url) => {
            let pool = sqlx::PgPool::connect(url).await.map_err(|e| {
                error!(error = %e, "Failed to connect to database");
                e
            })?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to PostgreSQL and applied migrations");
            AppState::postgres(pool, config.token_config.clone())
        }
        None => AppState::in_memory(config.token_config.clone()),
    };

    if let Some((id, name)) = &config.seed_super_admin {
        let token = seed_super_admin(
            app_state.player_repository.as_ref(),
            &app_state.token_config,
            id,
            name,
        )
        .await?;
        // Credentials stay out of the log stream
        warn!(player_id = %id, "Printing super admin bootstrap token to stdout");
        println!("SUPER_ADMIN_TOKEN={}", token);
    }

    let app = build_router(app_state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
