use axum::{
    extract::FromRef,
    routing::{get, post, put},
    Router,
};
use dotenv::dotenv;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

mod auth;
mod checkins;
mod config;
mod error;
mod follows;
mod profiles;
mod reactions;
mod social;
mod storage;

use config::settings::Settings;
use storage::StorageClient;

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    settings: Settings,
    storage: StorageClient,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> PgPool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(app_state: &AppState) -> Settings {
        app_state.settings.clone()
    }
}

impl FromRef<AppState> for StorageClient {
    fn from_ref(app_state: &AppState) -> StorageClient {
        app_state.storage.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::new();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    info!("database connected");

    let storage = StorageClient::new(
        &settings.supabase_url,
        &settings.service_role_key,
        &settings.storage_bucket,
    );

    let app_state = AppState {
        pool,
        settings: settings.clone(),
        storage,
    };

    let checkin_router = Router::new().route(
        "/checkins",
        post(checkins::handler::create_checkin).get(checkins::handler::list_checkins),
    );

    let social_router = Router::new().route("/social/feed", get(social::handler::get_feed));

    let reaction_router = Router::new().route(
        "/reactions",
        post(reactions::handler::add_reaction)
            .delete(reactions::handler::remove_reaction)
            .get(reactions::handler::get_reactions),
    );

    let follow_router = Router::new()
        .route(
            "/follows",
            post(follows::handler::follow_user)
                .delete(follows::handler::unfollow_user)
                .get(follows::handler::list_follows),
        )
        .route("/follows/status", get(follows::handler::follow_status));

    let profile_router = Router::new()
        .route("/profile", get(profiles::handler::get_profile))
        .route("/profile/sync", post(profiles::handler::sync_profile))
        .route("/profile/username", put(profiles::handler::update_username))
        .route(
            "/profile/background",
            put(profiles::handler::update_background),
        )
        .route("/users/search", get(profiles::handler::search_users));

    let upload_router = Router::new().route("/uploads/sign", post(storage::sign_upload));

    let app = Router::new()
        .merge(checkin_router)
        .merge(social_router)
        .merge(reaction_router)
        .merge(follow_router)
        .merge(profile_router)
        .merge(upload_router)
        .with_state(app_state);

    info!("Server running on http://localhost:{}", settings.port);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
