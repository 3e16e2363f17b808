mod dao;
mod model;
mod pages;
mod routes;
mod utils;

use axum::routing::get;
use axum::{serve, Router};
use dotenvy::dotenv;
use routes::{edit_link, edit_user_link, list_links, redirect, save_link, save_user_link};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use utils::{env_flag, get_env};

const DEFAULT_TRACING_LEVEL: &str = "golinks=debug";
const DATABASE_MAX_CONNECTIONS: u32 = 5;
const DATABASE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Sqlite>,
    pub user_links: bool,
}

#[tokio::main]
async fn main() {
    _ = dotenv();
    let database_url = get_env("DATABASE_URL");
    let server_address = get_env("SERVER_ADDRESS");
    let user_links = env_flag("USER_LINKS", true);
    configure_tracing();
    let pool = create_db_connection_pool(&database_url).await;
    dao::migrate(pool.clone())
        .await
        .expect("Running schema migrations failed");
    let listener = create_listener(&server_address).await;
    let router = create_router(AppState { pool, user_links });
    serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server failed to start");
}

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn create_db_connection_pool(database_url: &str) -> Pool<Sqlite> {
    let options = SqliteConnectOptions::from_str(database_url)
        .expect("Invalid database url")
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(DATABASE_BUSY_TIMEOUT);
    SqlitePoolOptions::new()
        .max_connections(DATABASE_MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .expect("Creating database connection pool failed")
}

async fn create_listener(server_address: &str) -> TcpListener {
    let listener = TcpListener::bind(&server_address)
        .await
        .expect("Creating tcp listener failed");
    tracing::info!("Listening on address: {}", server_address);
    listener
}

fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(list_links))
        .route("/edit/*name", get(edit_link).post(save_link));
    let router = if state.user_links {
        router.route("/editUser/*tail", get(edit_user_link).post(save_user_link))
    } else {
        router
    };
    router
        .fallback(redirect)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
