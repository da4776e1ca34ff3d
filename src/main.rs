use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use userhub::configuration::get_configuration;
use userhub::media_client::MediaClient;
use userhub::startup::run;
use userhub::store::{AccountStore, InMemoryAccountStore, PgAccountStore};
use userhub::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let store: Arc<dyn AccountStore> = match &configuration.database {
        Some(database) => {
            tracing::info!(host = %database.host, "Connecting to account database");

            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .connect(&database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Database connection error",
                    )
                })?;

            sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
            })?;

            tracing::info!("Database connection pool created successfully");
            Arc::new(PgAccountStore::new(pool))
        }
        None => {
            tracing::warn!("No database configured; accounts are kept in memory");
            Arc::new(InMemoryAccountStore::new())
        }
    };

    let media_client = MediaClient::from_settings(&configuration.media).map_err(|e| {
        tracing::error!("Failed to build media client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Media client error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(
        listener,
        store,
        media_client,
        configuration.application.clone(),
        configuration.jwt.clone(),
    )?;

    server.await
}
