use std::time::Duration;

use clap::Parser;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, DatabaseConnection};
use server::{ServerState, TokenSigner};
use settings::{Cli, Database, Pool, Settings};

mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let settings = Settings::new(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "milk_dairy={level},server={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database, &settings.pool).await?;

    let engine = engine::Engine::builder()
        .database(db.clone())
        .auto_post_ledger(settings.ledger.auto_post)
        .bcrypt_cost(settings.auth.bcrypt_cost)
        .build()
        .await?;
    let tokens = TokenSigner::new(&settings.auth.secret, settings.auth.token_ttl()?)?;

    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    if let Err(err) = server::run_with_listener(
        ServerState::new(engine, tokens),
        listener,
        shutdown_signal(),
    )
    .await
    {
        tracing::error!("server failed: {err}");
    }

    db.close().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn database_url(config: &Database) -> String {
    match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite { path } => format!("sqlite:{path}?mode=rwc"),
        Database::Mysql {
            host,
            port,
            user,
            password,
            name,
        } => format!("mysql://{user}:{password}@{host}:{port}/{name}"),
    }
}

async fn parse_database(config: &Database, pool: &Pool) -> Result<DatabaseConnection, BoxError> {
    let mut options = ConnectOptions::new(database_url(config));
    options.sqlx_logging(false);
    if let Database::Memory = config {
        // Every pooled connection would otherwise open its own empty database.
        options.max_connections(1);
    } else if let Some(max) = pool.max_connections {
        options.max_connections(max);
    }
    if let Some(secs) = pool.acquire_timeout_secs {
        options.acquire_timeout(Duration::from_secs(secs));
    }

    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    tracing::info!("Database ready");
    Ok(database)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                tracing::error!("failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_urls() {
        assert_eq!(database_url(&Database::Memory), "sqlite::memory:");
        assert_eq!(
            database_url(&Database::Sqlite {
                path: "dairy.db".to_string()
            }),
            "sqlite:dairy.db?mode=rwc"
        );
        assert_eq!(
            database_url(&Database::Mysql {
                host: "localhost".to_string(),
                port: 3306,
                user: "dairy".to_string(),
                password: "pw".to_string(),
                name: "milk".to_string(),
            }),
            "mysql://dairy:pw@localhost:3306/milk"
        );
    }
}
