use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use scoopy_agent::llm::HttpLlmClient;
use scoopy_agent::runtime::AgentRuntime;
use scoopy_agent::tools::ToolRegistry;
use scoopy_core::config::{AppConfig, ConfigError, LoadOptions};
use scoopy_db::repositories::{
    SqlMessageRepository, SqlOrderRepository, SqlSessionRepository,
};
use scoopy_db::{connect, migrations, DbPool};
use scoopy_notify::{Notifier, NoopNotifier, PushoverNotifier};

use crate::orders::SaveOrderTool;
use crate::sessions::SessionService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub sessions: Arc<SessionService>,
    pub runtime: Arc<AgentRuntime>,
    pub notifier_is_noop: bool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let notifier: Arc<dyn Notifier> = match PushoverNotifier::from_config(&config.pushover) {
        Some(pushover) => Arc::new(pushover),
        None => Arc::new(NoopNotifier),
    };
    let notifier_is_noop = notifier.is_noop();

    let mut tools = ToolRegistry::default();
    tools.register(SaveOrderTool::new(
        Arc::new(SqlOrderRepository::new(db_pool.clone())),
        notifier,
    ));

    let runtime = Arc::new(AgentRuntime::new(
        Arc::new(HttpLlmClient::from_config(&config.llm)),
        tools,
    ));

    let sessions = Arc::new(SessionService::new(
        Arc::new(SqlSessionRepository::new(db_pool.clone())),
        Arc::new(SqlMessageRepository::new(db_pool.clone())),
        config.session.reset_policy,
    ));

    Ok(Application { config, db_pool, sessions, runtime, notifier_is_noop })
}

#[cfg(test)]
mod tests {
    use scoopy_core::config::{ConfigOverrides, LlmProvider, LoadOptions};

    use super::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                llm_provider: Some(LlmProvider::Groq),
                llm_api_key: Some("gsk-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_completion_credentials() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                llm_provider: Some(LlmProvider::Groq),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("bootstrap must fail").to_string();
        assert!(message.contains("llm.api_key"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_degrades_to_noop_notifier() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('sessions', 'messages', 'orders')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 3, "bootstrap should expose the baseline tables");

        assert!(app.notifier_is_noop, "no pushover credentials were configured");

        app.db_pool.close().await;
    }
}
