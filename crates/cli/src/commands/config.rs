use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use scoopy_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let secret = |present: bool| if present { "<redacted>" } else { "<unset>" }.to_string();
    let entries: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "SCOOPY_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "SCOOPY_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "SCOOPY_DATABASE_TIMEOUT_SECS",
        ),
        ("llm.provider", format!("{:?}", config.llm.provider), "SCOOPY_LLM_PROVIDER"),
        ("llm.model", config.llm.model.clone(), "SCOOPY_LLM_MODEL"),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "SCOOPY_LLM_BASE_URL",
        ),
        ("llm.api_key", secret(config.llm.api_key.is_some()), "SCOOPY_LLM_API_KEY"),
        (
            "pushover.user_key",
            secret(config.pushover.user_key.is_some()),
            "SCOOPY_PUSHOVER_USER_KEY",
        ),
        (
            "pushover.app_token",
            secret(config.pushover.app_token.is_some()),
            "SCOOPY_PUSHOVER_APP_TOKEN",
        ),
        ("server.bind_address", config.server.bind_address.clone(), "SCOOPY_SERVER_BIND_ADDRESS"),
        ("server.port", config.server.port.to_string(), "SCOOPY_SERVER_PORT"),
        (
            "server.cors_allowed_origins",
            config.server.cors_allowed_origins.join(","),
            "SCOOPY_SERVER_CORS_ALLOWED_ORIGINS",
        ),
        (
            "session.reset_policy",
            format!("{:?}", config.session.reset_policy),
            "SCOOPY_SESSION_RESET_POLICY",
        ),
        ("logging.level", config.logging.level.clone(), "SCOOPY_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "SCOOPY_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in entries {
        let source = field_source(
            key,
            env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {key} = {value} (source: {source})"));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("scoopy.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/scoopy.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: toml::Value = "[llm]\nmodel = \"llama\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
