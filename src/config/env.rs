use super::TokenkeepConfig;
use std::path::PathBuf;

pub const ENV_CLIENT_ID: &str = "TOKENKEEP_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "TOKENKEEP_CLIENT_SECRET";
pub const ENV_CACHE_DIR: &str = "TOKENKEEP_CACHE_DIR";
pub const ENV_HTTP_TIMEOUT_SECONDS: &str = "TOKENKEEP_HTTP_TIMEOUT_SECONDS";

/// Apply overrides from the process environment.
pub fn apply_overrides(config: &mut TokenkeepConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides using `lookup` as the environment. Unparsable values are
/// ignored and the file value kept.
pub fn apply_overrides_from<F>(config: &mut TokenkeepConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_CLIENT_ID) {
        config.provider.client_id = v;
    }
    if let Some(v) = lookup(ENV_CLIENT_SECRET) {
        config.provider.client_secret = v;
    }
    if let Some(v) = lookup(ENV_CACHE_DIR) {
        if !v.is_empty() {
            config.provider.cache_directory = Some(PathBuf::from(v));
        }
    }
    if let Some(v) = lookup(ENV_HTTP_TIMEOUT_SECONDS) {
        if let Ok(n) = v.parse::<u64>() {
            config.http.timeout_seconds = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::collections::HashMap;

    fn base_config() -> TokenkeepConfig {
        parse_config(
            r#"
            [provider]
            site_id = "example"
            client_id = "from-file"
            client_secret = "file-secret"
            authorization_endpoint = "https://idp.example/auth"
            token_endpoint = "https://idp.example/token"
            redirect_base = "http://localhost:8085"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_applied() {
        let env: HashMap<&str, &str> = [
            (ENV_CLIENT_ID, "from-env"),
            (ENV_CLIENT_SECRET, "env-secret"),
            (ENV_CACHE_DIR, "/var/tokens"),
            (ENV_HTTP_TIMEOUT_SECONDS, "7"),
        ]
        .into_iter()
        .collect();

        let mut config = base_config();
        apply_overrides_from(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.provider.client_id, "from-env");
        assert_eq!(config.provider.client_secret, "env-secret");
        assert_eq!(config.provider.cache_directory, Some(PathBuf::from("/var/tokens")));
        assert_eq!(config.http.timeout_seconds, 7);
    }

    #[test]
    fn test_unparsable_override_ignored() {
        let mut config = base_config();
        apply_overrides_from(&mut config, |k| {
            (k == ENV_HTTP_TIMEOUT_SECONDS).then(|| "soon".to_string())
        });

        assert_eq!(config.http.timeout_seconds, 30);
        assert_eq!(config.provider.client_id, "from-file");
    }
}
