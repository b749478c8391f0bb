#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;

use hush_engines::platform::PlatformGateConfig;
use hush_engines::query::CompanyScopeStrategy;
use tracing::{info, warn};

pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub http_bind: String,
    pub store_path: PathBuf,
    pub platform: Option<PlatformGateConfig>,
    pub fixture_path: Option<PathBuf>,
    pub enforce_admin: bool,
    pub company_scope: CompanyScopeStrategy,
}

impl AdapterConfig {
    pub fn from_env() -> Self {
        Self::from_env_var_map(|key| env::var(key).ok())
    }

    /// Reads every `HUSH_*` setting through `env_getter`. Invalid values are
    /// logged and replaced by their defaults.
    pub fn from_env_var_map<F>(mut env_getter: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut get = |key: &str| {
            env_getter(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let http_bind = get("HUSH_HTTP_BIND").unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string());
        let store_path = get("HUSH_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_store_path(get("HOME")));

        let platform = get("HUSH_PLATFORM_BASE_URL").map(|base_url| {
            let api_key = get("HUSH_PLATFORM_API_KEY").unwrap_or_else(|| {
                warn!("HUSH_PLATFORM_API_KEY not set; platform calls go out without a key");
                String::new()
            });
            let mut config = PlatformGateConfig::mvp_v1(base_url, api_key);
            if let Some(raw) = get("HUSH_PLATFORM_TIMEOUT_MS") {
                match raw.parse::<u64>() {
                    Ok(ms) if (100..=60_000).contains(&ms) => config.timeout_ms = ms,
                    _ => warn!(
                        value = %raw,
                        default = config.timeout_ms,
                        "invalid HUSH_PLATFORM_TIMEOUT_MS, using default"
                    ),
                }
            }
            config
        });

        let fixture_path = get("HUSH_FIXTURE_PATH").map(PathBuf::from);

        let enforce_admin = match get("HUSH_ENFORCE_ADMIN") {
            None => true,
            Some(v) => match parse_flag(&v) {
                Some(flag) => flag,
                None => {
                    warn!(value = %v, "invalid HUSH_ENFORCE_ADMIN, keeping admin enforcement on");
                    true
                }
            },
        };

        let company_scope = match get("HUSH_COMPANY_SCOPE") {
            None => CompanyScopeStrategy::Denormalized,
            Some(v) => CompanyScopeStrategy::parse(&v).unwrap_or_else(|| {
                warn!(value = %v, "invalid HUSH_COMPANY_SCOPE, using denormalized");
                CompanyScopeStrategy::Denormalized
            }),
        };

        let config = Self {
            http_bind,
            store_path,
            platform,
            fixture_path,
            enforce_admin,
            company_scope,
        };
        info!(
            http_bind = %config.http_bind,
            store_path = %config.store_path.display(),
            platform = config.platform.is_some(),
            enforce_admin = config.enforce_admin,
            company_scope = config.company_scope.as_str(),
            "adapter configuration loaded"
        );
        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn default_store_path(home: Option<String>) -> PathBuf {
    match home {
        Some(home) => PathBuf::from(home).join(".hush/adapter/feedback_journal.jsonl"),
        None => PathBuf::from(".hush/adapter/feedback_journal.jsonl"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config_from(pairs: &[(&str, &str)]) -> AdapterConfig {
        let vars: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AdapterConfig::from_env_var_map(|key| vars.get(key).cloned())
    }

    #[test]
    fn at_adapter_config_01_defaults() {
        let config = config_from(&[("HOME", "/home/ops")]);
        assert_eq!(config.http_bind, DEFAULT_HTTP_BIND);
        assert_eq!(
            config.store_path,
            PathBuf::from("/home/ops/.hush/adapter/feedback_journal.jsonl")
        );
        assert_eq!(config.platform, None);
        assert_eq!(config.fixture_path, None);
        assert!(config.enforce_admin);
        assert_eq!(config.company_scope, CompanyScopeStrategy::Denormalized);
    }

    #[test]
    fn at_adapter_config_02_platform_settings() {
        let config = config_from(&[
            ("HUSH_PLATFORM_BASE_URL", "https://platform.example/api/v1"),
            ("HUSH_PLATFORM_API_KEY", "key_1"),
            ("HUSH_PLATFORM_TIMEOUT_MS", "2500"),
        ]);
        let platform = config.platform.expect("platform configured");
        assert_eq!(platform.base_url, "https://platform.example/api/v1");
        assert_eq!(platform.api_key, "key_1");
        assert_eq!(platform.timeout_ms, 2_500);

        let out_of_range = config_from(&[
            ("HUSH_PLATFORM_BASE_URL", "https://platform.example"),
            ("HUSH_PLATFORM_TIMEOUT_MS", "5"),
        ]);
        assert_eq!(out_of_range.platform.expect("platform").timeout_ms, 5_000);
    }

    #[test]
    fn at_adapter_config_03_flags_and_scope() {
        let config = config_from(&[
            ("HUSH_ENFORCE_ADMIN", "off"),
            ("HUSH_COMPANY_SCOPE", "experience_join"),
            ("HUSH_STORE_PATH", " /tmp/journal.jsonl "),
        ]);
        assert!(!config.enforce_admin);
        assert_eq!(config.company_scope, CompanyScopeStrategy::ExperienceJoin);
        assert_eq!(config.store_path, PathBuf::from("/tmp/journal.jsonl"));

        let bogus = config_from(&[
            ("HUSH_ENFORCE_ADMIN", "maybe"),
            ("HUSH_COMPANY_SCOPE", "cache"),
        ]);
        assert!(bogus.enforce_admin);
        assert_eq!(bogus.company_scope, CompanyScopeStrategy::Denormalized);
    }
}
