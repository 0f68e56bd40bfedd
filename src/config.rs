use crate::session::Environment;

const DEFAULT_BASE: &str = "http://127.0.0.1:8000/v1";

/// Runtime configuration, resolved once at startup. All defined environments
/// currently point at the same local base; the per-environment indirection is
/// kept so a second backend can be wired in without touching call sites.
#[derive(Clone, Debug)]
pub struct Config {
    pub store_path: String,
    pub dev_base: String,
    pub stage_base: String,
    pub prod_base: String,
    pub history_capacity: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            store_path: std::env::var("RISKDECK_STORE").unwrap_or_else(|_| "./riskdeck.sqlite".to_string()),
            dev_base: std::env::var("API_BASE_DEV").unwrap_or_else(|_| DEFAULT_BASE.to_string()),
            stage_base: std::env::var("API_BASE_STAGE").unwrap_or_else(|_| DEFAULT_BASE.to_string()),
            prod_base: std::env::var("API_BASE_PROD").unwrap_or_else(|_| DEFAULT_BASE.to_string()),
            history_capacity: std::env::var("HISTORY_CAP").ok().and_then(|v| v.parse().ok()).unwrap_or(100),
        }
    }

    pub fn base_for(&self, env: Environment) -> &str {
        match env {
            Environment::Dev => &self.dev_base,
            Environment::Stage => &self.stage_base,
            Environment::Prod => &self.prod_base,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: "./riskdeck.sqlite".to_string(),
            dev_base: DEFAULT_BASE.to_string(),
            stage_base: DEFAULT_BASE.to_string(),
            prod_base: DEFAULT_BASE.to_string(),
            history_capacity: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_environments_share_default_base() {
        let cfg = Config::default();
        assert_eq!(cfg.base_for(Environment::Dev), cfg.base_for(Environment::Stage));
        assert_eq!(cfg.base_for(Environment::Dev), cfg.base_for(Environment::Prod));
    }

    #[test]
    fn test_base_for_respects_overrides() {
        let cfg = Config {
            stage_base: "https://stage.example/v1".to_string(),
            ..Config::default()
        };
        assert_eq!(cfg.base_for(Environment::Stage), "https://stage.example/v1");
        assert_eq!(cfg.base_for(Environment::Dev), DEFAULT_BASE);
    }
}
