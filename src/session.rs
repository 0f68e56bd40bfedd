use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::{kv_get, kv_remove, kv_set, SharedStore, KEY_API_KEY, KEY_AUTH, KEY_ENV, KEY_THEME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Anything unrecognized falls back to the default theme.
    pub fn parse(s: &str) -> Self {
        match s {
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Stage,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Stage => "stage",
            Environment::Prod => "prod",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "stage" => Environment::Stage,
            "prod" => Environment::Prod,
            _ => Environment::Dev,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Environment::Dev => "DEV",
            Environment::Stage => "STAGE",
            Environment::Prod => "PROD",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Environment::Dev => "Same-origin API",
            Environment::Stage => "Demo selector (wire later)",
            Environment::Prod => "Demo selector (wire later)",
        }
    }
}

/// Outcome of the navigation guard for a protected-page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Allow,
    Redirect(&'static str),
}

pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/";

/// Session & preference state shared across independently loaded pages.
/// Every setter writes through to the persistent store synchronously, so a
/// second handle over the same store observes the change on its next read.
#[derive(Clone)]
pub struct Session {
    store: SharedStore,
}

impl Session {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn theme(&self) -> Theme {
        kv_get(&self.store, KEY_THEME)
            .map(|v| Theme::parse(&v))
            .unwrap_or(Theme::Dark)
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        kv_set(&self.store, KEY_THEME, theme.as_str())
    }

    pub fn toggle_theme(&self) -> Result<Theme> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn environment(&self) -> Environment {
        kv_get(&self.store, KEY_ENV)
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Dev)
    }

    pub fn set_environment(&self, env: Environment) -> Result<()> {
        kv_set(&self.store, KEY_ENV, env.as_str())
    }

    pub fn api_key(&self) -> String {
        kv_get(&self.store, KEY_API_KEY).unwrap_or_default()
    }

    pub fn set_api_key(&self, key: &str) -> Result<()> {
        kv_set(&self.store, KEY_API_KEY, key)
    }

    /// Connection status line. The key is a secret: only its trailing four
    /// characters ever appear in user-facing text.
    pub fn key_status(&self) -> String {
        let key = self.api_key();
        if key.is_empty() {
            return "Not connected".to_string();
        }
        let tail: String = key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("Connected (****{})", tail)
    }

    pub fn is_authed(&self) -> bool {
        kv_get(&self.store, KEY_AUTH).as_deref() == Some("1")
    }

    pub fn set_authed(&self, authed: bool) -> Result<()> {
        kv_set(&self.store, KEY_AUTH, if authed { "1" } else { "0" })
    }

    /// Demo gate, not real authentication: any non-empty credential pair is
    /// accepted. Returns false (and stays guest) when either field is blank.
    pub fn login(&self, email: &str, password: &str) -> Result<bool> {
        if email.trim().is_empty() || password.trim().is_empty() {
            return Ok(false);
        }
        self.set_authed(true)?;
        Ok(true)
    }

    /// Full logout: the navigation guard redirects every protected path until
    /// the next login.
    pub fn logout(&self) -> Result<()> {
        self.set_authed(false)
    }

    /// Navigation guard: guests may only see the landing and login paths.
    pub fn guard(&self, path: &str) -> Guard {
        if path == LANDING_PATH || path == LOGIN_PATH {
            return Guard::Allow;
        }
        if self.is_authed() {
            Guard::Allow
        } else {
            Guard::Redirect(LOGIN_PATH)
        }
    }

    /// Wipe every session preference key. Ledger and report data are owned by
    /// the history component and are not touched here.
    pub fn reset(&self) -> Result<()> {
        for key in [KEY_THEME, KEY_AUTH, KEY_ENV, KEY_API_KEY] {
            kv_remove(&self.store, key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{shared, MemStore};

    fn session() -> Session {
        Session::new(shared(MemStore::new()))
    }

    #[test]
    fn test_defaults_on_empty_store() {
        let s = session();
        assert_eq!(s.theme(), Theme::Dark);
        assert_eq!(s.environment(), Environment::Dev);
        assert_eq!(s.api_key(), "");
        assert!(!s.is_authed());
    }

    #[test]
    fn test_defaults_on_corrupt_store() {
        let store = shared(MemStore::new());
        crate::store::kv_set(&store, KEY_THEME, "neon").unwrap();
        crate::store::kv_set(&store, KEY_ENV, "{broken").unwrap();
        crate::store::kv_set(&store, KEY_AUTH, "yes").unwrap();

        let s = Session::new(store);
        assert_eq!(s.theme(), Theme::Dark);
        assert_eq!(s.environment(), Environment::Dev);
        assert!(!s.is_authed());
    }

    #[test]
    fn test_preference_roundtrip() {
        let s = session();
        s.set_theme(Theme::Light).unwrap();
        s.set_environment(Environment::Prod).unwrap();
        s.set_api_key("demo_key").unwrap();
        s.set_authed(true).unwrap();

        assert_eq!(s.theme(), Theme::Light);
        assert_eq!(s.environment(), Environment::Prod);
        assert_eq!(s.api_key(), "demo_key");
        assert!(s.is_authed());
    }

    #[test]
    fn test_two_handles_share_one_store() {
        let store = shared(MemStore::new());
        let a = Session::new(store.clone());
        let b = Session::new(store);

        a.set_environment(Environment::Stage).unwrap();
        assert_eq!(b.environment(), Environment::Stage);

        b.logout().unwrap();
        assert!(!a.is_authed());
    }

    #[test]
    fn test_toggle_theme_flips() {
        let s = session();
        assert_eq!(s.toggle_theme().unwrap(), Theme::Light);
        assert_eq!(s.toggle_theme().unwrap(), Theme::Dark);
    }

    #[test]
    fn test_key_status_masks_secret() {
        let s = session();
        assert_eq!(s.key_status(), "Not connected");

        s.set_api_key("demo_key_1234").unwrap();
        assert_eq!(s.key_status(), "Connected (****1234)");
        assert!(!s.key_status().contains("demo_key"));

        s.set_api_key("ab").unwrap();
        assert_eq!(s.key_status(), "Connected (****ab)");
    }

    #[test]
    fn test_login_rejects_empty_credentials() {
        let s = session();
        assert!(!s.login("", "pw").unwrap());
        assert!(!s.login("a@b.c", "  ").unwrap());
        assert!(!s.is_authed());

        assert!(s.login("a@b.c", "pw").unwrap());
        assert!(s.is_authed());
    }

    #[test]
    fn test_guard_redirects_guests_from_protected_paths() {
        let s = session();
        assert_eq!(s.guard("/"), Guard::Allow);
        assert_eq!(s.guard("/login"), Guard::Allow);
        assert_eq!(s.guard("/app"), Guard::Redirect(LOGIN_PATH));
        assert_eq!(s.guard("/audit"), Guard::Redirect(LOGIN_PATH));

        s.login("a@b.c", "pw").unwrap();
        assert_eq!(s.guard("/app"), Guard::Allow);

        s.logout().unwrap();
        assert_eq!(s.guard("/app"), Guard::Redirect(LOGIN_PATH));
    }
}
