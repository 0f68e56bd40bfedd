use anyhow::Result;

use crate::api::{ApiClient, AuthMe};
use crate::session::Session;

/// UI access mode derived from the identity endpoint. Disabling is advisory
/// (the server still enforces roles); this only greys out mutating controls
/// and feeds the diagnostic panel.
#[derive(Debug, Clone)]
pub struct AccessState {
    pub role: String,
    pub read_only: bool,
    /// Whether submit-style (mutating) controls stay enabled.
    pub controls_enabled: bool,
    pub diagnostics: Vec<String>,
}

impl AccessState {
    /// Fail-open by policy: when the identity call fails (missing or invalid
    /// key), controls keep their default enabled state and the failure text
    /// goes to the diagnostic panel. Usability over enforcement in a demo.
    pub fn from_identity(identity: Result<AuthMe>) -> Self {
        match identity {
            Ok(me) => {
                let p = me.principal;
                let mut diagnostics =
                    vec![format!("Connected as role={} read_only={}", p.role, p.read_only)];
                if p.read_only {
                    diagnostics.push(format!(
                        "Read-only mode enabled for this API key.\nRole: {}\n\nScoring and explain endpoints are disabled.",
                        p.role
                    ));
                }
                Self {
                    controls_enabled: !p.read_only,
                    read_only: p.read_only,
                    role: p.role,
                    diagnostics,
                }
            }
            Err(err) => Self {
                role: "unknown".to_string(),
                read_only: false,
                controls_enabled: true,
                diagnostics: vec![err.to_string()],
            },
        }
    }
}

/// Queries `/auth/me` and folds the outcome into an `AccessState`. Safe to
/// call any number of times; touches neither the ledger nor the session.
pub async fn apply(client: &ApiClient, session: &Session) -> AccessState {
    AccessState::from_identity(client.auth_me(session).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Principal;
    use anyhow::anyhow;

    fn identity(role: &str, read_only: bool) -> Result<AuthMe> {
        Ok(AuthMe {
            principal: Principal { role: role.to_string(), read_only },
        })
    }

    #[test]
    fn test_read_only_principal_disables_controls() {
        let state = AccessState::from_identity(identity("viewer", true));
        assert!(!state.controls_enabled);
        assert!(state.read_only);
        assert_eq!(state.role, "viewer");
        assert!(state.diagnostics.iter().any(|d| d.contains("Read-only mode")));
    }

    #[test]
    fn test_writer_principal_keeps_controls_enabled() {
        let state = AccessState::from_identity(identity("analyst", false));
        assert!(state.controls_enabled);
        assert!(!state.read_only);
        assert!(state.diagnostics.iter().any(|d| d.contains("role=analyst")));
    }

    #[test]
    fn test_identity_failure_fails_open() {
        let state = AccessState::from_identity(Err(anyhow!("HTTP 401: bad key")));
        assert!(state.controls_enabled);
        assert!(!state.read_only);
        assert_eq!(state.role, "unknown");
        assert!(state.diagnostics.iter().any(|d| d.contains("401")));
    }

    #[test]
    fn test_idempotent_for_same_identity() {
        let a = AccessState::from_identity(identity("viewer", true));
        let b = AccessState::from_identity(identity("viewer", true));
        assert_eq!(a.controls_enabled, b.controls_enabled);
        assert_eq!(a.diagnostics, b.diagnostics);
    }
}
