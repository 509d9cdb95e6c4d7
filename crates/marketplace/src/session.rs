//! Session identity and the plugin selection slot.

use {
    async_trait::async_trait,
    bazaar_config::SessionConfig,
    secrecy::{ExposeSecret, SecretString},
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use crate::types::PluginId;

/// Who is browsing and where installs go. Owned by the host; the marketplace
/// only reads it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user_id: Option<String>,
    workspace_id: Option<String>,
    auth_token: Option<SecretString>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            user_id: config.user_id.clone(),
            workspace_id: config.workspace_id.clone(),
            auth_token: config.auth_token.clone(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(SecretString::new(token.into()));
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        non_empty(self.user_id.as_deref())
    }

    pub fn workspace_id(&self) -> Option<&str> {
        non_empty(self.workspace_id.as_deref())
    }

    pub fn token(&self) -> Option<&str> {
        non_empty(self.auth_token.as_ref().map(|t| t.expose_secret().as_str()))
    }

    pub(crate) fn set_user(&mut self, user_id: String) {
        self.user_id = Some(user_id);
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// A user record from the identity provider. Only the id is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Source of the current user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> anyhow::Result<Vec<UserRecord>>;
}

/// Identity known up front (flags, environment, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    users: Vec<UserRecord>,
}

impl StaticIdentity {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self { users }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(vec![UserRecord {
            id: id.into(),
            email: None,
        }])
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> anyhow::Result<Vec<UserRecord>> {
        Ok(self.users.clone())
    }
}

/// Adopt the first user record's id into `session`.
///
/// An empty id means "not logged in" and leaves the session untouched, as
/// does a provider error. Returns whether a user was adopted.
pub async fn resolve_user(session: &mut Session, identity: &dyn IdentityProvider) -> bool {
    match identity.current_user().await {
        Ok(users) => match users.into_iter().next() {
            Some(user) if !user.id.trim().is_empty() => {
                info!(user_id = %user.id, "resolved current user");
                session.set_user(user.id);
                true
            },
            _ => {
                debug!("identity provider returned no logged-in user");
                false
            },
        },
        Err(e) => {
            warn!(error = %e, "failed to resolve current user");
            false
        },
    }
}

/// Stamp identifying one selection. Responses carry the ticket they were
/// issued under and are applied only while it is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// The single selected-plugin slot.
#[derive(Debug, Default)]
pub struct Selection {
    plugin_id: Option<PluginId>,
    generation: u64,
}

impl Selection {
    pub fn plugin_id(&self) -> Option<&PluginId> {
        self.plugin_id.as_ref()
    }

    /// Replace the selection. Returns the new ticket, or `None` when the
    /// value did not change (no reload, in-flight work stays valid).
    pub fn set(&mut self, plugin_id: Option<PluginId>) -> Option<Ticket> {
        if self.plugin_id == plugin_id {
            return None;
        }
        self.plugin_id = plugin_id;
        self.generation += 1;
        Some(self.ticket())
    }

    /// Invalidate every outstanding ticket without changing the value.
    pub fn invalidate(&mut self) -> Ticket {
        self.generation += 1;
        self.ticket()
    }

    pub fn ticket(&self) -> Ticket {
        Ticket(self.generation)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation == ticket.0
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct FailingIdentity;

    #[async_trait]
    impl IdentityProvider for FailingIdentity {
        async fn current_user(&self) -> anyhow::Result<Vec<UserRecord>> {
            anyhow::bail!("identity service unavailable")
        }
    }

    #[test]
    fn test_blank_values_read_as_missing() {
        let session = Session::new().with_workspace("  ").with_token("").with_user("u");
        assert_eq!(session.workspace_id(), None);
        assert_eq!(session.token(), None);
        assert_eq!(session.user_id(), Some("u"));
    }

    #[test]
    fn test_token_never_printed() {
        let session = Session::new().with_token("s3cr3t");
        assert!(!format!("{session:?}").contains("s3cr3t"));
        assert_eq!(session.token(), Some("s3cr3t"));
    }

    #[tokio::test]
    async fn test_resolve_user_adopts_first_record() {
        let mut session = Session::new();
        let identity = StaticIdentity::new(vec![
            serde_json::from_str(r#"{"_id": "u-1", "email": "a@example.com"}"#).unwrap(),
            serde_json::from_str(r#"{"id": "u-2"}"#).unwrap(),
        ]);
        assert!(resolve_user(&mut session, &identity).await);
        assert_eq!(session.user_id(), Some("u-1"));
    }

    #[tokio::test]
    async fn test_resolve_user_empty_id_is_not_logged_in() {
        let mut session = Session::new().with_user("previous");
        assert!(!resolve_user(&mut session, &StaticIdentity::user("")).await);
        assert_eq!(session.user_id(), Some("previous"));

        assert!(!resolve_user(&mut session, &StaticIdentity::default()).await);
    }

    #[tokio::test]
    async fn test_resolve_user_provider_error_is_not_fatal() {
        let mut session = Session::new();
        assert!(!resolve_user(&mut session, &FailingIdentity).await);
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn test_selection_tickets() {
        let mut selection = Selection::default();
        let a = selection.set(Some(PluginId::new("a"))).unwrap();
        assert!(selection.is_current(a));

        // Same value: no new ticket, `a` stays valid.
        assert!(selection.set(Some(PluginId::new("a"))).is_none());
        assert!(selection.is_current(a));

        let b = selection.set(Some(PluginId::new("b"))).unwrap();
        assert!(!selection.is_current(a));
        assert!(selection.is_current(b));

        let cleared = selection.set(None).unwrap();
        assert!(!selection.is_current(b));
        assert!(selection.is_current(cleared));
        assert!(selection.plugin_id().is_none());

        let bumped = selection.invalidate();
        assert!(!selection.is_current(cleared));
        assert!(selection.is_current(bumped));
    }
}
