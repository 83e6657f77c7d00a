//! Application access decisions from resolved group ids

use crate::cache::DataCache;
use crate::error::Result;
use crate::store::ApplicationStore;
use crate::types::Application;

use std::sync::Arc;
use tracing::debug;

/// Returns true if `user_group_ids` satisfies the application's restriction
///
/// An application without groups is open to everyone, including principals
/// with no groups at all. Otherwise one shared group id is enough.
pub fn is_access_allowed<S: AsRef<str>>(application: &Application, user_group_ids: &[S]) -> bool {
    if application.is_unrestricted() {
        return true;
    }

    application
        .groups
        .iter()
        .any(|allowed| user_group_ids.iter().any(|g| g.as_ref() == allowed))
}

/// Access checks against the cached application list
pub struct AccessDecisionEngine {
    cache: Arc<DataCache>,
    applications: Arc<dyn ApplicationStore>,
}

impl AccessDecisionEngine {
    pub fn new(cache: Arc<DataCache>, applications: Arc<dyn ApplicationStore>) -> Self {
        Self { cache, applications }
    }

    /// Decide access for `client_id`
    ///
    /// A client id with no stored application has no restriction and is
    /// allowed.
    pub async fn check<S: AsRef<str>>(
        &self,
        client_id: &str,
        user_group_ids: &[S],
    ) -> Result<bool> {
        let applications = self.cache.applications(self.applications.as_ref()).await?;

        let allowed = match applications.iter().find(|a| a.id == client_id) {
            Some(application) => is_access_allowed(application, user_group_ids),
            None => true,
        };

        debug!(
            client_id,
            allowed,
            groups = user_group_ids.len(),
            "application access decision"
        );
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_allows_everyone() {
        let app = Application::new("app");
        assert!(is_access_allowed(&app, &["g1"]));
        assert!(is_access_allowed::<&str>(&app, &[]));
    }

    #[test]
    fn test_restricted_requires_intersection() {
        let app = Application::new("app").with_groups(["g1", "g2"]);
        assert!(is_access_allowed(&app, &["g2"]));
        assert!(is_access_allowed(&app, &["g3", "g1"]));
        assert!(!is_access_allowed(&app, &["g3"]));
        assert!(!is_access_allowed::<String>(&app, &[]));
    }
}
