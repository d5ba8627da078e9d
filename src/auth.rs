use crate::api::ApiClient;
use crate::types::User;
use tracing::{info, warn};

/// Result of a sign-in attempt, ready to show next to a form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl AuthOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Signed-in state shared by everything that needs the current user.
///
/// Built with [`AuthContext::new`], brought up to date with
/// [`AuthContext::hydrate`] and torn down with [`AuthContext::logout`].
pub struct AuthContext {
    api: ApiClient,
    user: Option<User>,
}

impl AuthContext {
    pub fn new(api: ApiClient) -> Self {
        Self { api, user: None }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Restore the user from a stored token. A token the backend no longer
    /// accepts is discarded.
    pub async fn hydrate(&mut self) {
        if self.api.token().is_none() {
            return;
        }
        match self.api.get_profile().await {
            Ok(response) if response.success && response.user.is_some() => {
                self.user = response.user;
                info!("session restored");
            }
            Ok(response) => {
                warn!(error = ?response.error, "stored token rejected");
                self.logout();
            }
            Err(err) => {
                warn!(error = %err, "auth check failed");
                self.logout();
            }
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> AuthOutcome {
        match self.api.login(email, password).await {
            Ok(response) if response.success => {
                self.user = response.user;
                AuthOutcome::ok()
            }
            Ok(response) => {
                AuthOutcome::failed(response.error.unwrap_or_else(|| "Login failed".to_string()))
            }
            Err(err) => AuthOutcome::failed(err.to_string()),
        }
    }

    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> AuthOutcome {
        match self.api.register(name, email, password).await {
            Ok(response) if response.success => {
                self.user = response.user;
                AuthOutcome::ok()
            }
            Ok(response) => AuthOutcome::failed(
                response
                    .error
                    .unwrap_or_else(|| "Registration failed".to_string()),
            ),
            Err(err) => AuthOutcome::failed(err.to_string()),
        }
    }

    /// Replace the cached user after a profile edit.
    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn logout(&mut self) {
        self.api.logout();
        self.user = None;
    }
}
