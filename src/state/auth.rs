//! Login and registration forms.
//!
//! ERROR HANDLING
//! ==============
//! A rejected request shows the server's `message` when it sent one and a
//! per-form fallback otherwise. Anything that never produced a readable
//! response (connection refused, unparseable body) is reported as a network
//! error. Nothing here returns `Err` to the caller; every path ends in an
//! `AuthOutcome`.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use crate::error::{ApiError, server_message};
use crate::net::http::ApiClient;
use crate::net::token::TokenStore;
use crate::net::types::{AuthResponse, Credentials};
use crate::notice::Notice;

/// Where a successful login lands.
pub const HOME_ROUTE: &str = "/";
/// Where a successful registration lands.
pub const LOGIN_ROUTE: &str = "/login";

const LOGIN_FAILED: &str = "Login failed";
const REGISTER_FAILED: &str = "Registration failed";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_DATA: &str = "Invalid data";
const NETWORK_ERROR: &str = "Network error";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Build credentials, requiring both fields to be non-blank.
///
/// # Errors
///
/// Returns `AuthError::MissingField` naming the first blank field.
pub fn credentials(username: &str, password: &str) -> Result<Credentials, AuthError> {
    if username.trim().is_empty() {
        return Err(AuthError::MissingField("Username"));
    }
    if password.trim().is_empty() {
        return Err(AuthError::MissingField("Password"));
    }
    Ok(Credentials { username: username.to_owned(), password: password.to_owned() })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Success { notice: Notice, redirect: &'static str },
    Failure(Notice),
}

impl AuthOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn notice(&self) -> &Notice {
        match self {
            Self::Success { notice, .. } | Self::Failure(notice) => notice,
        }
    }
}

fn failure_description(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Status { body, .. } => server_message(body).unwrap_or_else(|| fallback.to_owned()),
        _ => NETWORK_ERROR.to_owned(),
    }
}

/// Turn a login response into an outcome, storing the token on success.
///
/// A 2xx reply without a token counts as a failure.
pub fn login_outcome(result: Result<AuthResponse, ApiError>, tokens: &TokenStore) -> AuthOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "login rejected");
            return AuthOutcome::Failure(Notice::error(LOGIN_FAILED, failure_description(&e, INVALID_CREDENTIALS)));
        }
    };

    let Some(token) = response.token.filter(|token| !token.is_empty()) else {
        let description = response.message.unwrap_or_else(|| INVALID_CREDENTIALS.to_owned());
        return AuthOutcome::Failure(Notice::error(LOGIN_FAILED, description));
    };

    if let Err(e) = tokens.set(&token) {
        tracing::error!(error = %e, "failed to persist token");
        return AuthOutcome::Failure(Notice::error(LOGIN_FAILED, e.user_message()));
    }

    tracing::info!("login succeeded");
    AuthOutcome::Success { notice: Notice::info("Login successful"), redirect: HOME_ROUTE }
}

#[must_use]
pub fn register_outcome(result: Result<AuthResponse, ApiError>) -> AuthOutcome {
    match result {
        Ok(_) => {
            tracing::info!("registration succeeded");
            AuthOutcome::Success { notice: Notice::info("Registration successful"), redirect: LOGIN_ROUTE }
        }
        Err(e) => {
            tracing::warn!(error = %e, "registration rejected");
            AuthOutcome::Failure(Notice::error(REGISTER_FAILED, failure_description(&e, INVALID_DATA)))
        }
    }
}

pub async fn login(client: &ApiClient, credentials: &Credentials) -> AuthOutcome {
    login_outcome(client.login(credentials).await, client.tokens())
}

pub async fn register(client: &ApiClient, credentials: &Credentials) -> AuthOutcome {
    register_outcome(client.signup(credentials).await)
}

/// End the server session (best effort) and forget the stored token.
///
/// # Errors
///
/// Returns an error only if the token file cannot be removed.
pub async fn logout(client: &ApiClient) -> Result<(), ApiError> {
    client.logout().await;
    client.tokens().clear()
}

/// Which form is being shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

/// Field values plus the in-flight flag for the login/register form.
#[derive(Clone, Debug, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub username: String,
    pub password: String,
    loading: bool,
}

impl AuthForm {
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self { mode, ..Self::default() }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn failure_title(&self) -> &'static str {
        match self.mode {
            AuthMode::Login => LOGIN_FAILED,
            AuthMode::Register => REGISTER_FAILED,
        }
    }

    /// Validate and submit. Blank fields fail without a request.
    pub async fn submit(&mut self, client: &ApiClient) -> AuthOutcome {
        let credentials = match credentials(&self.username, &self.password) {
            Ok(credentials) => credentials,
            Err(e) => return AuthOutcome::Failure(Notice::error(self.failure_title(), e.to_string())),
        };

        self.loading = true;
        let outcome = match self.mode {
            AuthMode::Login => login(client, &credentials).await,
            AuthMode::Register => register(client, &credentials).await,
        };
        self.loading = false;

        if outcome.is_success() {
            self.password.clear();
        }
        outcome
    }
}
