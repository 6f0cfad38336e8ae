//! OAuth2 token lifecycle for the catalog API.

use crate::credential_store::CredentialStore;
use crate::headers;
use crate::transport::{encode_form, parse_url, RateLimitedTransport};
use crate::types::{AuthState, OAuthConfig};
use crate::{Result, SyncError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_client::Request;
use http_types::{Method, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Access tokens are treated as expired this long before the server says so.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Capability that turns an authorization URL into the redirect URL the
/// browser landed on after the user granted access.
///
/// Production uses a terminal prompt; tests supply a double.
pub trait AuthorizationPrompt: Send + Sync {
    fn request_authorization(&self, authorize_url: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Owns the access and refresh tokens and drives the state machine
///
/// ```text
/// Unauthenticated -> Authenticated -> Expired -> Reauthorizing -> Authenticated
/// ```
///
/// A stored refresh credential is tried first. If the authorization service
/// rejects it, the interactive flow runs and no further silent refresh is
/// attempted for the lifetime of this manager. Tokens are only handed out in
/// the `Authenticated` state.
pub struct TokenManager {
    config: OAuthConfig,
    transport: RateLimitedTransport,
    store: Arc<dyn CredentialStore>,
    prompt: Arc<dyn AuthorizationPrompt>,
    state: AuthState,
    access: Option<AccessToken>,
    refresh_token: Option<String>,
    refresh_rejected: bool,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("client_id", &self.config.client_id)
            .field("state", &self.state)
            .field("refresh_rejected", &self.refresh_rejected)
            .finish()
    }
}

impl TokenManager {
    pub fn new(
        config: OAuthConfig,
        transport: RateLimitedTransport,
        store: Arc<dyn CredentialStore>,
        prompt: Arc<dyn AuthorizationPrompt>,
    ) -> Self {
        Self {
            config,
            transport,
            store,
            prompt,
            state: AuthState::Unauthenticated,
            access: None,
            refresh_token: None,
            refresh_rejected: false,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Build the URL the user opens to grant access.
    pub fn authorize_url(&self) -> Result<String> {
        let scope = self.config.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("show_dialog", "true"),
            ],
        )
        .map_err(|e| SyncError::Config(format!("invalid authorize URL: {e}")))?;
        Ok(url.to_string())
    }

    /// Reach the `Authenticated` state.
    ///
    /// Tries a silent refresh with the stored credential (unless one was
    /// already rejected) and falls back to the interactive flow when the
    /// authorization service rejects it. Network errors propagate.
    pub async fn authorize(&mut self) -> Result<()> {
        if self.refresh_token.is_none() {
            self.refresh_token = self.store.load()?;
        }

        if !self.refresh_rejected {
            if let Some(refresh_token) = self.refresh_token.clone() {
                match self.refresh(&refresh_token).await {
                    Ok(()) => return Ok(()),
                    Err(SyncError::Authorization(msg)) => {
                        log::warn!("Stored refresh credential rejected ({msg}); reauthorizing interactively");
                        self.refresh_rejected = true;
                        self.refresh_token = None;
                    }
                    Err(e) => return Err(e),
                }
            } else {
                log::info!("No stored refresh credential; starting interactive authorization");
            }
        }

        self.authorize_interactively().await
    }

    /// Run the interactive authorization-code flow unconditionally.
    pub async fn authorize_interactively(&mut self) -> Result<()> {
        let previous = self.state;
        self.transition(AuthState::Reauthorizing);

        let outcome = async {
            let url = self.authorize_url()?;
            let redirect = self.prompt.request_authorization(&url)?;
            let code = extract_authorization_code(&redirect)?;
            let form = [
                ("grant_type", "authorization_code".to_string()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.clone()),
            ];
            self.token_request(&form).await
        }
        .await;

        match outcome {
            Ok(token) => self.apply_token(token),
            Err(e) => {
                self.fail_back(previous);
                Err(e)
            }
        }
    }

    /// Bearer token for a protected call, reauthorizing first if it expired.
    pub async fn access_token(&mut self) -> Result<String> {
        if self.state == AuthState::Authenticated {
            if let Some(access) = &self.access {
                if Instant::now() + EXPIRY_MARGIN < access.expires_at {
                    return Ok(access.value.clone());
                }
            }
            log::debug!("Access token expired");
            self.mark_expired();
        }

        if self.state == AuthState::Expired {
            self.authorize().await?;
        }

        self.current_token()
    }

    /// Token for the current state without any reauthorization.
    ///
    /// Fails with [`SyncError::NotAuthorized`] outside `Authenticated`.
    pub fn current_token(&self) -> Result<String> {
        match (&self.access, self.state) {
            (Some(access), AuthState::Authenticated) => Ok(access.value.clone()),
            (_, state) => Err(SyncError::NotAuthorized(state)),
        }
    }

    /// Force the next [`access_token`](Self::access_token) to reauthorize.
    pub fn mark_expired(&mut self) {
        if self.state == AuthState::Authenticated {
            self.access = None;
            self.transition(AuthState::Expired);
        }
    }

    async fn refresh(&mut self, refresh_token: &str) -> Result<()> {
        let previous = self.state;
        if previous != AuthState::Unauthenticated {
            self.transition(AuthState::Reauthorizing);
        }

        let form = [
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];
        match self.token_request(&form).await {
            Ok(token) => {
                log::debug!("Refreshed access token");
                self.apply_token(token)
            }
            Err(e) => {
                self.fail_back(previous);
                Err(e)
            }
        }
    }

    async fn token_request(&self, form: &[(&str, String)]) -> Result<TokenResponse> {
        let mut request = Request::new(Method::Post, parse_url(&self.config.token_url)?);
        let credentials = STANDARD.encode(format!(
            "{}:{}",
            self.config.client_id, self.config.client_secret
        ));
        let _ = request.insert_header("Authorization", format!("Basic {credentials}"));
        headers::add_form_headers(&mut request);
        request.set_body(encode_form(form));

        let response = self.transport.execute(request).await?;
        if (400..500).contains(&response.status) && response.status != 429 {
            let reason = match serde_json::from_str::<TokenErrorResponse>(&response.body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {description}", err.error),
                    None => err.error,
                },
                Err(_) => format!("HTTP {}", response.status),
            };
            return Err(SyncError::Authorization(reason));
        }
        response.error_for_status()?.json()
    }

    fn apply_token(&mut self, token: TokenResponse) -> Result<()> {
        if let Some(scope) = &token.scope {
            log::debug!("Granted scopes: {scope}");
        }
        if let Some(refresh_token) = token.refresh_token {
            self.store.save(&refresh_token)?;
            self.refresh_token = Some(refresh_token);
        }
        self.access = Some(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        self.transition(AuthState::Authenticated);
        Ok(())
    }

    fn fail_back(&mut self, previous: AuthState) {
        let state = match previous {
            AuthState::Unauthenticated => AuthState::Unauthenticated,
            _ => AuthState::Expired,
        };
        self.access = None;
        self.transition(state);
    }

    fn transition(&mut self, next: AuthState) {
        if self.state != next {
            log::debug!("Authorization state {} -> {next}", self.state);
            self.state = next;
        }
    }
}

/// Pull the authorization code out of a pasted redirect URL.
pub fn extract_authorization_code(redirect_url: &str) -> Result<String> {
    let url = Url::parse(redirect_url.trim())
        .map_err(|e| SyncError::Authorization(format!("not a valid redirect URL: {e}")))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(SyncError::Authorization(format!(
                    "authorization denied: {value}"
                )))
            }
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| SyncError::Authorization("redirect URL carries no code".to_string()))
}
