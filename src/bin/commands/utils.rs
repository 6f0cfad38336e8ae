use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracklist_sync::{
    AuthorizationPrompt, CatalogClientImpl, CredentialStore, CuratorConfig, FileCredentialStore,
    ListingStrategy, OAuthConfig, PacingConfig, RateLimitedTransport, SyncConfig, SyncError,
    TokenManager, TracklistScraper, TransportConfig,
};

pub const DEFAULT_SCRAPE_BASE_URL: &str = "https://www.1001tracklists.com";

const REQUIRED_VARS: [&str; 3] = [
    "SPOTIFY_CLIENT_ID",
    "SPOTIFY_CLIENT_SECRET",
    "SPOTIFY_REDIRECT_URI",
];

/// Prints the authorization URL and reads the redirect URL from stdin.
pub struct TerminalPrompt;

impl AuthorizationPrompt for TerminalPrompt {
    fn request_authorization(&self, authorize_url: &str) -> tracklist_sync::Result<String> {
        println!("🔐 Open this URL in your browser and grant access:");
        println!("   {authorize_url}");
        print!("Paste the URL you were redirected to: ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let line = line.trim();
        if line.is_empty() {
            return Err(SyncError::Authorization(
                "no redirect URL entered".to_string(),
            ));
        }
        Ok(line.to_string())
    }
}

/// Build the run configuration from environment variables.
///
/// Every missing required variable is reported by name.
pub fn config_from_env() -> Result<SyncConfig, Box<dyn std::error::Error>> {
    let missing: Vec<&str> = REQUIRED_VARS
        .iter()
        .copied()
        .filter(|name| non_empty_var(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "missing environment variables: {} (register an app with the catalog service to obtain them)",
            missing.join(", ")
        )
        .into());
    }

    let oauth = OAuthConfig::new(
        non_empty_var("SPOTIFY_CLIENT_ID").unwrap_or_default(),
        non_empty_var("SPOTIFY_CLIENT_SECRET").unwrap_or_default(),
        non_empty_var("SPOTIFY_REDIRECT_URI").unwrap_or_default(),
    );
    let mut config = SyncConfig::new(oauth);

    if let Some(mirror) = non_empty_var("SPOTIFY_MIRROR_PLAYLIST") {
        config = config.with_mirror_playlist(mirror);
    }
    if let Some(curators) = non_empty_var("TRACKLIST_CURATORS") {
        for curator in parse_curators(&curators)? {
            config = config.with_curator(curator);
        }
    }
    if let Some(path) = non_empty_var("TRACKLIST_SYNC_CREDENTIALS") {
        config = config.with_credential_path(path);
    }

    config.validate()?;
    Ok(config)
}

/// Parse `name=playlist_id` pairs separated by commas.
pub fn parse_curators(value: &str) -> Result<Vec<CuratorConfig>, SyncError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, playlist)) if !name.trim().is_empty() && !playlist.trim().is_empty() => {
                Ok(CuratorConfig::new(name.trim(), playlist.trim()))
            }
            _ => Err(SyncError::Config(format!(
                "invalid curator entry '{pair}', expected name=playlist_id"
            ))),
        })
        .collect()
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Catalog client with the persisted refresh credential and terminal prompt.
pub fn build_catalog_client(
    config: &SyncConfig,
) -> Result<CatalogClientImpl, Box<dyn std::error::Error>> {
    let store: Arc<dyn CredentialStore> = match &config.credential_path {
        Some(path) => Arc::new(FileCredentialStore::new(path)),
        None => Arc::new(FileCredentialStore::in_data_dir()?),
    };

    let transport = RateLimitedTransport::new(
        Box::new(http_client::native::NativeClient::new()),
        TransportConfig::api(),
    );
    let tokens = TokenManager::new(
        config.oauth.clone(),
        transport.clone(),
        store,
        Arc::new(TerminalPrompt),
    );

    Ok(
        CatalogClientImpl::new(transport, tokens, config.catalog_base_url.clone())
            .with_limits(config.batch)
            .with_retry(config.retry.clone()),
    )
}

/// Paced scraper with a browser identity.
pub fn build_scraper(
    base_url: &str,
    pacing: PacingConfig,
    strategy: ListingStrategy,
) -> TracklistScraper {
    let transport = RateLimitedTransport::new(
        Box::new(http_client::native::NativeClient::new()),
        TransportConfig::scraping(base_url).with_pacing(pacing),
    );
    TracklistScraper::new(transport, base_url).with_strategy(strategy)
}

/// `0` means no limit.
pub fn limit_arg(limit: usize) -> Option<usize> {
    (limit > 0).then_some(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_curators() {
        let curators = parse_curators("missmonique=abc, adambeyer=def,").unwrap();
        assert_eq!(
            curators,
            vec![
                CuratorConfig::new("missmonique", "abc"),
                CuratorConfig::new("adambeyer", "def"),
            ]
        );
    }

    #[test]
    fn test_parse_curators_rejects_missing_playlist() {
        assert!(matches!(
            parse_curators("missmonique="),
            Err(SyncError::Config(_))
        ));
    }
}
