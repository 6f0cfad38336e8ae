use super::utils::build_catalog_client;
use tracklist_sync::{CatalogClient, SyncConfig};

/// Handle the auth command
///
/// Always runs the interactive flow so a stale or revoked credential can be
/// replaced without deleting files by hand.
pub async fn handle_auth(config: &SyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_catalog_client(config)?;
    client.authorize_interactively().await?;

    let user = client.current_user().await?;
    println!("✅ Authorized as {}; refresh credential stored", user.name());
    Ok(())
}
