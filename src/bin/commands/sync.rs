use super::utils::{build_catalog_client, build_scraper};
use tracklist_sync::{ListingStrategy, SyncConfig, SyncRunner};

/// Handle the sync command
pub async fn handle_sync(config: SyncConfig, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = build_catalog_client(&config)?;
    let scraper = build_scraper(
        &config.scrape_base_url,
        config.scrape_pacing,
        ListingStrategy::default(),
    );

    if dry_run {
        println!("🧪 Dry run: plans are computed but not applied");
    }
    if config.curators.is_empty() {
        println!("ℹ️  No curators configured (set TRACKLIST_CURATORS=name=playlist_id,...)");
    }

    let runner = SyncRunner::new(catalog, scraper, config).with_dry_run(dry_run);
    let report = runner.run().await?;

    println!("✅ {report}");
    Ok(())
}
