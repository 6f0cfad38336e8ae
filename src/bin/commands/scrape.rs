use super::utils::{build_scraper, DEFAULT_SCRAPE_BASE_URL};
use tracklist_sync::{AsyncPaginatedIterator, ListingStrategy, PacingConfig};

/// Handle the scrape command
pub async fn handle_scrape(
    curator: &str,
    limit: usize,
    indexed: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let strategy = if indexed {
        ListingStrategy::Indexed
    } else {
        ListingStrategy::Ajax
    };
    let scraper = build_scraper(DEFAULT_SCRAPE_BASE_URL, PacingConfig::scraping(), strategy);

    println!("🔍 Crawling tracklists of {curator}...");
    let mut ids = scraper.track_ids(curator);
    let mut count = 0;

    while let Some(id) = ids.next().await? {
        count += 1;
        println!("{count:>4}. spotify:track:{id}");

        if limit > 0 && count >= limit {
            break;
        }
    }

    println!(
        "\n📊 {count} tracks from {} listings",
        ids.current_page()
    );
    Ok(())
}
