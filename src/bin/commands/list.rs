use super::utils::limit_arg;
use tracklist_sync::{
    followed_artists, saved_albums, saved_tracks, user_playlists, AsyncPaginatedIterator,
    CatalogClient, CatalogClientImpl,
};

/// Handle the list saved command
pub async fn handle_list_saved(
    client: &CatalogClientImpl,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    client.authorize().await?;
    let mut tracks = saved_tracks(client, limit_arg(limit));
    let mut count = 0;

    while let Some(entry) = tracks.next().await? {
        count += 1;
        println!(
            "{count:>4}. {} - {} [{}] (saved {})",
            entry.track.artist_names(),
            entry.track.name,
            entry.track.album.name,
            entry.added_at.format("%Y-%m-%d")
        );
    }

    println!("\n📊 {count} saved tracks");
    Ok(())
}

/// Handle the list albums command
pub async fn handle_list_albums(
    client: &CatalogClientImpl,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    client.authorize().await?;
    let mut albums = saved_albums(client, limit_arg(limit));
    let mut count = 0;

    while let Some(saved) = albums.next().await? {
        count += 1;
        let artists: Vec<&str> = saved.album.artists.iter().map(|a| a.name.as_str()).collect();
        println!("{count:>4}. {} - {}", artists.join(", "), saved.album.name);
    }

    println!("\n📊 {count} saved albums");
    Ok(())
}

/// Handle the list artists command
pub async fn handle_list_artists(
    client: &CatalogClientImpl,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    client.authorize().await?;
    let mut artists = followed_artists(client, limit_arg(limit));
    let mut count = 0;

    while let Some(artist) = artists.next().await? {
        count += 1;
        println!("{count:>4}. {}", artist.name);
    }

    println!("\n📊 {count} followed artists");
    Ok(())
}

/// Handle the list playlists command
pub async fn handle_list_playlists(
    client: &CatalogClientImpl,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    client.authorize().await?;
    let mut playlists = user_playlists(client, limit_arg(limit));
    let mut count = 0;

    while let Some(playlist) = playlists.next().await? {
        count += 1;
        let visibility = if playlist.is_public() { "public" } else { "private" };
        println!(
            "{count:>4}. {} ({}, {visibility}, by {})",
            playlist.name,
            playlist.id,
            playlist.owner.name()
        );
    }

    println!("\n📊 {count} playlists");
    Ok(())
}
