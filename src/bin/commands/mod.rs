pub mod auth;
pub mod list;
pub mod scrape;
pub mod sync;
pub mod utils;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum ListCommands {
    /// List saved tracks, most recently saved first
    Saved {
        /// Maximum number of tracks to show (0 for no limit)
        #[arg(long, default_value = "0")]
        limit: usize,
    },

    /// List saved albums
    Albums {
        /// Maximum number of albums to show (0 for no limit)
        #[arg(long, default_value = "0")]
        limit: usize,
    },

    /// List followed artists
    Artists {
        /// Maximum number of artists to show (0 for no limit)
        #[arg(long, default_value = "0")]
        limit: usize,
    },

    /// List playlists owned or followed by the current user
    Playlists {
        /// Maximum number of playlists to show (0 for no limit)
        #[arg(long, default_value = "0")]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one full sync pass
    ///
    /// Moves stale entries out of staging playlists, mirrors saved tracks
    /// into the mirror playlist and adds newly scraped tracks to each
    /// curator playlist.
    ///
    /// Usage examples:
    /// # See what would change
    /// tracklist-sync sync --dry-run
    ///
    /// # Apply everything
    /// tracklist-sync sync
    Sync {
        /// Compute and report plans without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print catalog listings for the authorized user
    #[command(subcommand)]
    List(ListCommands),

    /// Print resolved track ids for a curator, oldest first
    ///
    /// Usage examples:
    /// # First 20 tracks published by a curator
    /// tracklist-sync scrape missmonique --limit 20
    Scrape {
        /// Curator slug as used in the site's URLs
        curator: String,

        /// Maximum number of track ids to show (0 for no limit)
        #[arg(long, default_value = "0")]
        limit: usize,

        /// Walk numbered index pages instead of incremental loading
        #[arg(long)]
        indexed: bool,
    },

    /// Authorize interactively and store a new refresh credential
    Auth,
}

/// Execute the given command
pub async fn execute_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Sync { dry_run } => {
            let config = utils::config_from_env()?;
            sync::handle_sync(config, dry_run).await
        }
        Commands::List(list_command) => {
            let config = utils::config_from_env()?;
            let client = utils::build_catalog_client(&config)?;
            match list_command {
                ListCommands::Saved { limit } => list::handle_list_saved(&client, limit).await,
                ListCommands::Albums { limit } => list::handle_list_albums(&client, limit).await,
                ListCommands::Artists { limit } => list::handle_list_artists(&client, limit).await,
                ListCommands::Playlists { limit } => {
                    list::handle_list_playlists(&client, limit).await
                }
            }
        }
        Commands::Scrape {
            curator,
            limit,
            indexed,
        } => scrape::handle_scrape(&curator, limit, indexed).await,
        Commands::Auth => {
            let config = utils::config_from_env()?;
            auth::handle_auth(&config).await
        }
    }
}
