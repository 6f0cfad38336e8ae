//! One sequential library sync pass.

use crate::catalog::{playlist_tracks, saved_tracks, user_playlists, CatalogClient};
use crate::iterator::AsyncPaginatedIterator;
use crate::reconcile::{
    new_discoveries, plan_discovery_sync, plan_mirror_sync, plan_retention_pruning, track_ids,
    MutationPlan,
};
use crate::tracklists::TracklistScraper;
use crate::types::{CuratorConfig, ListEntry, SyncConfig, User};
use crate::Result;
use chrono::Utc;

/// Counts of what a pass changed (or would change under `dry_run`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries moved from staging playlists into the library
    pub evicted: usize,
    /// Saved tracks appended to the mirror playlist
    pub mirrored: usize,
    /// Scraped tracks appended to curator playlists
    pub discovered: usize,
    pub dry_run: bool,
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = if self.dry_run { "would move" } else { "moved" };
        write!(
            f,
            "{verb} {} evicted, {} mirrored, {} discovered tracks",
            self.evicted, self.mirrored, self.discovered
        )
    }
}

/// Runs pruning, mirroring and discovery against one catalog account.
///
/// Steps run strictly in sequence. A failing step aborts the pass; plans
/// already applied stay applied and the next pass converges from there.
pub struct SyncRunner<C: CatalogClient> {
    catalog: C,
    scraper: TracklistScraper,
    config: SyncConfig,
    dry_run: bool,
}

impl<C: CatalogClient> SyncRunner<C> {
    pub fn new(catalog: C, scraper: TracklistScraper, config: SyncConfig) -> Self {
        Self {
            catalog,
            scraper,
            config,
            dry_run: false,
        }
    }

    /// Compute and report plans without applying them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub async fn run(&self) -> Result<SyncReport> {
        self.catalog.authorize().await?;
        let user = self.catalog.current_user().await?;
        log::info!("Logged in as {}", user.name());

        let mut report = SyncReport {
            dry_run: self.dry_run,
            ..SyncReport::default()
        };

        report.evicted = self.prune_staging_playlists(&user).await?;

        if let Some(mirror) = &self.config.mirror_playlist_id {
            let saved = self.saved_tracks_chronological().await?;
            report.mirrored = self.mirror_saved_tracks(&saved, mirror).await?;
        }

        for curator in &self.config.curators {
            let mut ids = self.scraper.track_ids(&curator.name);
            report.discovered += self.sync_discoveries(curator, &mut ids).await?;
        }

        log::info!("Sync finished: {report}");
        Ok(report)
    }

    /// Evict stale entries from every owned playlist the retention policy
    /// applies to.
    pub async fn prune_staging_playlists(&self, user: &User) -> Result<usize> {
        let policy = &self.config.retention;
        let playlists = user_playlists(&self.catalog, None).collect_all().await?;
        let now = Utc::now();
        let mut evicted = 0;

        for playlist in playlists
            .iter()
            .filter(|p| p.owner.id == user.id && policy.applies_to(p))
        {
            let entries = playlist_tracks(&self.catalog, &playlist.id, None)
                .collect_all()
                .await?;
            let retention = plan_retention_pruning(&entries, &playlist.id, policy, now);
            if retention.evicted.is_empty() {
                log::debug!("Nothing to evict from {}", playlist.name);
                continue;
            }

            log::info!(
                "Evicting {} of {} entries from {}",
                retention.evicted.len(),
                entries.len(),
                playlist.name
            );
            self.execute(&retention.plan).await?;
            evicted += retention.evicted.len();
        }
        Ok(evicted)
    }

    /// Saved tracks sorted by `added_at`, oldest first.
    pub async fn saved_tracks_chronological(&self) -> Result<Vec<ListEntry>> {
        let mut saved = saved_tracks(&self.catalog, None).collect_all().await?;
        saved.sort_by_key(|entry| entry.added_at);
        log::debug!("{} saved tracks", saved.len());
        Ok(saved)
    }

    /// Append saved tracks missing from the mirror playlist.
    pub async fn mirror_saved_tracks(&self, saved: &[ListEntry], mirror: &str) -> Result<usize> {
        let current = playlist_tracks(&self.catalog, mirror, None)
            .collect_all()
            .await?;
        let plan = plan_mirror_sync(saved, &current, mirror);
        let added = planned_items(&plan);

        log::info!("Mirroring {added} saved tracks into {mirror}");
        self.execute(&plan).await?;
        Ok(added)
    }

    /// Add the tracks yielded by `source` that the curator's playlist does
    /// not hold yet.
    pub async fn sync_discoveries(
        &self,
        curator: &CuratorConfig,
        source: &mut dyn AsyncPaginatedIterator<String>,
    ) -> Result<usize> {
        let current = playlist_tracks(&self.catalog, &curator.playlist_id, None)
            .collect_all()
            .await?;
        let reference = track_ids(&current);

        let discovered = source.collect_all().await?;
        let candidates = new_discoveries(discovered, &reference);
        log::debug!("{} candidate tracks from {}", candidates.len(), curator.name);

        let plan =
            plan_discovery_sync(&self.catalog, &candidates, &reference, &curator.playlist_id).await?;
        let added = planned_items(&plan);

        log::info!("Adding {added} tracks from {} to {}", curator.name, curator.playlist_id);
        self.execute(&plan).await?;
        Ok(added)
    }

    async fn execute(&self, plan: &MutationPlan) -> Result<()> {
        if self.dry_run {
            for mutation in plan.mutations() {
                log::info!("[dry run] would {mutation}");
            }
            return Ok(());
        }
        let calls = plan.apply(&self.catalog).await?;
        log::debug!("Plan applied in {calls} calls");
        Ok(())
    }
}

fn planned_items(plan: &MutationPlan) -> usize {
    plan.mutations().iter().map(|m| m.len()).sum()
}
