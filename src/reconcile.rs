//! Reconciliation policies and batched mutation plans.
//!
//! Every policy is keyed on track id and is idempotent: planning against
//! collections that already agree produces an empty plan. Plans are applied
//! in order, one call per batch, and nothing is rolled back when a call
//! fails part way; re-running the policy is the recovery path.

use crate::catalog::{lookup_tracks, CatalogClient};
use crate::chunk::Chunker;
use crate::types::{ListEntry, RetentionPolicy, Track};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// One logical mutation. Batching happens when the plan is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Save track ids to the user's library
    SaveToLibrary { ids: Vec<String> },
    /// Append track uris to a playlist
    AddToPlaylist { playlist_id: String, uris: Vec<String> },
    /// Remove track uris from a playlist
    RemoveFromPlaylist { playlist_id: String, uris: Vec<String> },
}

impl Mutation {
    pub fn len(&self) -> usize {
        match self {
            Mutation::SaveToLibrary { ids } => ids.len(),
            Mutation::AddToPlaylist { uris, .. } | Mutation::RemoveFromPlaylist { uris, .. } => {
                uris.len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mutation::SaveToLibrary { ids } => write!(f, "save {} tracks to library", ids.len()),
            Mutation::AddToPlaylist { playlist_id, uris } => {
                write!(f, "add {} tracks to playlist {playlist_id}", uris.len())
            }
            Mutation::RemoveFromPlaylist { playlist_id, uris } => {
                write!(f, "remove {} tracks from playlist {playlist_id}", uris.len())
            }
        }
    }
}

/// Ordered list of mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationPlan {
    mutations: Vec<Mutation>,
}

impl MutationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mutation; empty mutations are dropped.
    pub fn push(&mut self, mutation: Mutation) {
        if !mutation.is_empty() {
            self.mutations.push(mutation);
        }
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Apply every mutation in order, batched under the client's ceilings.
    ///
    /// # Returns
    /// The number of calls issued. An empty plan issues none.
    pub async fn apply<C: CatalogClient + ?Sized>(&self, client: &C) -> Result<usize> {
        let limits = client.batch_limits();
        let mut calls = 0;

        for mutation in &self.mutations {
            log::info!("Applying: {mutation}");
            match mutation {
                Mutation::SaveToLibrary { ids } => {
                    for batch in Chunker::new(ids.iter().cloned(), limits.library_mutation)? {
                        client.save_tracks(&batch).await?;
                        calls += 1;
                    }
                }
                Mutation::AddToPlaylist { playlist_id, uris } => {
                    for batch in Chunker::new(uris.iter().cloned(), limits.playlist_mutation)? {
                        client.add_playlist_tracks(playlist_id, &batch).await?;
                        calls += 1;
                    }
                }
                Mutation::RemoveFromPlaylist { playlist_id, uris } => {
                    for batch in Chunker::new(uris.iter().cloned(), limits.playlist_mutation)? {
                        client.remove_playlist_tracks(playlist_id, &batch).await?;
                        calls += 1;
                    }
                }
            }
        }
        Ok(calls)
    }
}

/// Uris of `candidates` whose id is not in `existing`, in candidate order,
/// each id at most once.
pub fn missing_uris<'a>(
    candidates: impl IntoIterator<Item = &'a Track>,
    existing: &HashSet<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|track| !existing.contains(&track.id) && seen.insert(track.id.clone()))
        .map(|track| track.uri.clone())
        .collect()
}

/// Ids of a collection, for membership checks.
pub fn track_ids<'a>(entries: impl IntoIterator<Item = &'a ListEntry>) -> HashSet<String> {
    entries.into_iter().map(|entry| entry.track.id.clone()).collect()
}

/// Append-only sync of saved tracks into a mirror playlist.
///
/// `saved` should already be in chronological order; additions keep it.
pub fn plan_mirror_sync(
    saved: &[ListEntry],
    mirror: &[ListEntry],
    mirror_playlist_id: &str,
) -> MutationPlan {
    let uris = missing_uris(saved.iter().map(|e| &e.track), &track_ids(mirror));
    log::debug!("{} saved tracks missing from mirror {mirror_playlist_id}", uris.len());

    let mut plan = MutationPlan::new();
    plan.push(Mutation::AddToPlaylist {
        playlist_id: mirror_playlist_id.to_string(),
        uris,
    });
    plan
}

/// Entries selected for eviction and the plan that evicts them.
#[derive(Debug, Clone, Default)]
pub struct RetentionPlan {
    /// Evicted entries, oldest first
    pub evicted: Vec<ListEntry>,
    pub plan: MutationPlan,
}

/// Move entries older than the retention window into the library.
///
/// An entry is evicted when `added_at <= now - window`. Evicted entries are
/// sorted oldest first, saved to the library, then removed from the
/// playlist, so an interrupted run has always handled the oldest items.
pub fn plan_retention_pruning(
    entries: &[ListEntry],
    playlist_id: &str,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionPlan {
    let cutoff = now - policy.window;
    let mut evicted: Vec<ListEntry> = entries
        .iter()
        .filter(|entry| entry.added_at <= cutoff)
        .cloned()
        .collect();
    evicted.sort_by_key(|entry| entry.added_at);

    let mut seen = HashSet::new();
    let (ids, uris): (Vec<String>, Vec<String>) = evicted
        .iter()
        .filter(|entry| seen.insert(entry.track.id.clone()))
        .map(|entry| (entry.track.id.clone(), entry.track.uri.clone()))
        .unzip();

    let mut plan = MutationPlan::new();
    plan.push(Mutation::SaveToLibrary { ids });
    plan.push(Mutation::RemoveFromPlaylist {
        playlist_id: playlist_id.to_string(),
        uris,
    });
    RetentionPlan { evicted, plan }
}

/// Discovered ids not yet in the reference collection, first-seen order,
/// repeats dropped.
pub fn new_discoveries(
    discovered: impl IntoIterator<Item = String>,
    reference: &HashSet<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    discovered
        .into_iter()
        .filter(|id| !reference.contains(id) && seen.insert(id.clone()))
        .collect()
}

/// Resolve candidate ids and plan one add to the destination playlist.
///
/// Lookups are batched under the server ceiling. Resolved tracks are
/// filtered again by id because the catalog may answer with a relinked
/// track that the playlist already holds.
pub async fn plan_discovery_sync<C: CatalogClient + ?Sized>(
    client: &C,
    candidate_ids: &[String],
    reference: &HashSet<String>,
    playlist_id: &str,
) -> Result<MutationPlan> {
    let tracks = lookup_tracks(client, candidate_ids).await?;
    let uris = missing_uris(&tracks, reference);
    log::debug!(
        "{} of {} candidates resolved to new tracks for {playlist_id}",
        uris.len(),
        candidate_ids.len()
    );

    let mut plan = MutationPlan::new();
    plan.push(Mutation::AddToPlaylist {
        playlist_id: playlist_id.to_string(),
        uris,
    });
    Ok(plan)
}
