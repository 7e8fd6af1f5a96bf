use std::collections::HashMap;
use std::future::Future;

use tracing::info;

use super::generator::NarrativeError;
use super::{parse_narrative, NarrativeResult};
use crate::stats::{Artist, Track};

/// Cache key for a fetched (artist-list, track-list) pair. Order matters:
/// the lists are rank-ordered, so a reordering is a different input.
pub fn fingerprint(artists: &[Artist], tracks: &[Track]) -> String {
    let artist_ids = artists
        .iter()
        .map(|a| a.id.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let track_ids = tracks
        .iter()
        .map(|t| t.id.as_str())
        .collect::<Vec<_>>()
        .join(",");
    format!("{}|{}", artist_ids, track_ids)
}

/// In-memory cache guaranteeing at most one generation per input pair.
///
/// The external service is non-deterministic, so the first successful result
/// is kept and reused. Failed generations are not cached; the next attempt
/// (after a user-triggered refetch) calls out again.
#[derive(Debug, Default)]
pub struct NarrativeCache {
    entries: HashMap<String, NarrativeResult>,
}

impl NarrativeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&NarrativeResult> {
        self.entries.get(key)
    }

    /// Return the cached narrative for `key`, or run `generate`, parse its
    /// output and cache it. `generate` is not invoked on a hit.
    pub async fn get_or_generate<F, Fut>(
        &mut self,
        key: &str,
        generate: F,
    ) -> Result<NarrativeResult, NarrativeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, NarrativeError>>,
    {
        if let Some(hit) = self.entries.get(key) {
            info!("Narrative cache hit");
            return Ok(hit.clone());
        }

        let raw = generate().await?;
        let parsed = parse_narrative(&raw);
        self.entries.insert(key.to_string(), parsed.clone());
        Ok(parsed)
    }

    /// Drop everything. Called on time-range change and sign-out.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
