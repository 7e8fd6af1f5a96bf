use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

use super::state::{FlowEvent, ViewState};
use crate::narrative::cache::fingerprint;
use crate::narrative::{Generator, NarrativeCache, NarrativeResult};
use crate::narrative::prompts;
use crate::session::{AuthError, Session, SessionProvider};
use crate::stats::{top_genres, Artist, FeatureSummary, StatsClient, TimeRange, Track};

/// The "show the full result view" predicate: both lists non-empty and
/// nothing still in flight. Anything less renders as loading.
pub fn ready_to_render(
    artists: &[Artist],
    tracks: &[Track],
    stats_in_flight: bool,
    narrative_in_flight: bool,
) -> bool {
    !artists.is_empty() && !tracks.is_empty() && !stats_in_flight && !narrative_in_flight
}

/// Coordinates the session provider, statistics client and narrative
/// generator, and owns the view state plus all fetched data.
///
/// Everything runs on the caller's task; the only shared piece is the
/// session provider, whose epoch doubles as the staleness token: results of
/// a fetch started under an older epoch are discarded, never committed.
pub struct Orchestrator {
    session: Arc<SessionProvider>,
    session_changes: watch::Receiver<Option<Session>>,
    stats: StatsClient,
    generator: Generator,
    cache: NarrativeCache,

    state: ViewState,
    time_range: TimeRange,
    limit: u32,

    artists: Vec<Artist>,
    tracks: Vec<Track>,
    genres: Vec<String>,
    features: FeatureSummary,
    narrative: Option<NarrativeResult>,
    stats_in_flight: bool,
    narrative_in_flight: bool,
}

impl Orchestrator {
    pub fn new(
        session: Arc<SessionProvider>,
        stats: StatsClient,
        generator: Generator,
        limit: u32,
    ) -> Self {
        let session_changes = session.subscribe();
        Self {
            session,
            session_changes,
            stats,
            generator,
            cache: NarrativeCache::new(),
            state: ViewState::default(),
            time_range: TimeRange::default(),
            limit,
            artists: Vec::new(),
            tracks: Vec::new(),
            genres: Vec::new(),
            features: FeatureSummary::default(),
            narrative: None,
            stats_in_flight: false,
            narrative_in_flight: false,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn features(&self) -> FeatureSummary {
        self.features
    }

    pub fn narrative(&self) -> Option<&NarrativeResult> {
        self.narrative.as_ref()
    }

    pub fn ready_to_render(&self) -> bool {
        ready_to_render(
            &self.artists,
            &self.tracks,
            self.stats_in_flight,
            self.narrative_in_flight,
        )
    }

    pub fn apply(&mut self, event: FlowEvent) {
        let next = self.state.clone().apply(&event);
        if next != self.state {
            info!("View state: {:?} -> {:?} on {:?}", self.state, next, event);
            self.state = next;
        }
    }

    /// Start the login flow and hand back the authorization URL for the
    /// caller to navigate to.
    pub fn begin_login(&mut self, scopes: &str) -> Url {
        self.apply(FlowEvent::LoginStarted);
        self.session.authorize_url(scopes)
    }

    /// Resolve the pasted redirect into a session.
    pub async fn resolve_session(&mut self, redirect: &str) -> Result<(), AuthError> {
        match self.session.establish_from_redirect(redirect).await {
            Ok(_) => {
                self.apply(FlowEvent::SessionEstablished);
                Ok(())
            }
            Err(e) => {
                self.apply(FlowEvent::AuthFailed(e.clone()));
                Err(e)
            }
        }
    }

    /// Pick up any session change published since the last check. A cleared
    /// session wipes fetched data so nothing stale can render.
    pub fn sync_session(&mut self) {
        if !self.session_changes.has_changed().unwrap_or(false) {
            return;
        }
        let lost = self.session_changes.borrow_and_update().is_none();
        if lost && !matches!(self.state, ViewState::LoggedOut) {
            warn!("Session disappeared; clearing fetched data");
            self.clear_data();
            self.apply(FlowEvent::SessionLost);
        }
    }

    /// Run the full fetch sequence: top artists and top tracks concurrently
    /// (a join — both must succeed), then audio features best-effort, then
    /// the narrative through the once-per-pair cache.
    pub async fn run_fetch(&mut self) {
        let Some(session) = self.session.current() else {
            self.apply(FlowEvent::SessionLost);
            return;
        };
        let token = session.provider_token.unwrap_or_default();
        let epoch = self.session.epoch();

        self.stats_in_flight = true;
        let (artists, tracks) = tokio::join!(
            self.stats.top_artists(&token, self.time_range, self.limit),
            self.stats.top_tracks(&token, self.time_range, self.limit),
        );
        self.stats_in_flight = false;

        let (artists, tracks) = match (artists, tracks) {
            (Ok(a), Ok(t)) => (a, t),
            (Err(e), _) | (_, Err(e)) => {
                // Even the error is stale if the session moved underneath us.
                if self.session.epoch() == epoch {
                    self.apply(FlowEvent::StatsFailed(e));
                }
                return;
            }
        };

        if !self.commit_stats(epoch, artists, tracks) {
            return;
        }

        self.finish_fetch(&token, epoch).await;
    }

    /// The tail of the fetch sequence: audio features, then the narrative.
    /// Separated from `run_fetch` so the degradation contract is testable
    /// against already-committed lists.
    pub async fn finish_fetch(&mut self, token: &str, epoch: u64) {
        // Best-effort: a failure here degrades to the zero summary and must
        // not block the narrative.
        let ids: Vec<String> = self.tracks.iter().map(|t| t.id.clone()).collect();
        let feature_map = match self.stats.audio_features(token, &ids).await {
            Ok(map) => map,
            Err(e) => {
                warn!("Audio features unavailable, continuing without: {}", e);
                Default::default()
            }
        };
        if self.session.epoch() != epoch {
            info!("Discarding stale audio features");
            self.clear_data();
            return;
        }
        self.features = FeatureSummary::mean(feature_map.values());

        self.generate_narrative(epoch).await;
    }

    /// Commit fetched lists if the session epoch still matches the one the
    /// fetch started under. Returns false (and discards) otherwise.
    pub fn commit_stats(&mut self, epoch: u64, artists: Vec<Artist>, tracks: Vec<Track>) -> bool {
        if self.session.epoch() != epoch {
            info!("Discarding stale statistics fetch (epoch moved)");
            return false;
        }
        self.genres = top_genres(&artists);
        self.artists = artists;
        self.tracks = tracks;
        self.apply(FlowEvent::StatsReceived);
        true
    }

    async fn generate_narrative(&mut self, epoch: u64) {
        let key = fingerprint(&self.artists, &self.tracks);
        let prompt =
            prompts::build_taste_prompt(&self.artists, &self.tracks, &self.genres, &self.features);

        self.narrative_in_flight = true;
        let generator = &self.generator;
        let result = self
            .cache
            .get_or_generate(&key, || async move { generator.generate(&prompt).await })
            .await;
        self.narrative_in_flight = false;

        if self.session.epoch() != epoch {
            info!("Discarding stale narrative");
            self.clear_data();
            return;
        }

        match result {
            Ok(narrative) => {
                self.narrative = Some(narrative);
                self.apply(FlowEvent::NarrativeReceived);
            }
            Err(e) => {
                warn!("Narrative unavailable: {}", e);
                self.narrative = None;
                self.apply(FlowEvent::NarrativeFailed);
            }
        }
    }

    /// Switch the aggregation window: clears every piece of displayed data
    /// and the narrative cache, then re-runs the fetch sequence.
    pub async fn change_time_range(&mut self, range: TimeRange) {
        self.reset_for_time_range(range);
        self.run_fetch().await;
    }

    /// The clearing half of a time-range change, separated so the reset
    /// semantics are testable without network access.
    pub fn reset_for_time_range(&mut self, range: TimeRange) {
        info!("Time range changed to {}", range.label());
        self.time_range = range;
        self.clear_data();
        self.cache.clear();
        self.apply(FlowEvent::TimeRangeChanged);
    }

    /// Explicit sign-out: provider-side logout, local wipe, terminal state.
    pub async fn sign_out(&mut self) {
        self.session.sign_out().await;
        self.clear_data();
        self.cache.clear();
        self.apply(FlowEvent::SignedOut);
    }

    fn clear_data(&mut self) {
        self.artists.clear();
        self.tracks.clear();
        self.genres.clear();
        self.features = FeatureSummary::default();
        self.narrative = None;
    }
}
