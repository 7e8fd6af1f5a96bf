use thiserror::Error;

use crate::session::AuthError;
use crate::stats::StatsError;

/// Errors that surface as the visible error state. Narrative failures are
/// deliberately absent: they degrade to a missing narrative, never to this.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// View state of the result flow. One tagged value instead of scattered
/// loading/error flags; transitions are pure and testable without any UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    #[default]
    Unauthenticated,
    /// Login started; waiting for the external redirect to come back.
    SessionResolving,
    /// Session established; artist and track fetches in flight.
    StatsFetching,
    /// Both lists arrived; narrative still pending.
    StatsReady,
    /// Narrative arrived or was declared unavailable. Stats are renderable
    /// either way.
    Complete,
    /// Terminal until the user retries via sign-out and a new login.
    Error(FlowError),
    /// Explicit sign-out. Terminal.
    LoggedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    LoginStarted,
    SessionEstablished,
    /// The session disappeared out from under us (expiry, provider push).
    SessionLost,
    AuthFailed(AuthError),
    StatsReceived,
    StatsFailed(StatsError),
    NarrativeReceived,
    NarrativeFailed,
    TimeRangeChanged,
    SignedOut,
}

impl ViewState {
    /// Pure transition function. Events that make no sense in the current
    /// state leave it unchanged.
    pub fn apply(self, event: &FlowEvent) -> ViewState {
        use FlowEvent::*;
        use ViewState::*;

        match (self, event) {
            (_, SignedOut) => LoggedOut,
            (LoggedOut, _) => LoggedOut,
            // An error screen stays up even if the session expires under it;
            // the only way out is sign-out and a fresh login.
            (state @ Error(_), SessionLost) => state,
            (_, SessionLost) => Unauthenticated,

            (Unauthenticated, LoginStarted) => SessionResolving,
            (SessionResolving, SessionEstablished) => StatsFetching,
            (SessionResolving, AuthFailed(e)) => Error(FlowError::Auth(e.clone())),
            (StatsFetching, StatsReceived) => StatsReady,
            (StatsFetching, StatsFailed(e)) => Error(FlowError::Stats(e.clone())),
            (StatsReady, NarrativeReceived) => Complete,
            (StatsReady, NarrativeFailed) => Complete,
            (Complete, TimeRangeChanged) => StatsFetching,

            (state, _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ViewState::Error(_) | ViewState::LoggedOut)
    }
}
