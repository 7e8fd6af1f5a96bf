//! Spotify top-statistics client: top artists, top tracks, per-track audio
//! features, and the small aggregations the narrative prompt needs.

pub mod client;
pub mod types;

pub use client::{StatsClient, StatsError};
pub use types::{
    top_genres, Artist, AudioFeatures, FeatureSummary, TimeRange, Track,
};
