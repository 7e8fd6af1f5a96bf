use serde::{Deserialize, Serialize};

/// Statistics aggregation window. Wire values follow the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    LastMonth,
    #[default]
    LastSixMonths,
    AllTime,
}

impl TimeRange {
    pub const ALL: [TimeRange; 3] = [
        TimeRange::LastMonth,
        TimeRange::LastSixMonths,
        TimeRange::AllTime,
    ];

    pub fn as_param(self) -> &'static str {
        match self {
            TimeRange::LastMonth => "short_term",
            TimeRange::LastSixMonths => "medium_term",
            TimeRange::AllTime => "long_term",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeRange::LastMonth => "last month",
            TimeRange::LastSixMonths => "last six months",
            TimeRange::AllTime => "all time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// One top-artist entry, in upstream rank order (most listened first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub images: Vec<Image>,
}

/// One top-track entry, in upstream rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<TrackArtist>,
    #[serde(default)]
    pub album: Album,
}

impl Track {
    /// The credited (first-listed) artist name, if any.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }
}

/// Per-track derived signals, each normalized to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: String,
    pub danceability: f32,
    pub energy: f32,
    pub valence: f32,
}

/// Arithmetic means of the audio features across a track set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureSummary {
    pub danceability: f32,
    pub energy: f32,
    pub valence: f32,
}

impl FeatureSummary {
    /// Mean per axis. An empty input yields the zero summary, never NaN.
    pub fn mean<'a>(features: impl IntoIterator<Item = &'a AudioFeatures>) -> Self {
        let mut sum = FeatureSummary::default();
        let mut count = 0u32;
        for f in features {
            sum.danceability += f.danceability;
            sum.energy += f.energy;
            sum.valence += f.valence;
            count += 1;
        }
        if count == 0 {
            return FeatureSummary::default();
        }
        let n = count as f32;
        FeatureSummary {
            danceability: sum.danceability / n,
            energy: sum.energy / n,
            valence: sum.valence / n,
        }
    }
}

/// Genre tags across the artist list, deduplicated in first-seen order.
pub fn top_genres(artists: &[Artist]) -> Vec<String> {
    let mut seen = Vec::new();
    for artist in artists {
        for genre in &artist.genres {
            if !seen.iter().any(|g: &String| g == genre) {
                seen.push(genre.clone());
            }
        }
    }
    seen
}

/// Paged response wrapper; only the `items` array matters here.
#[derive(Debug, Deserialize)]
pub(crate) struct Paging<T> {
    // Spelled as a function so the derive doesn't demand `T: Default`.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}
