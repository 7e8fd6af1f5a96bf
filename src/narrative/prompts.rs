//! Prompt construction for the personality narrative.

use crate::stats::{Artist, FeatureSummary, Track};

/// Fixed persona, formatting and style rules sent with every generation.
/// The `SUMMARY:` opener is optional on the model's side; the parser treats
/// its absence as a narrative with no summary line.
pub const SYSTEM_INSTRUCTION: &str = r#"# Role
You are a personality analyzer that uses a person's top artists, top tracks, top genres and averaged audio features to decide what the person is like.

# Instructions
1. You will be given the user's top artists, top tracks, top genres and averaged danceability/energy/valence scores from their Spotify.
2. Write a description of their personality in a fun gen z/gen alpha way. Example phrases:
- huzz: girlfriend/boyfriend - find yourself a huzz! (find yourself a partner)
- oh who is you: oh who are you
- get outta here: get out of here
- what the hell brother: what in the world
You don't need to use all of these phrases, but use them where they make sense, and mix in your own.

# Rules
1. Do not use text formatting like bold and italics.
2. You don't need a sentence for each song or artist. Analyze the whole personality from all of the data together. Keep it a maximum of two paragraphs, each at least 5 complete sentences. Remember, you are giving an in-depth analysis of the person's personality based on their Spotify data.
3. You may open with a single line "SUMMARY: <one short phrase capturing the vibe>" followed by a blank line, then the narrative. If you skip it, just write the narrative.

# Output
The description of the person. You can joke around and be a little prick by calling them a sad person or something. It's all in good fun, but it must be grounded in their Spotify data. Well written paragraphs, not fragmented, not too formal.

Dive straight into the description. Do not open with filler like "Ah, diving into your Spotify to find out what makes you, you." Do not close with recommendations for other artists to listen to."#;

/// Build the user prompt: artist names, track/artist pairs, deduplicated
/// genres, and the averaged audio-feature scores.
pub fn build_taste_prompt(
    artists: &[Artist],
    tracks: &[Track],
    genres: &[String],
    features: &FeatureSummary,
) -> String {
    let artist_names = artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let track_pairs = tracks
        .iter()
        .map(|t| match t.primary_artist() {
            Some(artist) => format!("{} - {}", t.name, artist),
            None => t.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let genre_list = genres.join(", ");

    format!(
        "User's top artists are {artists}.\n\
         Top tracks are {tracks}.\n\
         Top genres are {genres}.\n\
         Averaged audio features: danceability {dance:.2}, energy {energy:.2}, valence {valence:.2}.",
        artists = artist_names,
        tracks = track_pairs,
        genres = if genre_list.is_empty() {
            "unknown"
        } else {
            genre_list.as_str()
        },
        dance = features.danceability,
        energy = features.energy,
        valence = features.valence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::types::{Album, TrackArtist};

    fn artist(name: &str) -> Artist {
        Artist {
            id: name.to_lowercase(),
            name: name.to_string(),
            genres: Vec::new(),
            images: Vec::new(),
        }
    }

    fn track(name: &str, by: &str) -> Track {
        Track {
            id: name.to_lowercase(),
            name: name.to_string(),
            artists: vec![TrackArtist {
                id: None,
                name: by.to_string(),
            }],
            album: Album::default(),
        }
    }

    #[test]
    fn test_prompt_embeds_artists_and_track_pairs() {
        let artists = [artist("Sombr"), artist("The Marias")];
        let tracks = [track("Back to Me", "The Marias")];
        let genres = vec!["dream pop".to_string()];
        let features = FeatureSummary {
            danceability: 0.512,
            energy: 0.4,
            valence: 0.25,
        };

        let prompt = build_taste_prompt(&artists, &tracks, &genres, &features);
        assert!(prompt.contains("Sombr, The Marias"));
        assert!(prompt.contains("Back to Me - The Marias"));
        assert!(prompt.contains("dream pop"));
        assert!(prompt.contains("danceability 0.51"));
        assert!(prompt.contains("valence 0.25"));
    }

    #[test]
    fn test_prompt_handles_missing_genres_and_artists() {
        let tracks = [Track {
            id: "t".to_string(),
            name: "Instrumental".to_string(),
            artists: Vec::new(),
            album: Album::default(),
        }];
        let prompt = build_taste_prompt(&[], &tracks, &[], &FeatureSummary::default());
        assert!(prompt.contains("Top genres are unknown"));
        assert!(prompt.contains("Instrumental"));
    }

    #[test]
    fn test_system_instruction_mentions_summary_marker() {
        assert!(SYSTEM_INSTRUCTION.contains("SUMMARY:"));
    }
}
