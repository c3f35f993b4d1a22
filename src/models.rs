use serde::{Deserialize, Deserializer, Serialize};

/// A track occupying a playlist slot, as delivered by the generation backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "spotify_id")]
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(rename = "album_art", default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub alternatives: Vec<AlternativeTrack>,
}

/// Another catalog match for a slot. Never carries alternatives of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeTrack {
    #[serde(rename = "spotify_id")]
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(rename = "album_art", default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Result of one generation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(rename = "playlist_name")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tracks: Vec<Track>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Track {
    /// Copy of this track without its alternatives, used when it is pushed out of its slot
    pub fn demote(&self) -> AlternativeTrack {
        AlternativeTrack {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            artwork_url: self.artwork_url.clone(),
            preview_url: self.preview_url.clone(),
        }
    }

    /// Drop alternatives that repeat the main id or an earlier alternative
    pub fn normalize(&mut self) {
        let mut seen = std::collections::HashSet::new();
        seen.insert(self.id.clone());
        self.alternatives.retain(|alt| seen.insert(alt.id.clone()));
    }
}

impl AlternativeTrack {
    /// Promote this alternative to a main track owning the given alternatives
    pub fn promote(self, alternatives: Vec<AlternativeTrack>) -> Track {
        Track {
            id: self.id,
            title: self.title,
            artist: self.artist,
            artwork_url: self.artwork_url,
            preview_url: self.preview_url,
            alternatives,
        }
    }
}

impl Playlist {
    /// Apply `Track::normalize` to every slot
    pub fn normalized(mut self) -> Self {
        for track in &mut self.tracks {
            track.normalize();
        }
        self
    }
}

/// Request body shared by the streaming and one-shot generation endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub query: String,
    #[serde(rename = "spotify_access_token")]
    pub credential: String,
}

/// Request body for the create-playlist endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub track_ids: Vec<String>,
    #[serde(rename = "spotify_access_token")]
    pub credential: String,
    pub description: String,
}

/// Response from the create-playlist endpoint. Every field is optional; only success matters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreatedPlaylist {
    pub playlist_id: Option<String>,
    pub playlist_url: Option<String>,
    pub message: Option<String>,
}
