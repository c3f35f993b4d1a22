use crate::models::{Playlist, Track};
use serde::Deserialize;
use thiserror::Error;

/// One unit of generation progress, or its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Status { message: String },
    TrackFound { track: Track, count: usize },
    Complete { playlist: Playlist },
    Error { message: String },
}

/// Why a frame produced no event. Never fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameRejection {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unrecognised event type '{0}'")]
    UnknownKind(String),
}

const KNOWN_KINDS: [&str; 4] = ["status", "track_found", "complete", "error"];

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Status { message: String },
    TrackFound { track: Track, count: usize },
    Complete { playlist: Playlist },
    Error { message: String },
}

/// Decodes frame payloads into `ProgressEvent`s
pub struct EventInterpreter;

impl EventInterpreter {
    pub fn interpret(payload: &str) -> Result<ProgressEvent, FrameRejection> {
        let value: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| FrameRejection::Malformed(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(|kind| kind.as_str())
            .ok_or_else(|| FrameRejection::Malformed("missing 'type' discriminant".to_string()))?;

        if !KNOWN_KINDS.contains(&kind) {
            return Err(FrameRejection::UnknownKind(kind.to_string()));
        }

        let event: WireEvent =
            serde_json::from_value(value).map_err(|e| FrameRejection::Malformed(e.to_string()))?;

        Ok(match event {
            WireEvent::Status { message } => ProgressEvent::Status { message },
            WireEvent::TrackFound { mut track, count } => {
                track.normalize();
                ProgressEvent::TrackFound { track, count }
            }
            WireEvent::Complete { playlist } => ProgressEvent::Complete {
                playlist: playlist.normalized(),
            },
            WireEvent::Error { message } => ProgressEvent::Error { message },
        })
    }
}
