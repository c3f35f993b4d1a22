use crate::client::PlaylistBackend;
use crate::errors::{GenerationError, classify_fallback_failure};
use crate::models::{GenerateRequest, Playlist};
use tracing::{info, warn};

/// One-shot generation used when the stream could not deliver a playlist
pub struct FallbackCaller;

impl FallbackCaller {
    /// Issue exactly one request with the same query and credential as the stream attempt
    pub fn call<B: PlaylistBackend + ?Sized>(
        backend: &B,
        request: &GenerateRequest,
    ) -> Result<Playlist, GenerationError> {
        info!("falling back to one-shot generation");

        match backend.generate(request) {
            Ok(playlist) => {
                info!(tracks = playlist.tracks.len(), name = %playlist.name, "fallback succeeded");
                Ok(playlist.normalized())
            }
            Err(e) => {
                let classified = classify_fallback_failure(e);
                warn!(error = %classified, "fallback failed");
                Err(classified)
            }
        }
    }
}
