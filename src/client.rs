use crate::config::Config;
use crate::errors::BackendError;
use crate::models::{CreatePlaylistRequest, CreatedPlaylist, GenerateRequest, Playlist};
use std::io::Read;
use tracing::debug;
use ureq::Agent;

const STREAM_PATH: &str = "/api/generate-playlist-stream";
const GENERATE_PATH: &str = "/api/generate-playlist";
const CREATE_PATH: &str = "/api/create-playlist";

/// The three backend calls the generation flow depends on
#[cfg_attr(test, mockall::automock)]
pub trait PlaylistBackend {
    /// Open the incremental generation stream and hand back its body
    fn open_stream(&self, request: &GenerateRequest) -> Result<Box<dyn Read + Send>, BackendError>;

    /// One-shot generation used when streaming fails
    fn generate(&self, request: &GenerateRequest) -> Result<Playlist, BackendError>;

    /// Create the playlist in the user's account
    fn create_playlist(
        &self,
        request: &CreatePlaylistRequest,
    ) -> Result<CreatedPlaylist, BackendError>;
}

/// HTTP client for the playlist generation backend
pub struct BackendClient {
    stream_agent: Agent, // no read timeout: the stream may legitimately idle
    request_agent: Agent,
    base_url: String,
}

impl BackendClient {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> Self {
        let stream_agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .build();
        let request_agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.fallback_timeout)
            .build();

        BackendClient {
            stream_agent,
            request_agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub(crate) fn into_backend_error(error: ureq::Error) -> BackendError {
    match error {
        ureq::Error::Status(code, response) => {
            let body = match response.into_string() {
                Ok(body) => body,
                Err(e) => {
                    debug!(code, error = %e, "could not read error response body");
                    String::new()
                }
            };
            BackendError::Status { code, body }
        }
        ureq::Error::Transport(transport) => BackendError::Transport(transport.to_string()),
    }
}

impl PlaylistBackend for BackendClient {
    fn open_stream(&self, request: &GenerateRequest) -> Result<Box<dyn Read + Send>, BackendError> {
        let url = self.url(STREAM_PATH);
        debug!(%url, "opening generation stream");

        let response = self
            .stream_agent
            .post(&url)
            .set("Accept", "text/event-stream")
            .send_json(request)
            .map_err(into_backend_error)?;

        Ok(Box::new(response.into_reader()))
    }

    fn generate(&self, request: &GenerateRequest) -> Result<Playlist, BackendError> {
        let url = self.url(GENERATE_PATH);
        debug!(%url, "requesting one-shot generation");

        let response = self
            .request_agent
            .post(&url)
            .send_json(request)
            .map_err(into_backend_error)?;

        // A body cut off by the timeout surfaces here as an io error
        let text = response
            .into_string()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn create_playlist(
        &self,
        request: &CreatePlaylistRequest,
    ) -> Result<CreatedPlaylist, BackendError> {
        let url = self.url(CREATE_PATH);
        debug!(%url, tracks = request.track_ids.len(), "creating playlist");

        let response = self
            .request_agent
            .post(&url)
            .send_json(request)
            .map_err(into_backend_error)?;

        let text = response
            .into_string()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        // The create call only has to succeed; an odd body is not a failure
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }
}
