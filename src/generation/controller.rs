use super::fallback::FallbackCaller;
use super::selection::SelectionStore;
use crate::client::PlaylistBackend;
use crate::config::Config;
use crate::errors::{GenerationError, classify_commit_failure};
use crate::models::{CreatePlaylistRequest, CreatedPlaylist, GenerateRequest, Playlist};
use crate::stream::{
    AbandonToken, GenerationProgress, ProgressEvent, SessionOutcome, SessionReport, SessionStats,
    StreamSession,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Streaming,
    StreamingFailed,
    FallbackPending,
    Complete,
    Failed,
}

impl AttemptPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptPhase::Complete | AttemptPhase::Failed)
    }
}

/// The one generation currently owned by the controller
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    pub id: u64,
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub phase: AttemptPhase,
    pub streamed_tracks: usize,
    pub stats: SessionStats,
    abandon: AbandonToken,
}

/// Abandons whichever attempt is current. Cloneable and usable from another thread,
/// e.g. a Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<Mutex<Option<AbandonToken>>>);

impl InterruptHandle {
    fn arm(&self, token: Option<AbandonToken>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = token;
        }
    }

    /// Trip the current attempt's token. False when nothing was running.
    pub fn interrupt(&self) -> bool {
        let token = match self.0.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match token {
            Some(token) => {
                token.abandon();
                true
            }
            None => false,
        }
    }
}

/// Handed out by `begin_attempt`; carries what `run_attempt` needs
#[derive(Debug, Clone)]
pub struct AttemptTicket {
    pub id: u64,
    pub abandon: AbandonToken,
    request: GenerateRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Ready(Playlist),
    Failed(GenerationError),
    Abandoned,
}

/// Result of running an attempt, tagged with the attempt it belongs to
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub attempt_id: u64,
    pub result: AttemptResult,
}

/// Drives stream → fallback → selection, and commits the curated result
pub struct GenerationController<B> {
    backend: B,
    credential: Option<String>,
    store: SelectionStore,
    active: Option<GenerationAttempt>,
    next_attempt_id: u64,
    chunk_size: usize,
    reauth_delay: Duration,
    reauth_due: Option<Instant>,
    interrupt: InterruptHandle,
}

impl<B: PlaylistBackend> GenerationController<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        GenerationController {
            backend,
            credential: config.access_token.clone(),
            store: SelectionStore::new(),
            active: None,
            next_attempt_id: 1,
            chunk_size: config.stream_chunk_size,
            reauth_delay: config.reauth_delay,
            reauth_due: None,
            interrupt: InterruptHandle::default(),
        }
    }

    /// Replace the session credential, e.g. after the user reconnects
    pub fn set_credential(&mut self, credential: Option<String>) {
        self.credential = credential;
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SelectionStore {
        &mut self.store
    }

    pub fn active_attempt(&self) -> Option<&GenerationAttempt> {
        self.active.as_ref()
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    fn require_credential(&self) -> Result<String, GenerationError> {
        match self.credential.as_deref().map(str::trim) {
            Some(credential) if !credential.is_empty() => Ok(credential.to_string()),
            _ => Err(GenerationError::Validation(
                "Please connect your Spotify account first".to_string(),
            )),
        }
    }

    /// Run a whole attempt and load its playlist into the selection store
    pub fn generate(
        &mut self,
        query: &str,
        listener: &mut dyn FnMut(&ProgressEvent, &GenerationProgress),
    ) -> Result<(), GenerationError> {
        let ticket = self.begin_attempt(query)?;
        let outcome = self.run_attempt(&ticket, listener);
        if self.accept(outcome)? {
            Ok(())
        } else {
            Err(GenerationError::Abandoned)
        }
    }

    /// Validate inputs and register a new attempt. No network traffic happens here.
    pub fn begin_attempt(&mut self, query: &str) -> Result<AttemptTicket, GenerationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GenerationError::Validation(
                "Please enter a description for your playlist".to_string(),
            ));
        }
        let credential = self.require_credential()?;

        if self.active.as_ref().is_some_and(|a| !a.phase.is_terminal()) {
            return Err(GenerationError::AttemptInFlight);
        }

        let id = self.next_attempt_id;
        self.next_attempt_id += 1;

        let abandon = AbandonToken::new();
        self.active = Some(GenerationAttempt {
            id,
            query: query.to_string(),
            started_at: Utc::now(),
            phase: AttemptPhase::Streaming,
            streamed_tracks: 0,
            stats: SessionStats::default(),
            abandon: abandon.clone(),
        });
        self.interrupt.arm(Some(abandon.clone()));
        self.store.clear();
        self.reauth_due = None;

        info!(attempt = id, query, "starting playlist generation");
        Ok(AttemptTicket {
            id,
            abandon,
            request: GenerateRequest {
                query: query.to_string(),
                credential,
            },
        })
    }

    /// Stream, and fall back to the one-shot call if the stream yields no playlist
    pub fn run_attempt(
        &mut self,
        ticket: &AttemptTicket,
        listener: &mut dyn FnMut(&ProgressEvent, &GenerationProgress),
    ) -> AttemptOutcome {
        let report = match self.backend.open_stream(&ticket.request) {
            Ok(body) => StreamSession::new(&mut *listener).drive(
                body,
                self.chunk_size,
                &ticket.abandon,
            ),
            Err(e) => SessionReport {
                outcome: SessionOutcome::Exhausted {
                    reason: e.to_string(),
                },
                progress: GenerationProgress::default(),
                stats: Default::default(),
            },
        };

        if let Some(attempt) = self.active.as_mut().filter(|a| a.id == ticket.id) {
            attempt.streamed_tracks = report.progress.count;
            attempt.stats = report.stats;
        }

        let result = match report.outcome {
            SessionOutcome::Completed(playlist) => AttemptResult::Ready(playlist),
            SessionOutcome::Abandoned => AttemptResult::Abandoned,
            failed => {
                if let Some(error) = failed.failure() {
                    // an explicit `error` event also lands here and triggers a second request
                    warn!(attempt = ticket.id, %error, "stream gave no playlist");
                }
                self.set_phase(ticket.id, AttemptPhase::StreamingFailed);

                if ticket.abandon.is_abandoned() {
                    AttemptResult::Abandoned
                } else {
                    self.set_phase(ticket.id, AttemptPhase::FallbackPending);
                    match FallbackCaller::call(&self.backend, &ticket.request) {
                        Ok(playlist) => AttemptResult::Ready(playlist),
                        Err(error) => AttemptResult::Failed(error),
                    }
                }
            }
        };

        // a response that lands after start over is dropped
        let result = if ticket.abandon.is_abandoned() {
            AttemptResult::Abandoned
        } else {
            result
        };

        AttemptOutcome {
            attempt_id: ticket.id,
            result,
        }
    }

    /// Apply an outcome to the store if it still belongs to the current attempt.
    ///
    /// Returns `Ok(false)` when the outcome was stale or abandoned and nothing changed.
    pub fn accept(&mut self, outcome: AttemptOutcome) -> Result<bool, GenerationError> {
        let current = self.active.as_ref().map(|attempt| attempt.id);
        if current != Some(outcome.attempt_id) {
            info!(attempt = outcome.attempt_id, "ignoring result of a replaced attempt");
            return Ok(false);
        }
        self.interrupt.arm(None);

        match outcome.result {
            AttemptResult::Ready(playlist) => {
                self.store.initialize(&playlist);
                self.set_phase(outcome.attempt_id, AttemptPhase::Complete);
                info!(
                    attempt = outcome.attempt_id,
                    tracks = playlist.tracks.len(),
                    "playlist ready"
                );
                Ok(true)
            }
            AttemptResult::Failed(error) => {
                self.set_phase(outcome.attempt_id, AttemptPhase::Failed);
                if error.is_credential_expired() {
                    self.schedule_reauth();
                }
                Err(error)
            }
            AttemptResult::Abandoned => {
                self.set_phase(outcome.attempt_id, AttemptPhase::Failed);
                Ok(false)
            }
        }
    }

    /// Abandon whatever is running and drop the working set
    pub fn start_over(&mut self) {
        if let Some(attempt) = self.active.take() {
            attempt.abandon.abandon();
            info!(attempt = attempt.id, "attempt abandoned");
        }
        self.interrupt.arm(None);
        self.store.clear();
        self.reauth_due = None;
    }

    /// Create the playlist from the current selection
    pub fn commit(
        &mut self,
        name: &str,
        source_query: &str,
    ) -> Result<CreatedPlaylist, GenerationError> {
        let track_ids = self.store.commit_selection();
        if track_ids.is_empty() {
            return Err(GenerationError::Validation(
                "Please select at least one track".to_string(),
            ));
        }
        let credential = self.require_credential()?;

        let name = match name.trim() {
            "" => self.store.playlist_name().to_string(),
            given => given.to_string(),
        };

        let request = CreatePlaylistRequest {
            name,
            track_ids,
            credential,
            description: format!("Generated by Aelyra AI for: \"{source_query}\""),
        };

        info!(name = %request.name, tracks = request.track_ids.len(), "committing playlist");
        match self.backend.create_playlist(&request) {
            Ok(created) => Ok(created),
            Err(e) => {
                let error = classify_commit_failure(e);
                warn!(%error, "playlist creation failed");
                if error.is_credential_expired() {
                    self.schedule_reauth();
                }
                Err(error)
            }
        }
    }

    fn set_phase(&mut self, attempt_id: u64, phase: AttemptPhase) {
        if let Some(attempt) = self.active.as_mut().filter(|a| a.id == attempt_id) {
            attempt.phase = phase;
        }
    }

    fn schedule_reauth(&mut self) {
        self.reauth_due = Some(Instant::now() + self.reauth_delay);
        info!(delay_ms = self.reauth_delay.as_millis() as u64, "re-authentication scheduled");
    }

    /// When the collaborator should move back to the authentication step, if scheduled
    pub fn pending_reauth(&self) -> Option<Instant> {
        self.reauth_due
    }

    /// True once, when the scheduled re-authentication is due at `now`
    pub fn take_due_reauth(&mut self, now: Instant) -> bool {
        match self.reauth_due {
            Some(due) if now >= due => {
                self.reauth_due = None;
                true
            }
            _ => false,
        }
    }
}
