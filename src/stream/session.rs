use super::events::{EventInterpreter, FrameRejection, ProgressEvent};
use super::frames::FrameParser;
use crate::errors::GenerationError;
use crate::models::{Playlist, Track};
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Draining,
    Completed,
    Failed,
    Exhausted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Exhausted
        )
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(Playlist),
    Failed { message: String },
    Exhausted { reason: String },
    Abandoned,
}

impl SessionOutcome {
    /// Error form of a failed session; `None` when it completed or was abandoned
    pub fn failure(&self) -> Option<GenerationError> {
        match self {
            SessionOutcome::Failed { message } => {
                Some(GenerationError::StreamDomain(message.clone()))
            }
            SessionOutcome::Exhausted { reason } => {
                Some(GenerationError::StreamTransport(reason.clone()))
            }
            SessionOutcome::Completed(_) | SessionOutcome::Abandoned => None,
        }
    }
}

/// What the UI shows while tracks trickle in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationProgress {
    pub status: Option<String>,
    pub found: Vec<Track>,
    pub count: usize,
}

impl GenerationProgress {
    fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Status { message } => self.status = Some(message.clone()),
            ProgressEvent::TrackFound { track, count } => {
                self.found.push(track.clone());
                self.count = *count;
                self.status = Some(format!("Found {count} tracks..."));
            }
            ProgressEvent::Complete { .. } | ProgressEvent::Error { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub chunks: usize,
    pub frames: usize,
    pub dropped_frames: usize,
    pub truncated_bytes: usize,
}

/// Shared flag used to abandon an attempt from outside the read loop
#[derive(Debug, Clone, Default)]
pub struct AbandonToken(Arc<AtomicBool>);

impl AbandonToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abandon(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_abandoned(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a finished session hands back to its caller
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub progress: GenerationProgress,
    pub stats: SessionStats,
}

/// Consumes one generation stream, reporting each applied event to `listener`
pub struct StreamSession<L> {
    parser: FrameParser,
    state: SessionState,
    progress: GenerationProgress,
    stats: SessionStats,
    outcome: Option<SessionOutcome>,
    listener: L,
}

impl<L> StreamSession<L>
where
    L: FnMut(&ProgressEvent, &GenerationProgress),
{
    pub fn new(listener: L) -> Self {
        StreamSession {
            parser: FrameParser::new(),
            state: SessionState::Open,
            progress: GenerationProgress::default(),
            stats: SessionStats::default(),
            outcome: None,
            listener,
        }
    }

    /// Apply one chunk of the body. Ignored once the session is terminal.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.state.is_terminal() {
            return;
        }

        self.stats.chunks += 1;
        self.state = SessionState::Draining;

        for payload in self.parser.push(chunk) {
            self.stats.frames += 1;
            match EventInterpreter::interpret(&payload) {
                Ok(event) => self.apply(event),
                Err(rejection @ FrameRejection::UnknownKind(_)) => {
                    self.stats.dropped_frames += 1;
                    debug!(%rejection, "skipping frame");
                }
                Err(rejection) => {
                    self.stats.dropped_frames += 1;
                    warn!(%rejection, "skipping frame");
                }
            }

            if self.state.is_terminal() {
                break; // first terminal event wins, the rest of the chunk is discarded
            }
        }

        if !self.state.is_terminal() {
            self.state = SessionState::Open;
        }
    }

    /// The body ended. Without a terminal event the session is exhausted.
    pub fn end_of_stream(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.stats.truncated_bytes = self.parser.finish();
        self.exhaust("stream ended before completion".to_string());
    }

    /// Reading the body failed
    pub fn transport_failed(&mut self, reason: String) {
        if self.state.is_terminal() {
            return;
        }
        self.stats.truncated_bytes = self.parser.finish();
        self.exhaust(reason);
    }

    /// Read `reader` chunk by chunk until a terminal state, end of body, or abandonment
    pub fn drive<R: Read>(
        mut self,
        mut reader: R,
        chunk_size: usize,
        abandon: &AbandonToken,
    ) -> SessionReport {
        let mut buf = vec![0u8; chunk_size.max(1)];

        while !self.state.is_terminal() {
            if abandon.is_abandoned() {
                info!("generation stream abandoned");
                self.stats.truncated_bytes = self.parser.finish();
                return self.into_report_with(SessionOutcome::Abandoned);
            }

            match reader.read(&mut buf) {
                Ok(0) => self.end_of_stream(),
                Ok(n) => self.feed(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => self.transport_failed(e.to_string()),
            }
        }

        self.into_report()
    }

    pub fn into_report(self) -> SessionReport {
        let outcome = self.outcome.clone().unwrap_or(SessionOutcome::Exhausted {
            reason: "session did not finish".to_string(),
        });
        self.into_report_with(outcome)
    }

    fn into_report_with(self, outcome: SessionOutcome) -> SessionReport {
        debug!(
            chunks = self.stats.chunks,
            frames = self.stats.frames,
            dropped = self.stats.dropped_frames,
            "stream session finished"
        );
        SessionReport {
            outcome,
            progress: self.progress,
            stats: self.stats,
        }
    }

    fn apply(&mut self, event: ProgressEvent) {
        self.progress.apply(&event);
        (self.listener)(&event, &self.progress);

        match event {
            ProgressEvent::Complete { playlist } => {
                info!(tracks = playlist.tracks.len(), name = %playlist.name, "stream completed");
                self.state = SessionState::Completed;
                self.outcome = Some(SessionOutcome::Completed(playlist));
            }
            ProgressEvent::Error { message } => {
                warn!(%message, "stream reported an error");
                self.state = SessionState::Failed;
                self.outcome = Some(SessionOutcome::Failed { message });
            }
            ProgressEvent::Status { .. } | ProgressEvent::TrackFound { .. } => {}
        }
    }

    fn exhaust(&mut self, reason: String) {
        warn!(%reason, found = self.progress.count, "stream exhausted");
        self.state = SessionState::Exhausted;
        self.outcome = Some(SessionOutcome::Exhausted { reason });
    }
}

#[cfg(test)]
impl<L> StreamSession<L> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn progress(&self) -> &GenerationProgress {
        &self.progress
    }
}
