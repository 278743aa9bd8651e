//! Link Controller - start/stop lifecycle of the sampling session
//!
//! # State Machine
//!
//! ```text
//! Unlinked ──link()──► Linking ──► Linked ──unlink()──► Unlinking ──► Unlinked
//!              │                                            │
//!              └── controller missing / stream error        └── join or suspend failed:
//!                  (back to Unlinked, error returned)           stays Unlinking, retry unlink()
//! ```
//!
//! The sampler runs on its own tokio task and owns the controller source for the
//! session. Unlinking cancels the session token, awaits the task, takes the source
//! back, and suspends it. The cancellation token is the only state shared with the
//! running task.

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::controller::{ControllerSource, SourceError};
use crate::sampling::{
    ReleasePolicy, Sampler, SamplerSettings, SamplingError, SessionReport, SessionStats,
};
use crate::stream::{axes_stream_info, button_stream_info, Clock, OutletFactory, PublishError};

/// Settings applied to every session started by a [`LinkController`]
#[derive(Clone, Debug)]
pub struct LinkSettings {
    /// Prefix of both stream names and source ids
    pub stream_prefix: String,
    /// Host identity embedded in source ids
    pub host: String,
    /// Declared rate of the axes stream in Hz
    pub nominal_rate: f64,
    pub poll_interval: Duration,
    pub release_policy: ReleasePolicy,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            stream_prefix: "xbox_controller_".to_string(),
            host: "unknown".to_string(),
            nominal_rate: 500.0,
            poll_interval: Duration::from_millis(2),
            release_policy: ReleasePolicy::PerButton,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Unlinked,
    Linking,
    Linked,
    Unlinking,
}

/// Errors surfaced by link, unlink and their recovery paths
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Already linked to controller {0}")]
    AlreadyLinked(usize),

    #[error("Link controller is busy ({0:?})")]
    Busy(LinkState),

    #[error("No controller connected at index {index}")]
    NotConnected { index: usize },

    #[error("Could not initialize the controller interface: {0}")]
    SourceError(#[from] SourceError),

    #[error("Could not create output streams: {0}")]
    PublishError(#[from] PublishError),

    #[error("Controller backend is not available")]
    SourceUnavailable,

    #[error("Could not stop the background processing: {0}")]
    JoinError(String),

    #[error("Could not suspend the controller: {0}")]
    SuspendError(SourceError),
}

/// Outcome of a completed session
#[derive(Debug)]
pub struct SessionSummary {
    pub controller_index: usize,
    pub started_at: DateTime<Local>,
    pub stopped_at: DateTime<Local>,
    pub stats: SessionStats,
    /// Set when the sampling loop ended on its own because of a failure
    pub failure: Option<SamplingError>,
}

struct Session {
    controller_index: usize,
    started_at: DateTime<Local>,
    cancel: CancellationToken,
    task: Option<JoinHandle<SessionReport>>,
    outcome: Option<(SessionStats, Result<(), SamplingError>)>,
}

pub struct LinkController {
    // None while a session owns it, or after a failed join
    source: Option<Box<dyn ControllerSource>>,
    outlets: Box<dyn OutletFactory>,
    clock: Arc<dyn Clock>,
    settings: LinkSettings,
    state: LinkState,
    session: Option<Session>,
}

impl LinkController {
    pub fn new(
        source: Box<dyn ControllerSource>,
        outlets: Box<dyn OutletFactory>,
        clock: Arc<dyn Clock>,
        settings: LinkSettings,
    ) -> Self {
        debug!("Creating link controller with settings: {:?}", settings);
        Self {
            source: Some(source),
            outlets,
            clock,
            settings,
            state: LinkState::Unlinked,
            session: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_linked(&self) -> bool {
        self.state == LinkState::Linked
    }

    /// Index of the controller streamed by the current session
    pub fn linked_index(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.controller_index)
    }

    /// Starts streaming controller `index`.
    ///
    /// Must be called from within a tokio runtime. Rejected while a session
    /// exists; on failure the controller stays Unlinked and no sampler runs.
    pub fn link(&mut self, index: usize) -> Result<(), LinkError> {
        match self.state {
            LinkState::Unlinked => {}
            LinkState::Linked => {
                let linked = self.linked_index().unwrap_or(index);
                warn!("Link requested while linked to controller {}, ignoring", linked);
                return Err(LinkError::AlreadyLinked(linked));
            }
            other => {
                warn!("Link requested while {:?}, ignoring", other);
                return Err(LinkError::Busy(other));
            }
        }

        info!("Linking controller {}", index);
        self.state = LinkState::Linking;
        match self.start_session(index) {
            Ok(session) => {
                self.session = Some(session);
                self.state = LinkState::Linked;
                info!("Linked controller {}", index);
                Ok(())
            }
            Err(e) => {
                self.state = LinkState::Unlinked;
                error!("Link failed: {}", e);
                Err(e)
            }
        }
    }

    fn start_session(&mut self, index: usize) -> Result<Session, LinkError> {
        let source = self.source.as_mut().ok_or(LinkError::SourceUnavailable)?;
        let devices = source.refresh();
        let snapshot = source.snapshot(index)?;
        if !snapshot.connected {
            return Err(LinkError::NotConnected { index });
        }

        let model = devices
            .iter()
            .find(|d| d.index == index)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let settings = &self.settings;
        let axes = self.outlets.create(&axes_stream_info(
            &settings.stream_prefix,
            &settings.host,
            settings.nominal_rate,
            &model,
        ))?;
        let buttons = self
            .outlets
            .create(&button_stream_info(&settings.stream_prefix, &settings.host))?;

        let source = self.source.take().ok_or(LinkError::SourceUnavailable)?;
        let sampler = Sampler::create(
            source,
            axes,
            buttons,
            self.clock.clone(),
            SamplerSettings {
                controller_index: index,
                poll_interval: settings.poll_interval,
                release_policy: settings.release_policy,
            },
        )
        .start();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(sampler.run(cancel.clone()));
        debug!("Sampler task spawned for controller {}", index);

        Ok(Session {
            controller_index: index,
            started_at: Local::now(),
            cancel,
            task: Some(task),
            outcome: None,
        })
    }

    /// Stops the session and waits until the sampler has exited.
    ///
    /// Returns `Ok(None)` when nothing is linked. On a join or suspend failure the
    /// controller stays Unlinking; a suspend failure can be retried with another
    /// `unlink`, a lost source with [`recover`](Self::recover).
    pub async fn unlink(&mut self) -> Result<Option<SessionSummary>, LinkError> {
        let Some(session) = self.session.as_mut() else {
            debug!("Unlink requested while unlinked, nothing to do");
            return Ok(None);
        };

        info!("Unlinking controller {}", session.controller_index);
        self.state = LinkState::Unlinking;
        session.cancel.cancel();

        if let Some(task) = session.task.take() {
            match task.await {
                Ok(report) => {
                    debug!("Sampler joined after {} iterations", report.stats.iterations);
                    self.source = Some(report.source);
                    session.outcome = Some((report.stats, report.result));
                }
                Err(e) => {
                    error!("Could not join the sampler task: {}", e);
                    return Err(LinkError::JoinError(e.to_string()));
                }
            }
        }

        let source = self.source.as_mut().ok_or(LinkError::SourceUnavailable)?;
        if let Err(e) = source.suspend() {
            error!("Could not suspend the controller: {}", e);
            return Err(LinkError::SuspendError(e));
        }

        let summary = self.session.take().map(|session| {
            let (stats, result) = session
                .outcome
                .unwrap_or((SessionStats::default(), Ok(())));
            SessionSummary {
                controller_index: session.controller_index,
                started_at: session.started_at,
                stopped_at: Local::now(),
                stats,
                failure: result.err(),
            }
        });
        self.state = LinkState::Unlinked;
        info!("Unlinked");
        Ok(summary)
    }

    /// Completes the unlink of a session whose sampler ended on its own.
    ///
    /// Returns `Ok(None)` while the sampler is still running or nothing is linked.
    pub async fn reap(&mut self) -> Result<Option<SessionSummary>, LinkError> {
        let finished = match &self.session {
            Some(session) if self.state == LinkState::Linked => session
                .task
                .as_ref()
                .map(|task| task.is_finished())
                .unwrap_or(false),
            _ => false,
        };
        if !finished {
            return Ok(None);
        }

        warn!("Sampler ended without an unlink request, closing the session");
        self.unlink().await
    }

    /// Installs a fresh source after a failed join lost the previous one
    pub fn recover(&mut self, source: Box<dyn ControllerSource>) -> Result<(), LinkError> {
        if self.state != LinkState::Unlinking || self.source.is_some() {
            return Err(LinkError::Busy(self.state));
        }
        warn!("Recovering link controller with a new controller source");
        self.source = Some(source);
        self.session = None;
        self.state = LinkState::Unlinked;
        Ok(())
    }
}

impl Drop for LinkController {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
    }
}
