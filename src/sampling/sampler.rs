//! Sampling loop with statum state machine
//!
//! # State Machine
//!
//! ```text
//! Ready ──start()──► Streaming ──run()──► Finished ──into_report()──► SessionReport
//! ```
//!
//! One iteration polls the controller, takes a single timestamp, pushes the axes
//! sample and then any button presses in index order, all stamped with that
//! timestamp. A disconnected controller skips emission without ending the
//! session. The sleep between iterations is the only suspension point and the
//! only place cancellation is observed.

use chrono::Local;
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::controller::{ButtonId, ControllerSource, SourceError};
use crate::stream::{Clock, PublishError, StreamOutlet};

use super::edge_detector::{EdgeDetector, ReleasePolicy};

// Sampler settings
#[derive(Clone, Debug)]
pub struct SamplerSettings {
    pub controller_index: usize,
    pub poll_interval: Duration,
    pub release_policy: ReleasePolicy,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            controller_index: 0,
            poll_interval: Duration::from_millis(2),
            release_policy: ReleasePolicy::PerButton,
        }
    }
}

// Errors that end a session
#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    #[error("Controller read failed: {0}")]
    SourceError(#[from] SourceError),

    #[error("Publishing failed: {0}")]
    PublishError(#[from] PublishError),
}

/// Counters for one session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub iterations: u64,
    pub disconnected_iterations: u64,
    pub axes_samples: u64,
    pub button_events: u64,
}

/// What a finished sampler hands back to the link controller
pub struct SessionReport {
    pub source: Box<dyn ControllerSource>,
    pub stats: SessionStats,
    pub result: Result<(), SamplingError>,
}

#[state]
#[derive(Debug, Clone)]
pub enum SamplerState {
    Ready,
    Streaming,
    Finished,
}

#[machine]
pub struct Sampler<S: SamplerState> {
    source: Box<dyn ControllerSource>,
    axes_outlet: Box<dyn StreamOutlet>,
    buttons_outlet: Box<dyn StreamOutlet>,
    clock: Arc<dyn Clock>,
    edges: EdgeDetector,
    settings: SamplerSettings,
    stats: SessionStats,

    // Last observed connectivity, for logging transitions only
    connected: Option<bool>,
}

impl<S: SamplerState> Sampler<S> {
    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}

impl Sampler<Ready> {
    pub fn create(
        source: Box<dyn ControllerSource>,
        axes_outlet: Box<dyn StreamOutlet>,
        buttons_outlet: Box<dyn StreamOutlet>,
        clock: Arc<dyn Clock>,
        settings: SamplerSettings,
    ) -> Self {
        debug!("Creating sampler with settings: {:?}", settings);
        let edges = EdgeDetector::new(settings.release_policy);
        Self::new(
            source,
            axes_outlet,
            buttons_outlet,
            clock,
            edges,
            settings,
            SessionStats::default(),
            None,
        )
    }

    /// Resets the edge state and transitions to Streaming
    pub fn start(mut self) -> Sampler<Streaming> {
        self.edges = EdgeDetector::new(self.settings.release_policy);
        self.stats = SessionStats::default();
        info!(
            "Sampler streaming controller {} every {:?} ({:?} release)",
            self.settings.controller_index,
            self.settings.poll_interval,
            self.edges.policy()
        );
        self.transition()
    }
}

impl Sampler<Streaming> {
    /// Runs one poll → publish cycle
    pub fn run_iteration(&mut self) -> Result<(), SamplingError> {
        let snapshot = self.source.snapshot(self.settings.controller_index)?;
        let now = self.clock.now();
        self.stats.iterations += 1;

        if self.connected != Some(snapshot.connected) {
            if snapshot.connected {
                info!("Controller {} connected", self.settings.controller_index);
            } else {
                warn!(
                    "Controller {} disconnected, pausing emission",
                    self.settings.controller_index
                );
            }
            self.connected = Some(snapshot.connected);
        }

        if !snapshot.connected {
            self.stats.disconnected_iterations += 1;
            return Ok(());
        }

        self.axes_outlet.push_sample(&snapshot.axes(), now)?;
        self.stats.axes_samples += 1;

        for button in ButtonId::ALL {
            if let Some(pressed) = self.edges.on_sample(button, snapshot.is_pressed(button)) {
                debug!("Button {:?} pressed at {:.6}", pressed, now);
                self.buttons_outlet
                    .push_sample(&[pressed.index() as f32], now)?;
                self.stats.button_events += 1;
            }
        }

        Ok(())
    }

    /// Iterates until `cancel` fires or an iteration fails
    pub async fn run(mut self, cancel: CancellationToken) -> SessionReport {
        info!("Starting sampling loop");

        let mut last_log_time = Local::now();
        let mut last_logged = self.stats;
        let log_interval = chrono::Duration::seconds(10);

        let result = loop {
            if cancel.is_cancelled() {
                break Ok(());
            }

            if let Err(e) = self.run_iteration() {
                error!("Sampling loop terminated with error: {}", e);
                break Err(e);
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Sampler stats: {} iterations, {} axes samples, {} button events in last {} seconds",
                    self.stats.iterations - last_logged.iterations,
                    self.stats.axes_samples - last_logged.axes_samples,
                    self.stats.button_events - last_logged.button_events,
                    log_interval.num_seconds()
                );
                last_logged = self.stats;
                last_log_time = now;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Cancellation observed during sleep");
                    break Ok(());
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        };

        info!(
            "Sampling loop finished after {} iterations",
            self.stats.iterations
        );
        let finished: Sampler<Finished> = self.transition();
        finished.into_report(result)
    }
}

impl Sampler<Finished> {
    /// Hands the hardware back together with the session outcome
    pub fn into_report(self, result: Result<(), SamplingError>) -> SessionReport {
        SessionReport {
            source: self.source,
            stats: self.stats,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerSnapshot;
    use crate::stream::{axes_stream_info, button_stream_info, OutletFactory};
    use crate::testing::{RecordingFactory, ScriptedSource, StepClock};

    fn streaming(source: ScriptedSource, factory: &mut RecordingFactory) -> Sampler<Streaming> {
        let axes = factory
            .create(&axes_stream_info("pad_", "host", 500.0, "Scripted Pad"))
            .unwrap();
        let buttons = factory.create(&button_stream_info("pad_", "host")).unwrap();
        Sampler::create(
            Box::new(source),
            axes,
            buttons,
            Arc::new(StepClock::default()),
            SamplerSettings::default(),
        )
        .start()
    }

    fn pressed(button: ButtonId) -> ControllerSnapshot {
        ControllerSnapshot::idle().with_button(button, true)
    }

    #[test]
    fn axes_are_published_before_button_events_with_one_timestamp() {
        let snapshot = ControllerSnapshot {
            left_stick_x: -0.5,
            right_trigger: 1.0,
            ..ControllerSnapshot::idle()
        }
        .with_button(ButtonId::B, true)
        .with_button(ButtonId::A, true);

        let mut factory = RecordingFactory::default();
        let mut sampler = streaming(ScriptedSource::new(snapshot), &mut factory);
        sampler.run_iteration().unwrap();

        let published = factory.published();
        assert_eq!(published.len(), 3);
        assert_eq!(published[0].stream, "pad_Axes");
        assert_eq!(published[0].values, vec![-0.5, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(published[1].stream, "pad_Buttons");
        assert_eq!(published[1].values, vec![0.0]);
        assert_eq!(published[2].values, vec![1.0]);
        assert!(published.iter().all(|p| p.timestamp == published[0].timestamp));
    }

    #[test]
    fn timestamps_advance_between_iterations() {
        let mut factory = RecordingFactory::default();
        let mut sampler = streaming(ScriptedSource::new(ControllerSnapshot::idle()), &mut factory);
        sampler.run_iteration().unwrap();
        sampler.run_iteration().unwrap();

        let axes = factory.published_to("Axes");
        assert_eq!(axes.len(), 2);
        assert!(axes[1].timestamp > axes[0].timestamp);
    }

    #[test]
    fn press_held_for_five_iterations_emits_once() {
        let source = ScriptedSource::new(ControllerSnapshot::idle())
            .then(pressed(ButtonId::A))
            .then(pressed(ButtonId::A))
            .then(pressed(ButtonId::A))
            .then(pressed(ButtonId::A))
            .then(pressed(ButtonId::A))
            .then(ControllerSnapshot::idle());

        let mut factory = RecordingFactory::default();
        let mut sampler = streaming(source, &mut factory);
        for _ in 0..6 {
            sampler.run_iteration().unwrap();
        }

        let axes = factory.published_to("Axes");
        let events = factory.published_to("Buttons");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].values, vec![0.0]);
        assert_eq!(events[0].timestamp, axes[0].timestamp);
        assert_eq!(sampler.stats().button_events, 1);
        assert_eq!(sampler.stats().axes_samples, 6);
    }

    #[test]
    fn disconnected_iterations_publish_nothing_and_reconnect_resumes() {
        let source = ScriptedSource::new(ControllerSnapshot::idle())
            .then(ControllerSnapshot::idle())
            .then(ControllerSnapshot::disconnected())
            .then(ControllerSnapshot::disconnected())
            .then(pressed(ButtonId::Start));

        let mut factory = RecordingFactory::default();
        let mut sampler = streaming(source, &mut factory);

        sampler.run_iteration().unwrap();
        assert_eq!(factory.published().len(), 1);

        sampler.run_iteration().unwrap();
        sampler.run_iteration().unwrap();
        assert_eq!(factory.published().len(), 1);

        sampler.run_iteration().unwrap();
        let published = factory.published();
        assert_eq!(published.len(), 3);
        assert_eq!(published[2].values, vec![ButtonId::Start.index() as f32]);

        let stats = sampler.stats();
        assert_eq!(stats.iterations, 4);
        assert_eq!(stats.disconnected_iterations, 2);
    }

    #[test]
    fn read_failure_is_reported() {
        let source = ScriptedSource::new(ControllerSnapshot::idle()).then_fail("usb reset");
        let mut factory = RecordingFactory::default();
        let mut sampler = streaming(source, &mut factory);

        assert!(matches!(
            sampler.run_iteration(),
            Err(SamplingError::SourceError(SourceError::ReadError(_)))
        ));
        assert!(factory.published().is_empty());
    }

    #[tokio::test]
    async fn run_exits_on_cancellation_and_returns_source() {
        let source = ScriptedSource::new(ControllerSnapshot::idle());
        let counters = source.counters();
        let mut factory = RecordingFactory::default();
        let sampler = streaming(source, &mut factory);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(sampler.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let report = task.await.unwrap();
        assert!(report.result.is_ok());
        assert!(report.stats.iterations > 0);
        assert_eq!(report.stats.axes_samples, factory.published_to("Axes").len() as u64);
        assert_eq!(
            counters.polls.load(std::sync::atomic::Ordering::SeqCst) as u64,
            report.stats.iterations
        );
    }

    #[tokio::test]
    async fn run_stops_after_publish_failure() {
        let mut factory = RecordingFactory {
            fail_pushes_to: Some("pad_Axes".to_string()),
            ..RecordingFactory::default()
        };
        let sampler = streaming(ScriptedSource::new(ControllerSnapshot::idle()), &mut factory);

        let report = sampler.run(CancellationToken::new()).await;
        assert!(matches!(report.result, Err(SamplingError::PublishError(_))));
        assert_eq!(report.stats.iterations, 1);
        assert_eq!(report.stats.axes_samples, 0);
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_no_iteration() {
        let mut factory = RecordingFactory::default();
        let sampler = streaming(ScriptedSource::new(ControllerSnapshot::idle()), &mut factory);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = sampler.run(cancel).await;
        assert!(report.result.is_ok());
        assert_eq!(report.stats, SessionStats::default());
        assert!(factory.published().is_empty());
    }
}
