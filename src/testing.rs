//! Test doubles for the hardware and transport seams

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::controller::{ControllerSnapshot, ControllerSource, DeviceInfo, SourceError};
use crate::stream::{Clock, OutletFactory, PublishError, StreamInfo, StreamOutlet};

/// Shared view of what a [`ScriptedSource`] was asked to do
#[derive(Clone, Default)]
pub struct SourceCounters {
    pub polls: Arc<AtomicUsize>,
    pub suspends: Arc<AtomicUsize>,
    pub fail_suspend: Arc<AtomicBool>,
}

enum Step {
    Snapshot(Result<ControllerSnapshot, SourceError>),
    Panic(String),
}

/// Replays scripted snapshots, then repeats `fallback` forever
pub struct ScriptedSource {
    script: VecDeque<Step>,
    fallback: ControllerSnapshot,
    devices: Vec<DeviceInfo>,
    counters: SourceCounters,
}

impl ScriptedSource {
    pub fn new(fallback: ControllerSnapshot) -> Self {
        let devices = if fallback.connected {
            vec![DeviceInfo {
                index: 0,
                name: "Scripted Pad".to_string(),
                guid: "00112233445566778899aabbccddeeff".to_string(),
            }]
        } else {
            Vec::new()
        };
        Self {
            script: VecDeque::new(),
            fallback,
            devices,
            counters: SourceCounters::default(),
        }
    }

    pub fn then(mut self, snapshot: ControllerSnapshot) -> Self {
        self.script.push_back(Step::Snapshot(Ok(snapshot)));
        self
    }

    pub fn then_fail(mut self, reason: &str) -> Self {
        self.script
            .push_back(Step::Snapshot(Err(SourceError::ReadError(reason.to_string()))));
        self
    }

    /// The poll after the scripted ones so far panics instead of returning
    pub fn then_panic(mut self, message: &str) -> Self {
        self.script.push_back(Step::Panic(message.to_string()));
        self
    }

    pub fn counters(&self) -> SourceCounters {
        self.counters.clone()
    }
}

impl ControllerSource for ScriptedSource {
    fn refresh(&mut self) -> Vec<DeviceInfo> {
        self.devices.clone()
    }

    fn snapshot(&mut self, index: usize) -> Result<ControllerSnapshot, SourceError> {
        self.counters.polls.fetch_add(1, Ordering::SeqCst);
        if index >= self.devices.len().max(1) {
            return Ok(ControllerSnapshot::disconnected());
        }
        match self.script.pop_front() {
            Some(Step::Snapshot(result)) => result,
            Some(Step::Panic(message)) => panic!("{}", message),
            None => Ok(self.fallback.clone()),
        }
    }

    fn suspend(&mut self) -> Result<(), SourceError> {
        if self.counters.fail_suspend.load(Ordering::SeqCst) {
            return Err(SourceError::SuspendError("device busy".to_string()));
        }
        self.counters.suspends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Published {
    pub stream: String,
    pub values: Vec<f32>,
    pub timestamp: f64,
}

/// Records stream creations and every push, in publish order
#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub created: Arc<Mutex<Vec<StreamInfo>>>,
    pub published: Arc<Mutex<Vec<Published>>>,
    pub fail_pushes_to: Option<String>,
}

impl RecordingFactory {
    pub fn created(&self) -> Vec<StreamInfo> {
        self.created.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_to(&self, stream_suffix: &str) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|p| p.stream.ends_with(stream_suffix))
            .collect()
    }
}

impl OutletFactory for RecordingFactory {
    fn create(&mut self, info: &StreamInfo) -> Result<Box<dyn StreamOutlet>, PublishError> {
        self.created.lock().unwrap().push(info.clone());
        Ok(Box::new(RecordingOutlet {
            stream: info.name.clone(),
            published: self.published.clone(),
            fail: self.fail_pushes_to.as_deref() == Some(info.name.as_str()),
        }))
    }
}

struct RecordingOutlet {
    stream: String,
    published: Arc<Mutex<Vec<Published>>>,
    fail: bool,
}

impl StreamOutlet for RecordingOutlet {
    fn push_sample(&mut self, values: &[f32], timestamp: f64) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::PushError {
                stream: self.stream.clone(),
                reason: "transport closed".to_string(),
            });
        }
        self.published.lock().unwrap().push(Published {
            stream: self.stream.clone(),
            values: values.to_vec(),
            timestamp,
        });
        Ok(())
    }
}

/// Advances by one millisecond on every read
#[derive(Default)]
pub struct StepClock {
    ticks: AtomicU64,
}

impl Clock for StepClock {
    fn now(&self) -> f64 {
        self.ticks.fetch_add(1, Ordering::SeqCst) as f64 / 1000.0
    }
}
