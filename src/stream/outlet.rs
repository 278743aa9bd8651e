use tracing::{debug, info};

use super::info::StreamInfo;

// Publisher errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to create stream '{stream}': {reason}")]
    CreateError { stream: String, reason: String },

    #[error("Failed to push sample to '{stream}': {reason}")]
    PushError { stream: String, reason: String },

    #[error("Sample for '{stream}' has {actual} values, stream declares {expected}")]
    ShapeError {
        stream: String,
        expected: usize,
        actual: usize,
    },
}

/// Push side of one published stream
pub trait StreamOutlet: Send {
    /// Pushes one sample; `values.len()` must equal the declared channel count
    fn push_sample(&mut self, values: &[f32], timestamp: f64) -> Result<(), PublishError>;
}

/// Creates outlets from stream declarations
///
/// Implemented once per transport. The description in [`StreamInfo::desc`] is
/// attached at creation, before any sample is pushed.
pub trait OutletFactory: Send {
    fn create(&mut self, info: &StreamInfo) -> Result<Box<dyn StreamOutlet>, PublishError>;
}

/// Transport that only writes samples to the log
///
/// Used when the binary is built without a lab streaming backend.
#[derive(Debug, Default)]
pub struct LogOutletFactory;

impl OutletFactory for LogOutletFactory {
    fn create(&mut self, info: &StreamInfo) -> Result<Box<dyn StreamOutlet>, PublishError> {
        let rate = if info.is_irregular() {
            "irregular".to_string()
        } else {
            format!("{} Hz", info.nominal_rate)
        };
        info!(
            "Declared stream '{}' ({}, {} channels, {}, source id {})",
            info.name, info.content_type, info.channel_count, rate, info.source_id
        );
        debug!("Stream description: {:?}", info.desc);
        Ok(Box::new(LogOutlet {
            stream: info.name.clone(),
            channel_count: info.channel_count,
        }))
    }
}

struct LogOutlet {
    stream: String,
    channel_count: usize,
}

impl StreamOutlet for LogOutlet {
    fn push_sample(&mut self, values: &[f32], timestamp: f64) -> Result<(), PublishError> {
        check_shape(&self.stream, self.channel_count, values)?;
        debug!("[{}] {:.6} {:?}", self.stream, timestamp, values);
        Ok(())
    }
}

pub(crate) fn check_shape(stream: &str, expected: usize, values: &[f32]) -> Result<(), PublishError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(PublishError::ShapeError {
            stream: stream.to_string(),
            expected,
            actual: values.len(),
        })
    }
}
