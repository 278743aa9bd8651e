//! Lab Streaming Layer transport (cargo feature `lsl`)

use lsl::ExPushable;
use tracing::info;

use super::clock::Clock;
use super::info::{ChannelFormat, MetaElement, StreamInfo};
use super::outlet::{check_shape, OutletFactory, PublishError, StreamOutlet};

/// Creates liblsl outlets
#[derive(Debug, Default)]
pub struct LslOutletFactory;

impl OutletFactory for LslOutletFactory {
    fn create(&mut self, info: &StreamInfo) -> Result<Box<dyn StreamOutlet>, PublishError> {
        let create_error = |reason: String| PublishError::CreateError {
            stream: info.name.clone(),
            reason,
        };

        let format = match info.channel_format {
            ChannelFormat::Float32 => lsl::ChannelFormat::Float32,
        };
        let mut lsl_info = lsl::StreamInfo::new(
            &info.name,
            &info.content_type,
            info.channel_count as u32,
            info.nominal_rate,
            format,
            &info.source_id,
        )
        .map_err(|e| create_error(e.to_string()))?;

        let mut desc = lsl_info.desc();
        for child in &info.desc.children {
            append_meta(&mut desc, child);
        }

        let outlet = lsl::StreamOutlet::new(&lsl_info, 0, 360)
            .map_err(|e| create_error(e.to_string()))?;
        info!("Opened LSL outlet '{}' ({})", info.name, info.source_id);

        Ok(Box::new(LslOutlet {
            stream: info.name.clone(),
            channel_count: info.channel_count,
            outlet,
        }))
    }
}

fn append_meta(parent: &mut lsl::XMLElement, element: &MetaElement) {
    match &element.value {
        Some(value) => {
            parent.append_child_value(&element.name, value);
        }
        None => {
            let mut node = parent.append_child(&element.name);
            for child in &element.children {
                append_meta(&mut node, child);
            }
        }
    }
}

struct LslOutlet {
    stream: String,
    channel_count: usize,
    outlet: lsl::StreamOutlet,
}

impl StreamOutlet for LslOutlet {
    fn push_sample(&mut self, values: &[f32], timestamp: f64) -> Result<(), PublishError> {
        check_shape(&self.stream, self.channel_count, values)?;
        self.outlet
            .push_sample_ex(&values.to_vec(), timestamp, true)
            .map_err(|e| PublishError::PushError {
                stream: self.stream.clone(),
                reason: e.to_string(),
            })
    }
}

/// liblsl's `local_clock`, the reference time of LSL timestamps
#[derive(Debug, Default, Clone)]
pub struct LslClock;

impl Clock for LslClock {
    fn now(&self) -> f64 {
        lsl::local_clock()
    }
}
