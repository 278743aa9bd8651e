//! Stream declarations for the axes and button-event outlets
//!
//! A [`StreamInfo`] carries everything a transport needs to announce a stream:
//! identity, content type, shape, nominal rate, and a free-form hierarchical
//! description ([`MetaElement`]) attached once before the first sample.

use crate::controller::AXIS_COUNT;

/// Nominal rate of streams that push samples only on events
pub const IRREGULAR_RATE: f64 = 0.0;

/// Numeric type of every channel value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelFormat {
    Float32,
}

/// Node of the stream description tree
///
/// Leaf nodes carry a value, inner nodes carry children. Mirrors the XML
/// description model of lab streaming transports.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetaElement {
    pub name: String,
    pub value: Option<String>,
    pub children: Vec<MetaElement>,
}

impl MetaElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends an empty child and returns it for further nesting
    pub fn append_child(&mut self, name: impl Into<String>) -> &mut MetaElement {
        self.children.push(MetaElement::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Appends a `<name>value</name>` leaf, returning `self` for chaining
    pub fn append_child_value(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut MetaElement {
        self.children.push(MetaElement {
            name: name.into(),
            value: Some(value.into()),
            children: Vec::new(),
        });
        self
    }

    pub fn child(&self, name: &str) -> Option<&MetaElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.value.as_deref())
    }
}

/// Static description of one axes channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub label: &'static str,
    pub kind: &'static str,
    pub unit: &'static str,
}

/// Axes channels in the order of [`ControllerSnapshot::axes`](crate::controller::ControllerSnapshot::axes)
pub const AXIS_CHANNELS: [ChannelDescriptor; AXIS_COUNT] = [
    ChannelDescriptor {
        label: "L_X",
        kind: "PositionX_L",
        unit: "normalized_signed",
    },
    ChannelDescriptor {
        label: "L_Y",
        kind: "PositionY_L",
        unit: "normalized_signed",
    },
    ChannelDescriptor {
        label: "R_X",
        kind: "PositionX_R",
        unit: "normalized_signed",
    },
    ChannelDescriptor {
        label: "R_Y",
        kind: "PositionY_R",
        unit: "normalized_signed",
    },
    ChannelDescriptor {
        label: "Trigger_L",
        kind: "Rotation_X",
        unit: "normalized_signed",
    },
    ChannelDescriptor {
        label: "Trigger_R",
        kind: "Rotation_Y",
        unit: "normalized_signed",
    },
];

#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub name: String,
    pub content_type: String,
    pub channel_count: usize,
    /// Samples per second, or [`IRREGULAR_RATE`]
    pub nominal_rate: f64,
    pub channel_format: ChannelFormat,
    pub source_id: String,
    /// Root `desc` element
    pub desc: MetaElement,
}

impl StreamInfo {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        channel_count: usize,
        nominal_rate: f64,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            channel_count,
            nominal_rate,
            channel_format: ChannelFormat::Float32,
            source_id: source_id.into(),
            desc: MetaElement::new("desc"),
        }
    }

    pub fn is_irregular(&self) -> bool {
        self.nominal_rate == IRREGULAR_RATE
    }
}

/// Declaration of the regular-rate axes stream
pub fn axes_stream_info(prefix: &str, host: &str, nominal_rate: f64, model: &str) -> StreamInfo {
    let mut info = StreamInfo::new(
        format!("{prefix}Axes"),
        "Position",
        AXIS_COUNT,
        nominal_rate,
        format!("{prefix}Axes_{host}"),
    );

    let channels = info.desc.append_child("channels");
    for channel in AXIS_CHANNELS {
        channels
            .append_child("channel")
            .append_child_value("label", channel.label)
            .append_child_value("type", channel.kind)
            .append_child_value("unit", channel.unit);
    }
    info.desc
        .append_child("acquisition")
        .append_child_value("model", model);
    info
}

/// Declaration of the irregular button-event stream, one channel carrying the button index
pub fn button_stream_info(prefix: &str, host: &str) -> StreamInfo {
    StreamInfo::new(
        format!("{prefix}Buttons"),
        "Markers",
        1,
        IRREGULAR_RATE,
        format!("{prefix}Buttons_{host}"),
    )
}
