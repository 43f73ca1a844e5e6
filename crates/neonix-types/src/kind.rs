use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The fixed set of domain entity kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Block,
    Segment,
    ChannelGroup,
    AnalogSignal,
    IrregularlySampledSignal,
    Event,
    Epoch,
    SpikeTrain,
    Unit,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 9] = [
        Self::Block,
        Self::Segment,
        Self::ChannelGroup,
        Self::AnalogSignal,
        Self::IrregularlySampledSignal,
        Self::Event,
        Self::Epoch,
        Self::SpikeTrain,
        Self::Unit,
    ];

    /// Class name used for synthetic names (`neo.<ClassName>`).
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Block => "Block",
            Self::Segment => "Segment",
            Self::ChannelGroup => "RecordingChannelGroup",
            Self::AnalogSignal => "AnalogSignal",
            Self::IrregularlySampledSignal => "IrregularlySampledSignal",
            Self::Event => "Event",
            Self::Epoch => "Epoch",
            Self::SpikeTrain => "SpikeTrain",
            Self::Unit => "Unit",
        }
    }

    /// Type string written on the primary store element.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Block => "neo.block",
            Self::Segment => "neo.segment",
            Self::ChannelGroup => "neo.recordingchannelgroup",
            Self::AnalogSignal => "neo.analogsignal",
            Self::IrregularlySampledSignal => "neo.irregularlysampledsignal",
            Self::Event => "neo.event",
            Self::Epoch => "neo.epoch",
            Self::SpikeTrain => "neo.spiketrain",
            Self::Unit => "neo.unit",
        }
    }

    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_name() == type_name)
    }

    /// Container label under which this kind appears in a path. Blocks are
    /// roots and have none.
    pub const fn label(self) -> Option<ContainerLabel> {
        match self {
            Self::Block => None,
            Self::Segment => Some(ContainerLabel::Segments),
            Self::ChannelGroup => Some(ContainerLabel::RecordingChannelGroups),
            Self::AnalogSignal => Some(ContainerLabel::AnalogSignals),
            Self::IrregularlySampledSignal => Some(ContainerLabel::IrregularlySampledSignals),
            Self::Event => Some(ContainerLabel::Events),
            Self::Epoch => Some(ContainerLabel::Epochs),
            Self::SpikeTrain => Some(ContainerLabel::SpikeTrains),
            Self::Unit => Some(ContainerLabel::Units),
        }
    }

    /// Child container kinds, in the order they are visited.
    pub const fn child_kinds(self) -> &'static [ObjectKind] {
        match self {
            Self::Block => &[Self::Segment, Self::ChannelGroup],
            Self::Segment => &[
                Self::AnalogSignal,
                Self::IrregularlySampledSignal,
                Self::Event,
                Self::Epoch,
                Self::SpikeTrain,
            ],
            Self::ChannelGroup => &[Self::Unit],
            _ => &[],
        }
    }

    pub const fn is_signal(self) -> bool {
        matches!(self, Self::AnalogSignal | Self::IrregularlySampledSignal)
    }

    /// Kinds stored as an indexed tag.
    pub const fn is_tag(self) -> bool {
        matches!(self, Self::Event | Self::Epoch | Self::SpikeTrain)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Container labels used as path components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContainerLabel {
    Segments,
    RecordingChannelGroups,
    AnalogSignals,
    IrregularlySampledSignals,
    Events,
    Epochs,
    SpikeTrains,
    RecordingChannels,
    Units,
}

impl ContainerLabel {
    pub const ALL: [ContainerLabel; 9] = [
        Self::Segments,
        Self::RecordingChannelGroups,
        Self::AnalogSignals,
        Self::IrregularlySampledSignals,
        Self::Events,
        Self::Epochs,
        Self::SpikeTrains,
        Self::RecordingChannels,
        Self::Units,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Segments => "segments",
            Self::RecordingChannelGroups => "recordingchannelgroups",
            Self::AnalogSignals => "analogsignals",
            Self::IrregularlySampledSignals => "irregularlysampledsignals",
            Self::Events => "events",
            Self::Epochs => "epochs",
            Self::SpikeTrains => "spiketrains",
            Self::RecordingChannels => "recordingchannels",
            Self::Units => "units",
        }
    }

    /// The entity kind stored under this label. Recording channels are
    /// derived store elements without a domain entity of their own.
    pub const fn object_kind(self) -> Option<ObjectKind> {
        match self {
            Self::Segments => Some(ObjectKind::Segment),
            Self::RecordingChannelGroups => Some(ObjectKind::ChannelGroup),
            Self::AnalogSignals => Some(ObjectKind::AnalogSignal),
            Self::IrregularlySampledSignals => Some(ObjectKind::IrregularlySampledSignal),
            Self::Events => Some(ObjectKind::Event),
            Self::Epochs => Some(ObjectKind::Epoch),
            Self::SpikeTrains => Some(ObjectKind::SpikeTrain),
            Self::RecordingChannels => None,
            Self::Units => Some(ObjectKind::Unit),
        }
    }

    /// Whether this label may follow `parent` in a path (`None` is the block).
    pub fn valid_under(self, parent: Option<ContainerLabel>) -> bool {
        match parent {
            None => matches!(self, Self::Segments | Self::RecordingChannelGroups),
            Some(Self::Segments) => matches!(
                self,
                Self::AnalogSignals
                    | Self::IrregularlySampledSignals
                    | Self::Events
                    | Self::Epochs
                    | Self::SpikeTrains
            ),
            Some(Self::RecordingChannelGroups) => {
                matches!(self, Self::Units | Self::RecordingChannels)
            }
            Some(_) => false,
        }
    }
}

impl fmt::Display for ContainerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerLabel {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| TypeError::UnknownLabel(s.to_string()))
    }
}
