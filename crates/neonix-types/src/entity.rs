//! The fixed set of recording entities.
//!
//! Owning relations are index lists on the parent; back-references and
//! non-owning cross-references are optional indices maintained by
//! [`Graph`](crate::Graph).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationValue, Annotations};
use crate::ids::{
    BlockId, ChannelGroupId, EpochId, EventId, SegmentId, SignalId, SpikeTrainId, UnitId,
};
use crate::quantity::{Quantity, QuantityArray};
use crate::samples::Samples;

/// Attributes shared by every entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Common {
    pub name: Option<String>,
    pub description: Option<String>,
    pub file_origin: Option<String>,
    pub annotations: Annotations,
}

impl Common {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// The name, or `""` if none has been assigned yet.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

macro_rules! common_builders {
    ($($ty:ident),* $(,)?) => {$(
        impl $ty {
            pub fn with_name(mut self, name: impl Into<String>) -> Self {
                self.common.name = Some(name.into());
                self
            }

            pub fn with_description(mut self, description: impl Into<String>) -> Self {
                self.common.description = Some(description.into());
                self
            }

            pub fn with_file_origin(mut self, origin: impl Into<String>) -> Self {
                self.common.file_origin = Some(origin.into());
                self
            }

            pub fn annotate(mut self, key: impl Into<String>, value: impl Into<AnnotationValue>) -> Self {
                self.common.annotations.insert(key.into(), value.into());
                self
            }
        }
    )*};
}

common_builders!(RecordingBlock, Segment, ChannelGroup, Signal, Event, Epoch, SpikeTrain, Unit);

/// Root container of a recording.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingBlock {
    pub common: Common,
    pub rec_datetime: Option<NaiveDateTime>,
    pub file_datetime: Option<NaiveDateTime>,
    pub segments: Vec<SegmentId>,
    pub channel_groups: Vec<ChannelGroupId>,
}

impl RecordingBlock {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A period of recording with a common time base.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub common: Common,
    pub rec_datetime: Option<NaiveDateTime>,
    pub file_datetime: Option<NaiveDateTime>,
    pub analog_signals: Vec<SignalId>,
    pub irregular_signals: Vec<SignalId>,
    pub events: Vec<EventId>,
    pub epochs: Vec<EpochId>,
    pub spike_trains: Vec<SpikeTrainId>,
    pub block: Option<BlockId>,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A grouping of recording channels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelGroup {
    pub common: Common,
    pub channel_indexes: Vec<i64>,
    pub channel_names: Vec<String>,
    /// One coordinate tuple per channel.
    pub coordinates: Vec<Vec<Quantity>>,
    pub units: Vec<UnitId>,
    /// Signals recorded on these channels; they live under segments.
    pub signals: Vec<SignalId>,
    pub block: Option<BlockId>,
}

impl ChannelGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels(mut self, indexes: Vec<i64>, names: Vec<String>) -> Self {
        self.channel_indexes = indexes;
        self.channel_names = names;
        self
    }
}

/// How a signal's samples are placed in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimeBasis {
    Regular {
        sampling_period: Quantity,
        t_start: Quantity,
    },
    Irregular {
        times: QuantityArray,
    },
}

/// A multi-channel signal (samples × channels).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub common: Common,
    pub samples: Samples,
    pub units: String,
    pub time_basis: TimeBasis,
    pub segment: Option<SegmentId>,
    pub channel_group: Option<ChannelGroupId>,
}

impl Signal {
    pub fn regular(
        samples: Samples,
        units: impl Into<String>,
        sampling_period: Quantity,
        t_start: Quantity,
    ) -> Self {
        Self {
            common: Common::default(),
            samples,
            units: units.into(),
            time_basis: TimeBasis::Regular {
                sampling_period,
                t_start,
            },
            segment: None,
            channel_group: None,
        }
    }

    pub fn irregular(samples: Samples, units: impl Into<String>, times: QuantityArray) -> Self {
        Self {
            common: Common::default(),
            samples,
            units: units.into(),
            time_basis: TimeBasis::Irregular { times },
            segment: None,
            channel_group: None,
        }
    }

    pub fn is_regular(&self) -> bool {
        matches!(self.time_basis, TimeBasis::Regular { .. })
    }

    pub fn channel_count(&self) -> usize {
        self.samples.cols()
    }
}

/// Labelled time points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub common: Common,
    pub times: QuantityArray,
    pub labels: Vec<String>,
    pub segment: Option<SegmentId>,
}

impl Event {
    pub fn new(times: QuantityArray, labels: Vec<String>) -> Self {
        Self {
            times,
            labels,
            ..Default::default()
        }
    }
}

/// Labelled time intervals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    pub common: Common,
    pub times: QuantityArray,
    pub durations: QuantityArray,
    pub labels: Vec<String>,
    pub segment: Option<SegmentId>,
}

impl Epoch {
    pub fn new(times: QuantityArray, durations: QuantityArray, labels: Vec<String>) -> Self {
        Self {
            times,
            durations,
            labels,
            ..Default::default()
        }
    }
}

/// Spike waveforms of a train (spike × channel × sample).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waveforms {
    pub samples: Samples,
    pub units: String,
    pub sampling_period: Option<Quantity>,
    pub left_sweep: Option<Quantity>,
}

/// Spike times of one unit in one segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpikeTrain {
    pub common: Common,
    pub times: QuantityArray,
    pub t_start: Quantity,
    pub t_stop: Quantity,
    pub waveforms: Option<Waveforms>,
    /// Placeholder flag for `times` on deferred reads; the declared length
    /// is kept in `declared_len`.
    pub times_deferred: bool,
    pub declared_len: usize,
    pub segment: Option<SegmentId>,
    pub unit: Option<UnitId>,
}

impl SpikeTrain {
    /// A train starting at zero in the unit of `times`.
    pub fn new(times: QuantityArray, t_stop: f64) -> Self {
        let units = times.units.clone();
        let declared_len = times.len();
        Self {
            common: Common::default(),
            t_start: Quantity::new(0.0, units.clone()),
            t_stop: Quantity::new(t_stop, units),
            times,
            waveforms: None,
            times_deferred: false,
            declared_len,
            segment: None,
            unit: None,
        }
    }

    pub fn with_t_start(mut self, t_start: Quantity) -> Self {
        self.t_start = t_start;
        self
    }

    pub fn with_waveforms(mut self, waveforms: Waveforms) -> Self {
        self.waveforms = Some(waveforms);
        self
    }

    /// Number of spikes, whether or not the times are loaded.
    pub fn len(&self) -> usize {
        if self.times_deferred {
            self.declared_len
        } else {
            self.times.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A putative neuron; its spike trains live under segments.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub common: Common,
    pub spike_trains: Vec<SpikeTrainId>,
    pub channel_group: Option<ChannelGroupId>,
}

impl Unit {
    pub fn new() -> Self {
        Self::default()
    }
}
