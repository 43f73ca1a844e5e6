//! One multi-channel signal as one store array per channel.
//!
//! Channel `c` of a signal named `x` is the array `x.c`. All channel arrays
//! carry the signal's unit, a time dimension (regular or irregular sampling)
//! followed by an empty set dimension, and a link to one shared metadata
//! section.

use neonix_store::{ArrayData, ContainerStore, Dimension, ElementId, ElementKind};
use neonix_types::{Quantity, QuantityArray, Samples, Signal, TimeBasis};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

const TIME_LABEL: &str = "time";

/// Name of channel `channel` of the signal named `prefix`.
pub fn channel_name(prefix: &str, channel: usize) -> String {
    format!("{prefix}.{channel}")
}

/// Split `name` into `(prefix, channel)` if it names a channel array.
pub fn parse_channel_name(name: &str) -> Option<(&str, usize)> {
    let (prefix, channel) = name.rsplit_once('.')?;
    if prefix.is_empty() || channel.is_empty() || !channel.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((prefix, channel.parse().ok()?))
}

/// Time dimension describing a signal's sampling.
pub fn time_dimension(basis: &TimeBasis) -> SyncResult<Dimension> {
    Ok(match basis {
        TimeBasis::Regular {
            sampling_period,
            t_start,
        } => Dimension::Sampled {
            interval: sampling_period.magnitude,
            offset: t_start.rescale(&sampling_period.units)?.magnitude,
            unit: Some(sampling_period.units.clone()),
            label: Some(TIME_LABEL.to_string()),
        },
        TimeBasis::Irregular { times } => Dimension::Range {
            ticks: times.values.clone(),
            unit: Some(times.units.clone()),
            label: Some(TIME_LABEL.to_string()),
        },
    })
}

/// Rebuild a time basis from a time dimension. `t_start` overrides the
/// offset when the metadata recorded it with its own unit.
pub fn time_basis(dimension: &Dimension, t_start: Option<Quantity>) -> Option<TimeBasis> {
    match dimension {
        Dimension::Sampled {
            interval,
            offset,
            unit,
            ..
        } => {
            let unit = unit.clone().unwrap_or_else(|| "s".to_string());
            Some(TimeBasis::Regular {
                sampling_period: Quantity::new(*interval, unit.clone()),
                t_start: t_start.unwrap_or_else(|| Quantity::new(*offset, unit)),
            })
        }
        Dimension::Range { ticks, unit, .. } => Some(TimeBasis::Irregular {
            times: QuantityArray::new(
                ticks.clone(),
                unit.clone().unwrap_or_else(|| "s".to_string()),
            ),
        }),
        Dimension::Set { .. } => None,
    }
}

/// Channel arrays `{prefix}.0, {prefix}.1, ...` of type `type_name` under
/// `group`, stopping at the first gap.
pub fn channel_arrays<S: ContainerStore + ?Sized>(
    store: &S,
    group: ElementId,
    prefix: &str,
    type_name: &str,
) -> SyncResult<Vec<ElementId>> {
    let mut out = Vec::new();
    for c in 0.. {
        match store.lookup(Some(group), ElementKind::DataArray, &channel_name(prefix, c))? {
            Some(id) if store.header(id)?.type_name == type_name => out.push(id),
            _ => break,
        }
    }
    Ok(out)
}

/// Distinct signal prefixes among the arrays of `group` typed `type_name`,
/// in store order.
pub fn signal_prefixes<S: ContainerStore + ?Sized>(
    store: &S,
    group: ElementId,
    type_name: &str,
) -> SyncResult<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for id in store.list(Some(group), ElementKind::DataArray)? {
        let header = store.header(id)?;
        if header.type_name != type_name {
            continue;
        }
        if let Some((prefix, _)) = parse_channel_name(&header.name) {
            if !out.iter().any(|p| p == prefix) {
                out.push(prefix.to_string());
            }
        }
    }
    Ok(out)
}

/// Write `signal` as channel arrays named after `prefix`.
///
/// Existing channel arrays are rewritten in place, missing ones created and
/// surplus ones removed. A placeholder payload leaves the stored samples
/// alone and only refreshes unit, dimensions and metadata.
pub fn write_signal<S: ContainerStore + ?Sized>(
    store: &mut S,
    group: ElementId,
    prefix: &str,
    type_name: &str,
    signal: &Signal,
    section: ElementId,
) -> SyncResult<Vec<ElementId>> {
    let existing = channel_arrays(store, group, prefix, type_name)?;
    let placeholder = signal.samples.is_placeholder();
    let channels = if placeholder {
        existing.len()
    } else {
        signal.channel_count()
    };
    let rows = signal.samples.rows();
    let dimension = time_dimension(&signal.time_basis)?;

    let mut arrays = Vec::with_capacity(channels);
    for c in 0..channels {
        let id = match existing.get(c) {
            Some(id) => *id,
            None => store.create(
                Some(group),
                ElementKind::DataArray,
                &channel_name(prefix, c),
                type_name,
            )?,
        };
        if !placeholder {
            store.set_data(id, ArrayData::Float(signal.samples.column(c)), &[rows, 1])?;
        }
        store.set_unit(id, Some(&signal.units))?;
        if store.dimensions(id)? != [dimension.clone(), Dimension::Set { labels: Vec::new() }] {
            store.clear_dimensions(id)?;
            store.append_dimension(id, dimension.clone())?;
            store.append_dimension(id, Dimension::Set { labels: Vec::new() })?;
        }
        if store.header(id)?.metadata != Some(section) {
            store.set_metadata(id, Some(section))?;
        }
        arrays.push(id);
    }

    for surplus in existing.iter().skip(channels) {
        store.remove(*surplus)?;
    }
    debug!(
        signal = %prefix,
        channels,
        removed = existing.len().saturating_sub(channels),
        "wrote signal channels"
    );
    Ok(arrays)
}

/// Payload of a signal read back from its channel arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalPayload {
    pub samples: Samples,
    pub units: String,
    pub time_dimension: Dimension,
    pub section: Option<ElementId>,
}

/// Read channel arrays back into one payload.
///
/// With `verify`, every array must share the first array's metadata
/// section, length and unit. With `defer`, the samples are a placeholder of
/// shape `(len, channels)`.
pub fn read_signal<S: ContainerStore + ?Sized>(
    store: &S,
    prefix: &str,
    arrays: &[ElementId],
    defer: bool,
    verify: bool,
) -> SyncResult<SignalPayload> {
    let inconsistent = |reason: String| SyncError::InconsistentSignalGroup {
        prefix: prefix.to_string(),
        reason,
    };
    let first = *arrays
        .first()
        .ok_or_else(|| inconsistent("no channel arrays".into()))?;
    let section = store.header(first)?.metadata;
    let units = store.unit(first)?.unwrap_or_else(|| "dimensionless".to_string());
    let len = store.shape(first)?.first().copied().unwrap_or(0);
    let time_dimension = store
        .dimensions(first)?
        .into_iter()
        .next()
        .filter(|d| !matches!(d, Dimension::Set { .. }))
        .ok_or_else(|| inconsistent("first channel has no time dimension".into()))?;

    if verify {
        for (c, id) in arrays.iter().enumerate().skip(1) {
            if store.header(*id)?.metadata != section {
                return Err(inconsistent(format!(
                    "channel {c} does not share the metadata section of channel 0"
                )));
            }
            let other_len = store.shape(*id)?.first().copied().unwrap_or(0);
            if other_len != len {
                return Err(inconsistent(format!(
                    "channel {c} has {other_len} samples, channel 0 has {len}"
                )));
            }
            let other_units = store.unit(*id)?.unwrap_or_else(|| "dimensionless".to_string());
            if other_units != units {
                return Err(inconsistent(format!(
                    "channel {c} is in {other_units}, channel 0 is in {units}"
                )));
            }
        }
    }

    let samples = if defer {
        Samples::placeholder(vec![len, arrays.len()])
    } else {
        let mut columns = Vec::with_capacity(arrays.len());
        for (c, id) in arrays.iter().enumerate() {
            match store.data(*id)? {
                ArrayData::Float(v) => columns.push(v),
                other => {
                    return Err(inconsistent(format!(
                        "channel {c} holds {} data",
                        other.type_name()
                    )))
                }
            }
        }
        Samples::from_columns(&columns)?
    };

    Ok(SignalPayload {
        samples,
        units,
        time_dimension,
        section,
    })
}
