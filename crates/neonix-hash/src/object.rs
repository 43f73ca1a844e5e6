use neonix_types::{
    BlockId, ChannelGroupId, Common, Digest, EpochId, EventId, Graph, ObjectKind, ObjectRef,
    SegmentId, SignalId, SpikeTrainId, TimeBasis,
};

use crate::hasher::{ContentHasher, DigestWriter};

/// Fingerprint of `obj`'s own attributes and payload.
///
/// Covers name, description, file origin, annotations, kind-specific
/// scalars and bulk payload. Children and cross-references are excluded.
///
/// # Panics
///
/// Panics if `obj` does not index an entity of `graph`.
pub fn digest(graph: &Graph, obj: ObjectRef) -> Digest {
    let mut w = ContentHasher::for_kind(obj.kind).writer();
    common(&mut w, graph.common(obj));

    match obj.kind {
        ObjectKind::Block => {
            let b = graph.block(BlockId::new(obj.index));
            w.datetime(b.rec_datetime.as_ref())
                .datetime(b.file_datetime.as_ref());
        }
        ObjectKind::Segment => {
            let s = graph.segment(SegmentId::new(obj.index));
            w.datetime(s.rec_datetime.as_ref())
                .datetime(s.file_datetime.as_ref());
        }
        ObjectKind::ChannelGroup => {
            let g = graph.channel_group(ChannelGroupId::new(obj.index));
            w.ints(&g.channel_indexes).strs(&g.channel_names);
            w.int(g.coordinates.len() as i64);
            for coord in &g.coordinates {
                w.int(coord.len() as i64);
                for q in coord {
                    w.quantity(q);
                }
            }
        }
        ObjectKind::AnalogSignal | ObjectKind::IrregularlySampledSignal => {
            let s = graph.signal(SignalId::new(obj.index));
            w.str(&s.units);
            match &s.time_basis {
                TimeBasis::Regular {
                    sampling_period,
                    t_start,
                } => {
                    w.quantity(sampling_period).quantity(t_start);
                }
                TimeBasis::Irregular { times } => {
                    w.quantity_array(times);
                }
            }
            w.samples(&s.samples);
        }
        ObjectKind::Event => {
            let e = graph.event(EventId::new(obj.index));
            w.quantity_array(&e.times).strs(&e.labels);
        }
        ObjectKind::Epoch => {
            let e = graph.epoch(EpochId::new(obj.index));
            w.quantity_array(&e.times)
                .quantity_array(&e.durations)
                .strs(&e.labels);
        }
        ObjectKind::SpikeTrain => {
            let st = graph.spike_train(SpikeTrainId::new(obj.index));
            if st.times_deferred {
                w.int(st.declared_len as i64).str(&st.times.units);
            } else {
                w.quantity_array(&st.times);
            }
            w.quantity(&st.t_start).quantity(&st.t_stop);
            match &st.waveforms {
                Some(wf) => {
                    w.str(&wf.units)
                        .opt_quantity(wf.sampling_period.as_ref())
                        .opt_quantity(wf.left_sweep.as_ref())
                        .samples(&wf.samples);
                }
                None => {
                    w.none();
                }
            }
        }
        ObjectKind::Unit => {}
    }

    w.finish()
}

fn common(w: &mut DigestWriter, c: &Common) {
    w.opt_str(c.name.as_deref())
        .opt_str(c.description.as_deref())
        .opt_str(c.file_origin.as_deref())
        .annotations(&c.annotations);
}
