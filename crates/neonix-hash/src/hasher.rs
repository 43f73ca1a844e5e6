use chrono::NaiveDateTime;
use neonix_types::{AnnotationValue, Annotations, Digest, ObjectKind, Quantity, QuantityArray, Samples, Scalar};

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"neonix-segment-v1"`) that is
/// prepended to every hash computation, so objects of different kinds with
/// identical fields never share a digest.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    pub const BLOCK: Self = Self::new("neonix-block-v1");
    pub const SEGMENT: Self = Self::new("neonix-segment-v1");
    pub const CHANNEL_GROUP: Self = Self::new("neonix-channelgroup-v1");
    pub const ANALOG_SIGNAL: Self = Self::new("neonix-analogsignal-v1");
    pub const IRREGULAR_SIGNAL: Self = Self::new("neonix-irregularsignal-v1");
    pub const EVENT: Self = Self::new("neonix-event-v1");
    pub const EPOCH: Self = Self::new("neonix-epoch-v1");
    pub const SPIKE_TRAIN: Self = Self::new("neonix-spiketrain-v1");
    pub const UNIT: Self = Self::new("neonix-unit-v1");

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    pub const fn for_kind(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Block => Self::BLOCK,
            ObjectKind::Segment => Self::SEGMENT,
            ObjectKind::ChannelGroup => Self::CHANNEL_GROUP,
            ObjectKind::AnalogSignal => Self::ANALOG_SIGNAL,
            ObjectKind::IrregularlySampledSignal => Self::IRREGULAR_SIGNAL,
            ObjectKind::Event => Self::EVENT,
            ObjectKind::Epoch => Self::EPOCH,
            ObjectKind::SpikeTrain => Self::SPIKE_TRAIN,
            ObjectKind::Unit => Self::UNIT,
        }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut writer = self.writer();
        writer.raw(data);
        writer.finish()
    }

    /// Start a typed field encoding under this hasher's domain.
    pub fn writer(&self) -> DigestWriter {
        let mut inner = blake3::Hasher::new();
        inner.update(self.domain.as_bytes());
        inner.update(b":");
        DigestWriter { inner }
    }

    pub fn domain(&self) -> &str {
        self.domain
    }
}

// Field tags. Every field is tagged and length-prefixed so that adjacent
// fields can never run together.
const TAG_NONE: u8 = 0;
const TAG_STR: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_BOOL: u8 = 4;
const TAG_TIME: u8 = 5;
const TAG_FLOATS: u8 = 6;
const TAG_INTS: u8 = 7;
const TAG_STRS: u8 = 8;
const TAG_ARRAY: u8 = 9;
const TAG_MAP: u8 = 10;
const TAG_PLACEHOLDER: u8 = 11;

/// Incremental typed encoder feeding a BLAKE3 hasher.
pub struct DigestWriter {
    inner: blake3::Hasher,
}

impl DigestWriter {
    fn tag(&mut self, tag: u8) -> &mut Self {
        self.inner.update(&[tag]);
        self
    }

    fn len(&mut self, len: usize) -> &mut Self {
        self.inner.update(&(len as u64).to_le_bytes());
        self
    }

    fn raw(&mut self, data: &[u8]) -> &mut Self {
        self.len(data.len());
        self.inner.update(data);
        self
    }

    pub fn none(&mut self) -> &mut Self {
        self.tag(TAG_NONE)
    }

    pub fn str(&mut self, s: &str) -> &mut Self {
        self.tag(TAG_STR).raw(s.as_bytes())
    }

    pub fn opt_str(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => self.str(s),
            None => self.none(),
        }
    }

    pub fn int(&mut self, v: i64) -> &mut Self {
        self.tag(TAG_INT);
        self.inner.update(&v.to_le_bytes());
        self
    }

    /// Floats are hashed by bit pattern, so `-0.0` and `0.0` differ.
    pub fn float(&mut self, v: f64) -> &mut Self {
        self.tag(TAG_FLOAT);
        self.inner.update(&v.to_bits().to_le_bytes());
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.tag(TAG_BOOL);
        self.inner.update(&[u8::from(v)]);
        self
    }

    pub fn datetime(&mut self, v: Option<&NaiveDateTime>) -> &mut Self {
        match v {
            Some(dt) => {
                let utc = dt.and_utc();
                self.tag(TAG_TIME);
                self.inner.update(&utc.timestamp().to_le_bytes());
                self.inner.update(&utc.timestamp_subsec_nanos().to_le_bytes());
                self
            }
            None => self.none(),
        }
    }

    pub fn floats(&mut self, values: &[f64]) -> &mut Self {
        self.tag(TAG_FLOATS).len(values.len());
        for v in values {
            self.inner.update(&v.to_bits().to_le_bytes());
        }
        self
    }

    pub fn ints(&mut self, values: &[i64]) -> &mut Self {
        self.tag(TAG_INTS).len(values.len());
        for v in values {
            self.inner.update(&v.to_le_bytes());
        }
        self
    }

    pub fn strs<S: AsRef<str>>(&mut self, values: &[S]) -> &mut Self {
        self.tag(TAG_STRS).len(values.len());
        for v in values {
            self.raw(v.as_ref().as_bytes());
        }
        self
    }

    pub fn quantity(&mut self, q: &Quantity) -> &mut Self {
        self.float(q.magnitude).str(&q.units)
    }

    pub fn opt_quantity(&mut self, q: Option<&Quantity>) -> &mut Self {
        match q {
            Some(q) => self.quantity(q),
            None => self.none(),
        }
    }

    pub fn quantity_array(&mut self, a: &QuantityArray) -> &mut Self {
        self.floats(&a.values).str(&a.units)
    }

    /// Shape, then values in row-major order. Placeholders hash their shape
    /// under a distinct tag.
    pub fn samples(&mut self, s: &Samples) -> &mut Self {
        let shape: Vec<i64> = s.shape().iter().map(|&d| d as i64).collect();
        self.ints(&shape);
        if s.is_placeholder() {
            self.tag(TAG_PLACEHOLDER)
        } else {
            self.floats(s.values())
        }
    }

    /// Annotations in key order with typed values.
    pub fn annotations(&mut self, annotations: &Annotations) -> &mut Self {
        self.tag(TAG_MAP).len(annotations.len());
        for (key, value) in annotations {
            self.str(key);
            self.annotation_value(value);
        }
        self
    }

    fn annotation_value(&mut self, value: &AnnotationValue) -> &mut Self {
        match value {
            AnnotationValue::Str(s) => self.str(s),
            AnnotationValue::Int(i) => self.int(*i),
            AnnotationValue::Float(f) => self.float(*f),
            AnnotationValue::Bool(b) => self.bool(*b),
            AnnotationValue::Timestamp(t) => self.datetime(Some(t)),
            AnnotationValue::Array(items) => {
                self.tag(TAG_ARRAY).len(items.len());
                for item in items {
                    match item {
                        Scalar::Str(s) => self.str(s),
                        Scalar::Int(i) => self.int(*i),
                        Scalar::Float(f) => self.float(*f),
                        Scalar::Bool(b) => self.bool(*b),
                    };
                }
                self
            }
            AnnotationValue::Nested(map) => self.annotations(map),
            AnnotationValue::Quantity(q) => self.quantity(q),
        }
    }

    pub fn finish(&self) -> Digest {
        Digest::from_hash(*self.inner.finalize().as_bytes())
    }
}
