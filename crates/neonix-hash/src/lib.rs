//! Content hashing for neonix.
//!
//! Provides domain-separated BLAKE3 hashing with a typed, length-prefixed
//! field encoding, and [`digest`], the fingerprint of one domain object's own
//! attributes and payload.
//!
//! The fingerprint answers "did this object's own data change". Descendants
//! and cross-references are excluded, so a block's digest is unaffected by
//! edits to its segments.

pub mod hasher;
pub mod object;

pub use hasher::{ContentHasher, DigestWriter};
pub use object::digest;
