//! ROOT object deserialization dispatch.

mod th;

use crate::error::Result;
use crate::histogram::Histogram;

pub use th::is_supported as is_supported_histogram;

/// Read a histogram from a decompressed object payload, given its class name.
pub fn read_histogram(payload: &[u8], class_name: &str) -> Result<Histogram> {
    th::read(payload, class_name)
}

/// Serialize a histogram payload, returning it with the class name to store in its key.
pub fn write_histogram(h: &Histogram) -> (&'static str, Vec<u8>) {
    (th::class_name_for(h), th::write(h))
}
