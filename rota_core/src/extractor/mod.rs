//! Decodes a solved assignment back into schedule events.

mod schedule_extractor;

pub use schedule_extractor::{decode_continuous, decode_discrete};
