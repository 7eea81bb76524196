//! Record encoding bridge
//!
//! Maps a caller-supplied logical record onto a metric's physical schema
//! and back. Unknown input is captured, never dropped: any key that fails
//! alias resolution lands in the base `unknown_fields` map as a string.

mod encoder;
mod record;
mod timestamp;

pub use encoder::RecordEncoder;
pub use record::{BaseFields, EncodedRecord, FieldSlot, LogicalRecord};
pub use timestamp::TimestampResolver;
