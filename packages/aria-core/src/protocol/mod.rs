//! Wire protocol: record framing and the command vocabulary.

pub mod framing;
pub mod vocabulary;

pub use framing::{Record, RecordCodec};
pub use vocabulary::Pattern;
