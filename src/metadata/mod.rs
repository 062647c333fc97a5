//! Command/metadata parsing and staging (§3, §4.D, §4.E).

pub mod artwork;
pub mod parser;
pub mod staged;

pub use parser::{Message, parse_records};
pub use staged::StagedMetadata;
