mod timestamp;

pub use timestamp::{DEFAULT_PATTERNS, DateFormats, Timestamp};
