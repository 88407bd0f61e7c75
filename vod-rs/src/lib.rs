pub mod format;
pub mod metadata;
pub mod record;
pub mod session;
pub mod timespan;

pub use format::{format_duration, format_file_size};
pub use metadata::*;
pub use record::VodRecord;
pub use session::RecordingSession;
