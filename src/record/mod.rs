//! Table storage.

mod record_file;

pub use record_file::{RecordFile, MAX_VALUE_LEN, SLOTS_PER_PAGE};
