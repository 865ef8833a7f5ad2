//! Measured samples and the concurrent sink that collects them.
mod sink;
mod types;


pub use sink::{MemorySink, SampleSink, TracingSink};
pub use types::{Sample, SampleStatus, format_ms};
