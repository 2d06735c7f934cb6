mod metrics;
mod ring_buffer;
mod rotation;
mod service;
mod writer;

pub use metrics::QueryMetrics;
pub use ring_buffer::RingBuffer;
pub use rotation::{LogFiles, RotationPolicy, LOG_FILE_NAME};
pub use service::{QueryLog, QueryLogBuilder, QueryLogState};
pub use writer::QueryLogWriter;
