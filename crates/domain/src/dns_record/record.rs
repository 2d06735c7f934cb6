use super::RecordType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Summary of one answer resource record as stored in the query log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub name: Arc<str>,

    #[serde(rename = "type")]
    pub record_type: RecordType,

    pub ttl: u32,

    /// Presentation form of the record data, e.g. `93.184.216.34` or a
    /// CNAME target.
    pub value: Arc<str>,
}

impl AnswerRecord {
    pub fn new(
        name: impl Into<Arc<str>>,
        record_type: RecordType,
        ttl: u32,
        value: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            ttl,
            value: value.into(),
        }
    }
}
