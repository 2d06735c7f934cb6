use crate::dns_record::RecordType;
use crate::filter::FilterId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Block,
    Allow,
}

impl FilterAction {
    pub fn to_str(&self) -> &'static str {
        match self {
            FilterAction::Block => "block",
            FilterAction::Allow => "allow",
        }
    }
}

impl std::fmt::Display for FilterAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// The rule responsible for a verdict and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub action: FilterAction,
    pub rule: Arc<str>,
    pub filter_id: FilterId,
    pub filter_name: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Verdict {
    #[default]
    NoMatch,
    Matched(MatchedRule),
}

impl Verdict {
    pub fn is_matched(&self) -> bool {
        matches!(self, Verdict::Matched(_))
    }

    pub fn is_blocked(&self) -> bool {
        self.action() == Some(FilterAction::Block)
    }

    pub fn action(&self) -> Option<FilterAction> {
        match self {
            Verdict::NoMatch => None,
            Verdict::Matched(m) => Some(m.action),
        }
    }

    pub fn matched_rule(&self) -> Option<&MatchedRule> {
        match self {
            Verdict::NoMatch => None,
            Verdict::Matched(m) => Some(m),
        }
    }
}

/// Input of a match against the combined index.
#[derive(Debug, Clone)]
pub struct FilterRequest {
    pub hostname: Arc<str>,
    pub query_type: RecordType,

    /// True when the hostname is taken from a response (a CNAME target or
    /// an answer address) rather than from the question.
    pub is_answer: bool,
}

impl FilterRequest {
    pub fn new(hostname: impl Into<Arc<str>>, query_type: RecordType) -> Self {
        Self {
            hostname: hostname.into(),
            query_type,
            is_answer: false,
        }
    }

    pub fn answer(hostname: impl Into<Arc<str>>, query_type: RecordType) -> Self {
        Self {
            is_answer: true,
            ..Self::new(hostname, query_type)
        }
    }
}
