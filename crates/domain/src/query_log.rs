use crate::dns_record::{AnswerRecord, DnsClass, RecordType};
use crate::errors::DomainError;
use crate::verdict::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Transport the client used to reach the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientProto {
    Doh,
    Doq,
    Dot,
    DnsCrypt,
    #[default]
    #[serde(rename = "")]
    Plain,
}

impl ClientProto {
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "doh" => Ok(ClientProto::Doh),
            "doq" => Ok(ClientProto::Doq),
            "dot" => Ok(ClientProto::Dot),
            "dnscrypt" => Ok(ClientProto::DnsCrypt),
            "" => Ok(ClientProto::Plain),
            _ => Err(DomainError::InvalidClientProto(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientProto::Doh => "doh",
            ClientProto::Doq => "doq",
            ClientProto::Dot => "dot",
            ClientProto::DnsCrypt => "dnscrypt",
            ClientProto::Plain => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: Arc<str>,
    pub query_type: RecordType,
    pub query_class: DnsClass,
}

impl DnsQuestion {
    pub fn new(name: impl Into<Arc<str>>, query_type: RecordType) -> Self {
        Self {
            name: name.into(),
            query_type,
            query_class: DnsClass::IN,
        }
    }
}

/// Everything the resolver knows about one processed query, handed to the
/// query log. Validated before use; an invalid value is dropped by the log.
#[derive(Debug, Clone, Default)]
pub struct AddParams {
    pub questions: Vec<DnsQuestion>,

    pub answer: Vec<AnswerRecord>,

    /// Answer before filtering rewrote it, if it was rewritten.
    pub orig_answer: Option<Vec<AnswerRecord>>,

    /// `None` is logged as [`Verdict::NoMatch`].
    pub verdict: Option<Verdict>,

    pub client_id: Option<Arc<str>>,
    pub client_proto: ClientProto,
    pub client_ip: Option<IpAddr>,

    pub elapsed: Duration,
    pub cached: bool,
    pub authenticated_data: bool,

    /// EDNS client subnet of the request, as `addr/prefix`.
    pub req_ecs: Option<Arc<str>>,

    pub upstream: Option<Arc<str>>,
}

impl AddParams {
    pub fn validate(&self) -> Result<(), DomainError> {
        let question = match self.questions.as_slice() {
            [] => return Err(DomainError::InvalidLogParams("no question".to_string())),
            [q] => q,
            _ => {
                return Err(DomainError::InvalidLogParams(
                    "more than one question".to_string(),
                ))
            }
        };

        if question.name.is_empty() {
            return Err(DomainError::InvalidLogParams(
                "no host in question".to_string(),
            ));
        }

        if self.client_ip.is_none() {
            return Err(DomainError::InvalidLogParams("no client ip".to_string()));
        }

        Ok(())
    }
}

/// Durable record of one processed query. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: DateTime<Utc>,

    #[serde(rename = "qh")]
    pub qhost: Arc<str>,
    #[serde(rename = "qt")]
    pub qtype: RecordType,
    #[serde(rename = "qc")]
    pub qclass: DnsClass,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "is_plain")]
    pub client_proto: ClientProto,
    pub ip: IpAddr,

    pub verdict: Verdict,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Arc<str>>,

    /// Processing time in microseconds.
    pub elapsed_us: u64,

    #[serde(default)]
    pub cached: bool,
    #[serde(default, rename = "ad")]
    pub authenticated_data: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<Arc<str>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answer: Vec<AnswerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_answer: Option<Vec<AnswerRecord>>,
}

fn is_plain(proto: &ClientProto) -> bool {
    *proto == ClientProto::Plain
}

impl LogEntry {
    /// Builds an entry from validated params, stamped with `time`.
    pub fn from_params(params: AddParams, time: DateTime<Utc>) -> Result<Self, DomainError> {
        params.validate()?;

        let AddParams {
            questions,
            answer,
            orig_answer,
            verdict,
            client_id,
            client_proto,
            client_ip,
            elapsed,
            cached,
            authenticated_data,
            req_ecs,
            upstream,
        } = params;

        let question = questions
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::InvalidLogParams("no question".to_string()))?;
        let ip = client_ip
            .ok_or_else(|| DomainError::InvalidLogParams("no client ip".to_string()))?;

        Ok(Self {
            time,
            qhost: Arc::from(normalize_domain(&question.name)),
            qtype: question.query_type,
            qclass: question.query_class,
            client_id,
            client_proto,
            ip,
            verdict: verdict.unwrap_or_default(),
            upstream,
            elapsed_us: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            cached,
            authenticated_data,
            ecs: req_ecs,
            answer,
            orig_answer,
        })
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }
}

/// Lowercases a domain name and strips the root label dot.
pub fn normalize_domain(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("Example.COM."), "example.com");
        assert_eq!(normalize_domain(" ads.tracker.net "), "ads.tracker.net");
        assert_eq!(normalize_domain("."), "");
    }

    #[test]
    fn test_client_proto_parse() {
        assert_eq!(ClientProto::parse("doh").unwrap(), ClientProto::Doh);
        assert_eq!(ClientProto::parse("").unwrap(), ClientProto::Plain);
        assert_eq!(
            ClientProto::parse("http"),
            Err(DomainError::InvalidClientProto("http".to_string()))
        );
    }
}
