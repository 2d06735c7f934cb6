#![allow(dead_code)]
use ferrous_sieve_domain::{AddParams, ClientProto, DnsQuestion, RecordType, Verdict};
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

pub struct AddParamsBuilder {
    host: String,
    record_type: RecordType,
    client_ip: Option<IpAddr>,
    client_proto: ClientProto,
    verdict: Option<Verdict>,
    elapsed: Duration,
    extra_question: bool,
}

impl AddParamsBuilder {
    pub fn new() -> Self {
        Self {
            host: "example.com".to_string(),
            record_type: RecordType::A,
            client_ip: Some(IpAddr::from_str("192.168.1.100").unwrap()),
            client_proto: ClientProto::Plain,
            verdict: None,
            elapsed: Duration::from_micros(150),
            extra_question: false,
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    pub fn client_ip(mut self, ip: Option<&str>) -> Self {
        self.client_ip = ip.map(|s| IpAddr::from_str(s).unwrap());
        self
    }

    pub fn client_proto(mut self, proto: ClientProto) -> Self {
        self.client_proto = proto;
        self
    }

    pub fn verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn with_extra_question(mut self) -> Self {
        self.extra_question = true;
        self
    }

    pub fn build(self) -> AddParams {
        let mut questions = vec![DnsQuestion::new(self.host.as_str(), self.record_type)];
        if self.extra_question {
            questions.push(DnsQuestion::new("second.example", RecordType::AAAA));
        }

        AddParams {
            questions,
            client_ip: self.client_ip,
            client_proto: self.client_proto,
            verdict: self.verdict,
            elapsed: self.elapsed,
            ..Default::default()
        }
    }
}
