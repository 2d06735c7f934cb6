#![allow(dead_code)]

use async_trait::async_trait;
use ferrous_sieve_application::ports::{FilterEnginePort, QueryLogPort};
use ferrous_sieve_domain::{
    AddParams, DnsClass, DomainError, Filter, FilterAction, FilterLocator, FilterRequest,
    MatchedRule, RecordType, Verdict,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub fn block(rule: &str) -> Verdict {
    Verdict::Matched(MatchedRule {
        action: FilterAction::Block,
        rule: Arc::from(rule),
        filter_id: 1,
        filter_name: Arc::from("mock"),
    })
}

pub fn allow(rule: &str) -> Verdict {
    Verdict::Matched(MatchedRule {
        action: FilterAction::Allow,
        rule: Arc::from(rule),
        filter_id: 2,
        filter_name: Arc::from("mock-allow"),
    })
}

#[derive(Default)]
pub struct MockFilterEngine {
    verdicts: Mutex<HashMap<String, Verdict>>,
    requests: Mutex<Vec<FilterRequest>>,
    refresh_result: Mutex<Option<DomainError>>,
    filters: Mutex<Vec<Filter>>,
}

impl MockFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_verdict(&self, host: &str, verdict: Verdict) {
        self.verdicts
            .lock()
            .unwrap()
            .insert(host.to_string(), verdict);
    }

    pub fn fail_refresh_with(&self, error: DomainError) {
        *self.refresh_result.lock().unwrap() = Some(error);
    }

    pub fn add_filter(&self, id: u64, compiled: bool, rules: usize) {
        let mut filter = Filter::new(id, format!("filter-{}", id), FilterLocator::parse("/tmp/x").unwrap());
        if compiled {
            filter.last_updated = Some(chrono::Utc::now());
            filter.checksum = Some(format!("{:064x}", id).into());
            filter.rules_count = rules;
        }
        self.filters.lock().unwrap().push(filter);
    }

    pub fn requests(&self) -> Vec<FilterRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FilterEnginePort for MockFilterEngine {
    fn filter_request(&self, request: &FilterRequest) -> Verdict {
        self.requests.lock().unwrap().push(request.clone());
        self.verdicts
            .lock()
            .unwrap()
            .get(&*request.hostname)
            .cloned()
            .unwrap_or_default()
    }

    async fn refresh(&self) -> Result<(), DomainError> {
        match self.refresh_result.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn filters(&self) -> Vec<Filter> {
        self.filters.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MockQueryLog {
    ignored_hosts: Mutex<HashSet<String>>,
    ignored_ids: Mutex<HashSet<String>>,
    added: Mutex<Vec<AddParams>>,
}

impl MockQueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_host(&self, host: &str) {
        self.ignored_hosts.lock().unwrap().insert(host.to_string());
    }

    pub fn ignore_client(&self, id: &str) {
        self.ignored_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn added(&self) -> Vec<AddParams> {
        self.added.lock().unwrap().clone()
    }
}

impl QueryLogPort for MockQueryLog {
    fn should_log(&self, host: &str, _: RecordType, _: DnsClass, ids: &[&str]) -> bool {
        if ids
            .iter()
            .any(|id| self.ignored_ids.lock().unwrap().contains(*id))
        {
            return false;
        }
        !self.ignored_hosts.lock().unwrap().contains(host)
    }

    fn add(&self, params: AddParams) {
        self.added.lock().unwrap().push(params);
    }
}
