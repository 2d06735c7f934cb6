use crate::ports::{FilterEnginePort, QueryLogPort};
use ferrous_sieve_domain::{
    AddParams, AnswerRecord, ClientProto, DnsQuestion, FilterRequest, RecordType, Verdict,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A query as seen by the resolver after it has been answered.
#[derive(Debug, Clone)]
pub struct IncomingQuery {
    pub question: DnsQuestion,
    pub client_ip: IpAddr,
    pub client_id: Option<Arc<str>>,
    pub client_proto: ClientProto,
    pub answer: Vec<AnswerRecord>,
    pub elapsed: Duration,
    pub cached: bool,
    pub authenticated_data: bool,
    pub req_ecs: Option<Arc<str>>,
    pub upstream: Option<Arc<str>>,
}

impl IncomingQuery {
    pub fn new(question: DnsQuestion, client_ip: IpAddr) -> Self {
        Self {
            question,
            client_ip,
            client_id: None,
            client_proto: ClientProto::Plain,
            answer: Vec::new(),
            elapsed: Duration::ZERO,
            cached: false,
            authenticated_data: false,
            req_ecs: None,
            upstream: None,
        }
    }
}

pub struct ProcessQueryUseCase {
    engine: Arc<dyn FilterEnginePort>,
    query_log: Arc<dyn QueryLogPort>,
}

impl ProcessQueryUseCase {
    pub fn new(engine: Arc<dyn FilterEnginePort>, query_log: Arc<dyn QueryLogPort>) -> Self {
        Self { engine, query_log }
    }

    /// Filters the question, then the answer, and records the outcome.
    pub fn execute(&self, query: IncomingQuery) -> Verdict {
        let verdict = self.check(&query);

        let ip = query.client_ip.to_string();
        let mut ids: Vec<&str> = vec![ip.as_str()];
        if let Some(id) = query.client_id.as_deref() {
            ids.push(id);
        }

        let logged = self.query_log.should_log(
            &query.question.name,
            query.question.query_type,
            query.question.query_class,
            &ids,
        );

        if !logged {
            debug!(host = %query.question.name, "Query suppressed from query log");
            return verdict;
        }

        let (answer, orig_answer) = if verdict.is_blocked() {
            (Vec::new(), Some(query.answer))
        } else {
            (query.answer, None)
        };

        self.query_log.add(AddParams {
            questions: vec![query.question],
            answer,
            orig_answer,
            verdict: Some(verdict.clone()),
            client_id: query.client_id,
            client_proto: query.client_proto,
            client_ip: Some(query.client_ip),
            elapsed: query.elapsed,
            cached: query.cached,
            authenticated_data: query.authenticated_data,
            req_ecs: query.req_ecs,
            upstream: query.upstream,
        });

        verdict
    }

    fn check(&self, query: &IncomingQuery) -> Verdict {
        let request = FilterRequest::new(
            Arc::clone(&query.question.name),
            query.question.query_type,
        );
        let verdict = self.engine.filter_request(&request);
        if verdict.is_matched() {
            return verdict;
        }

        for record in &query.answer {
            let target = match record.record_type {
                RecordType::CNAME | RecordType::A | RecordType::AAAA => &record.value,
                _ => continue,
            };

            let request = FilterRequest::answer(Arc::clone(target), query.question.query_type);
            let verdict = self.engine.filter_request(&request);
            if verdict.is_blocked() {
                debug!(
                    host = %query.question.name,
                    target = %target,
                    "Answer matched a block rule"
                );
                return verdict;
            }
        }

        Verdict::NoMatch
    }
}
