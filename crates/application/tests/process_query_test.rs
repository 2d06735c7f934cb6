mod helpers;

use ferrous_sieve_application::use_cases::{IncomingQuery, ProcessQueryUseCase};
use ferrous_sieve_domain::{AnswerRecord, DnsQuestion, RecordType, Verdict};
use helpers::mock_ports::{allow, block, MockFilterEngine, MockQueryLog};
use std::net::IpAddr;
use std::sync::Arc;

fn query(host: &str) -> IncomingQuery {
    let ip: IpAddr = "192.168.1.10".parse().unwrap();
    IncomingQuery::new(DnsQuestion::new(host, RecordType::A), ip)
}

fn setup() -> (Arc<MockFilterEngine>, Arc<MockQueryLog>, ProcessQueryUseCase) {
    let engine = Arc::new(MockFilterEngine::new());
    let log = Arc::new(MockQueryLog::new());
    let use_case = ProcessQueryUseCase::new(engine.clone(), log.clone());
    (engine, log, use_case)
}

#[test]
fn test_unmatched_query_is_logged_with_no_match() {
    let (_, log, use_case) = setup();

    let verdict = use_case.execute(query("ok.example"));

    assert_eq!(verdict, Verdict::NoMatch);
    let added = log.added();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].verdict, Some(Verdict::NoMatch));
    assert_eq!(&*added[0].questions[0].name, "ok.example");
}

#[test]
fn test_blocked_query_moves_answer_to_orig_answer() {
    let (engine, log, use_case) = setup();
    engine.set_verdict("ads.example", block("||ads.example^"));

    let mut q = query("ads.example");
    q.answer = vec![AnswerRecord::new("ads.example", RecordType::A, 60, "10.0.0.1")];
    let verdict = use_case.execute(q);

    assert!(verdict.is_blocked());
    let added = log.added();
    assert!(added[0].answer.is_empty());
    assert_eq!(added[0].orig_answer.as_ref().map(Vec::len), Some(1));
}

#[test]
fn test_allowed_query_keeps_answer() {
    let (engine, log, use_case) = setup();
    engine.set_verdict("good.example", allow("@@||good.example^"));

    let mut q = query("good.example");
    q.answer = vec![AnswerRecord::new("good.example", RecordType::A, 60, "10.0.0.2")];
    let verdict = use_case.execute(q);

    assert!(verdict.is_matched());
    assert!(!verdict.is_blocked());
    assert_eq!(log.added()[0].answer.len(), 1);
}

#[test]
fn test_cname_target_is_checked_as_answer() {
    let (engine, _, use_case) = setup();
    engine.set_verdict("tracker.cdn.example", block("||tracker.cdn.example^"));

    let mut q = query("www.shop.example");
    q.answer = vec![AnswerRecord::new(
        "www.shop.example",
        RecordType::CNAME,
        300,
        "tracker.cdn.example",
    )];
    let verdict = use_case.execute(q);

    assert!(verdict.is_blocked());
    let requests = engine.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].is_answer);
    assert!(requests[1].is_answer);
}

#[test]
fn test_answer_check_uses_question_type() {
    let (engine, _, use_case) = setup();

    let ip: IpAddr = "192.168.1.10".parse().unwrap();
    let mut q = IncomingQuery::new(DnsQuestion::new("www.shop.example", RecordType::AAAA), ip);
    q.answer = vec![
        AnswerRecord::new("www.shop.example", RecordType::CNAME, 300, "edge.cdn.example"),
        AnswerRecord::new("edge.cdn.example", RecordType::AAAA, 300, "2001:db8::1"),
    ];
    use_case.execute(q);

    let requests = engine.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1..]
        .iter()
        .all(|r| r.is_answer && r.query_type == RecordType::AAAA));
}

#[test]
fn test_ignored_host_not_logged() {
    let (_, log, use_case) = setup();
    log.ignore_host("quiet.example");

    use_case.execute(query("quiet.example"));

    assert!(log.added().is_empty());
}

#[test]
fn test_ignored_client_not_logged_but_still_filtered() {
    let (engine, log, use_case) = setup();
    engine.set_verdict("ads.example", block("||ads.example^"));
    log.ignore_client("192.168.1.10");

    let verdict = use_case.execute(query("ads.example"));

    assert!(verdict.is_blocked());
    assert!(log.added().is_empty());
}

#[test]
fn test_client_id_passed_to_should_log() {
    let (_, log, use_case) = setup();
    log.ignore_client("laptop");

    let mut q = query("example.com");
    q.client_id = Some(Arc::from("laptop"));
    use_case.execute(q);

    assert!(log.added().is_empty());
}
