//! Rule list line parser.
//!
//! Accepted syntax, one rule per line:
//!
//! - `! comment`, `# comment`
//! - hosts file lines: `0.0.0.0 ads.example`, `127.0.0.1 ads.example`
//! - bare domains: `ads.example` (exact host only)
//! - `||ads.example^`: the host and all of its subdomains
//! - `*.ads.example`, `||*.ads.example^`: subdomains only
//! - `*track*`: substring of the host
//! - `/^ad[0-9]+\./`: regular expression over the host
//! - `||192.0.2.1^` or a bare address: matches answer addresses only
//! - `@@` prefix turns any of the above into an allow rule
//! - `$dnstype=A|AAAA` restricts a rule to the listed query types

use ferrous_sieve_domain::{FilterAction, RecordType};
use smallvec::SmallVec;
use std::net::IpAddr;

pub type DnsTypes = SmallVec<[RecordType; 2]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    Exact(String),
    Subtree(String),
    Wildcard(String),
    Pattern(String),
    Regex(String),
    Ip(IpAddr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    pub action: FilterAction,
    pub target: RuleTarget,
    pub dnstypes: Option<DnsTypes>,
}

/// Outcome of parsing one line.
#[derive(Debug, PartialEq, Eq)]
pub enum ParsedLine {
    Rule(ParsedRule),
    /// Blank line or comment.
    Empty,
    /// A line that looked like a rule but could not be understood.
    Invalid,
}

pub fn parse_list_line(line: &str) -> ParsedLine {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return ParsedLine::Empty;
    }

    match parse_rule(line) {
        Some(rule) => ParsedLine::Rule(rule),
        None => ParsedLine::Invalid,
    }
}

fn parse_rule(line: &str) -> Option<ParsedRule> {
    let (action, body) = match line.strip_prefix("@@") {
        Some(rest) => (FilterAction::Allow, rest),
        None => (FilterAction::Block, line),
    };

    if body.starts_with('/') {
        return parse_regex_rule(action, body);
    }

    let (rule, modifiers) = match body.split_once('$') {
        Some((rule, modifiers)) => (rule, Some(modifiers)),
        None => (body, None),
    };
    let dnstypes = match modifiers {
        Some(m) => Some(parse_modifiers(m)?),
        None => None,
    };

    let target = parse_target(action, rule.trim())?;
    Some(ParsedRule {
        action,
        target,
        dnstypes,
    })
}

fn parse_regex_rule(action: FilterAction, body: &str) -> Option<ParsedRule> {
    let end = body.rfind('/')?;
    if end == 0 {
        return None;
    }

    let pattern = &body[1..end];
    if pattern.is_empty() {
        return None;
    }

    let rest = body[end + 1..].trim();
    let dnstypes = if rest.is_empty() {
        None
    } else {
        Some(parse_modifiers(rest.strip_prefix('$')?)?)
    };

    Some(ParsedRule {
        action,
        target: RuleTarget::Regex(pattern.to_string()),
        dnstypes,
    })
}

/// Only `dnstype` is understood; a rule carrying any other modifier is
/// rejected rather than applied more broadly than intended.
fn parse_modifiers(modifiers: &str) -> Option<DnsTypes> {
    let mut types = DnsTypes::new();

    for modifier in modifiers.split(',') {
        let value = modifier.trim().strip_prefix("dnstype=")?;
        for name in value.split('|') {
            types.push(name.trim().parse::<RecordType>().ok()?);
        }
    }

    if types.is_empty() {
        return None;
    }
    Some(types)
}

fn parse_target(action: FilterAction, rule: &str) -> Option<RuleTarget> {
    if let Some(inner) = rule.strip_prefix("||") {
        let host = inner
            .strip_suffix("^|")
            .or_else(|| inner.strip_suffix('^'))
            .unwrap_or(inner)
            .to_ascii_lowercase();

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Some(RuleTarget::Ip(ip));
        }
        if let Some(domain) = host.strip_prefix("*.") {
            return is_hostname(domain).then(|| RuleTarget::Wildcard(domain.to_string()));
        }
        return is_hostname(&host).then_some(RuleTarget::Subtree(host));
    }

    if rule.len() > 2 && rule.starts_with('*') && rule.ends_with('*') {
        let inner = rule[1..rule.len() - 1].to_ascii_lowercase();
        if inner.contains('*') || inner.is_empty() {
            return None;
        }
        return Some(RuleTarget::Pattern(inner));
    }

    if let Some(domain) = rule.strip_prefix("*.") {
        let domain = domain.to_ascii_lowercase();
        return is_hostname(&domain).then_some(RuleTarget::Wildcard(domain));
    }

    let parts: SmallVec<[&str; 4]> = rule.split_whitespace().collect();

    if parts.len() >= 2 {
        let is_hosts_addr = matches!(parts[0], "0.0.0.0" | "127.0.0.1" | "::" | "::1");
        if !is_hosts_addr || action == FilterAction::Allow {
            return None;
        }

        let domain = parts[1].to_ascii_lowercase();
        if matches!(
            domain.as_str(),
            "localhost" | "0.0.0.0" | "broadcasthost" | "ip6-localhost" | "ip6-loopback"
        ) {
            return None;
        }
        return is_hostname(&domain).then_some(RuleTarget::Exact(domain));
    }

    if parts.len() == 1 {
        if let Ok(ip) = parts[0].parse::<IpAddr>() {
            return Some(RuleTarget::Ip(ip));
        }
        let domain = parts[0].to_ascii_lowercase();
        return is_hostname(&domain).then_some(RuleTarget::Exact(domain));
    }

    None
}

fn is_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 || !s.contains('.') {
        return false;
    }

    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}
