use super::compiler::{parse_list_line, DnsTypes, ParsedLine, ParsedRule, RuleTarget};
use super::suffix_trie::{RuleId, SuffixTrie};
use aho_corasick::AhoCorasick;
use compact_str::CompactString;
use fancy_regex::Regex;
use ferrous_sieve_domain::{FilterAction, RecordType};
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

type IdList = SmallVec<[RuleId; 1]>;

struct RuleMeta {
    text: Arc<str>,
    dnstypes: Option<DnsTypes>,
}

impl RuleMeta {
    #[inline]
    fn applies_to(&self, qtype: RecordType) -> bool {
        match &self.dnstypes {
            Some(types) => types.contains(&qtype),
            None => true,
        }
    }
}

#[derive(Default)]
struct ActionIndex {
    exact: HashMap<CompactString, IdList, FxBuildHasher>,
    suffixes: SuffixTrie,
    pattern_texts: Vec<(String, RuleId)>,
    patterns: Option<(AhoCorasick, Vec<RuleId>)>,
    regexes: Vec<(Regex, RuleId)>,
    ips: HashMap<IpAddr, IdList, FxBuildHasher>,
}

impl ActionIndex {
    fn build_patterns(&mut self) {
        if self.pattern_texts.is_empty() {
            return;
        }

        let texts: Vec<&str> = self.pattern_texts.iter().map(|(t, _)| t.as_str()).collect();
        match AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&texts)
        {
            Ok(ac) => {
                let ids = self.pattern_texts.iter().map(|(_, id)| *id).collect();
                self.patterns = Some((ac, ids));
            }
            Err(e) => {
                debug!(error = %e, "Failed to build substring automaton; patterns skipped");
            }
        }
        self.pattern_texts = Vec::new();
    }
}

/// Immutable, match-ready form of one filter's rule text.
pub struct CompiledRuleSet {
    rules: Vec<RuleMeta>,
    allow: ActionIndex,
    block: ActionIndex,
    skipped: usize,
}

impl CompiledRuleSet {
    pub fn compile(text: &str) -> Self {
        let mut set = Self {
            rules: Vec::new(),
            allow: ActionIndex::default(),
            block: ActionIndex::default(),
            skipped: 0,
        };

        for line in text.lines() {
            match parse_list_line(line) {
                ParsedLine::Rule(rule) => {
                    if !set.insert(line.trim(), rule) {
                        set.skipped += 1;
                    }
                }
                ParsedLine::Empty => {}
                ParsedLine::Invalid => set.skipped += 1,
            }
        }

        set.allow.build_patterns();
        set.block.build_patterns();
        set
    }

    fn insert(&mut self, line: &str, rule: ParsedRule) -> bool {
        let id = self.rules.len() as RuleId;
        let index = match rule.action {
            FilterAction::Allow => &mut self.allow,
            FilterAction::Block => &mut self.block,
        };

        match rule.target {
            RuleTarget::Exact(host) => {
                index.exact.entry(CompactString::new(host)).or_default().push(id);
            }
            RuleTarget::Subtree(host) => index.suffixes.insert(&host, id, true),
            RuleTarget::Wildcard(host) => index.suffixes.insert(&host, id, false),
            RuleTarget::Pattern(text) => index.pattern_texts.push((text, id)),
            RuleTarget::Regex(pattern) => match Regex::new(&format!("(?i){}", pattern)) {
                Ok(re) => index.regexes.push((re, id)),
                Err(e) => {
                    debug!(rule = %line, error = %e, "Skipping invalid regex rule");
                    return false;
                }
            },
            RuleTarget::Ip(ip) => index.ips.entry(ip).or_default().push(id),
        }

        self.rules.push(RuleMeta {
            text: Arc::from(line),
            dnstypes: rule.dnstypes,
        });
        true
    }

    pub fn rules_count(&self) -> usize {
        self.rules.len()
    }

    /// Non-comment lines that produced no rule.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn rule_text(&self, id: RuleId) -> Option<&Arc<str>> {
        self.rules.get(id as usize).map(|r| &r.text)
    }

    pub fn matching_rule(
        &self,
        action: FilterAction,
        host: &str,
        answer_ip: Option<IpAddr>,
        qtype: RecordType,
    ) -> Option<&Arc<str>> {
        self.find(action, host, answer_ip, qtype)
            .and_then(|id| self.rule_text(id))
    }

    /// First rule of `action` matching the normalized `host`, most specific
    /// kind first: exact host, domain suffix, substring, regex. `answer_ip`
    /// is only set for answer checks and is matched against address rules.
    pub fn find(
        &self,
        action: FilterAction,
        host: &str,
        answer_ip: Option<IpAddr>,
        qtype: RecordType,
    ) -> Option<RuleId> {
        let index = match action {
            FilterAction::Allow => &self.allow,
            FilterAction::Block => &self.block,
        };
        let applies = |id: RuleId| self.rules[id as usize].applies_to(qtype);

        if let Some(ip) = answer_ip {
            let hit = index
                .ips
                .get(&ip)
                .and_then(|ids| ids.iter().copied().find(|id| applies(*id)));
            if hit.is_some() {
                return hit;
            }
        }

        let hit = index
            .exact
            .get(host)
            .and_then(|ids| ids.iter().copied().find(|id| applies(*id)));
        if hit.is_some() {
            return hit;
        }

        if !index.suffixes.is_empty() {
            let hit = index
                .suffixes
                .lookup(host)
                .into_iter()
                .find(|id| applies(*id));
            if hit.is_some() {
                return hit;
            }
        }

        if let Some((ac, ids)) = &index.patterns {
            let hit = ac
                .find_overlapping_iter(host)
                .map(|m| ids[m.pattern().as_usize()])
                .filter(|id| applies(*id))
                .min();
            if hit.is_some() {
                return hit;
            }
        }

        index
            .regexes
            .iter()
            .find(|(re, id)| applies(*id) && re.is_match(host).unwrap_or(false))
            .map(|(_, id)| *id)
    }
}
