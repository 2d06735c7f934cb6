use super::rule_set::CompiledRuleSet;
use super::source::{self, FetchOutcome};
use arc_swap::ArcSwap;
use chrono::Utc;
use ferrous_sieve_domain::{
    normalize_domain, DomainError, Filter, FilterAction, FilterRequest, MatchedRule, Verdict,
};
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Published state of the engine: every filter with the rule set it has in
/// service. Replaced as a whole, never mutated once published.
#[derive(Clone)]
pub struct CombinedIndex {
    filters: Vec<Filter>,
    rule_sets: Vec<Option<Arc<CompiledRuleSet>>>,
}

impl CombinedIndex {
    fn new(filters: Vec<Filter>) -> Self {
        let rule_sets = vec![None; filters.len()];
        Self { filters, rule_sets }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn rule_set(&self, filter_id: u64) -> Option<&Arc<CompiledRuleSet>> {
        let pos = self.filters.iter().position(|f| f.id == filter_id)?;
        self.rule_sets[pos].as_ref()
    }

    fn live(&self) -> impl Iterator<Item = (&Filter, &CompiledRuleSet)> {
        self.filters
            .iter()
            .zip(self.rule_sets.iter())
            .filter(|(filter, _)| filter.enabled)
            .filter_map(|(filter, rules)| rules.as_deref().map(|r| (filter, r)))
    }

    /// Allow rules from any filter win over block rules. Within one action
    /// the first filter in configuration order decides.
    pub fn filter_request(&self, request: &FilterRequest) -> Verdict {
        let host = normalize_domain(&request.hostname);
        let answer_ip = if request.is_answer {
            host.parse::<IpAddr>().ok()
        } else {
            None
        };

        for action in [FilterAction::Allow, FilterAction::Block] {
            for (filter, rules) in self.live() {
                if let Some(rule) =
                    rules.matching_rule(action, &host, answer_ip, request.query_type)
                {
                    return Verdict::Matched(MatchedRule {
                        action,
                        rule: Arc::clone(rule),
                        filter_id: filter.id,
                        filter_name: Arc::clone(&filter.name),
                    });
                }
            }
        }

        Verdict::NoMatch
    }
}

pub struct RuleListEngine {
    name: Arc<str>,
    index: ArcSwap<CombinedIndex>,
    refresh_gate: Mutex<()>,
    closed: AtomicBool,
}

impl RuleListEngine {
    pub fn new(name: impl Into<Arc<str>>, filters: Vec<Filter>) -> Self {
        Self {
            name: name.into(),
            index: ArcSwap::from_pointee(CombinedIndex::new(filters)),
            refresh_gate: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn filter_request(&self, request: &FilterRequest) -> Verdict {
        self.index.load().filter_request(request)
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.index.load().filters.clone()
    }

    pub fn snapshot(&self) -> Arc<CombinedIndex> {
        self.index.load_full()
    }

    /// Re-fetches and recompiles every enabled filter in order.
    ///
    /// Each filter that compiles is published on its own, so filters done
    /// before a failure or the deadline keep their new rule sets. A filter
    /// that fails keeps the rule set it had. Only one refresh runs at a
    /// time; a concurrent call gets [`DomainError::RefreshInProgress`].
    pub async fn refresh(
        &self,
        deadline: Instant,
        buf: &mut [u8],
        client: &reqwest::Client,
        cache_dir: &Path,
        max_size: u64,
    ) -> Result<(), DomainError> {
        let _gate = self
            .refresh_gate
            .try_lock()
            .map_err(|_| DomainError::RefreshInProgress)?;

        if self.closed.load(Ordering::Acquire) {
            return Err(DomainError::EngineClosed);
        }

        tokio::fs::create_dir_all(cache_dir)
            .await
            .map_err(|e| DomainError::IoError(format!("{}: {}", cache_dir.display(), e)))?;

        info!(engine = %self.name, "Filter refresh started");

        let filters = self.filters();
        let mut failed = Vec::new();

        for (pos, filter) in filters.iter().enumerate() {
            if !filter.enabled {
                continue;
            }

            if let Err(e) = self
                .refresh_filter(pos, filter, deadline, buf, client, cache_dir, max_size)
                .await
            {
                warn!(engine = %self.name, filter = %filter.name, error = %e, "Filter refresh failed");
                failed.push(filter.name.to_string());
            }
        }

        if failed.is_empty() {
            info!(engine = %self.name, "Filter refresh finished");
            Ok(())
        } else {
            Err(DomainError::RefreshFailed { failed })
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn refresh_filter(
        &self,
        pos: usize,
        filter: &Filter,
        deadline: Instant,
        buf: &mut [u8],
        client: &reqwest::Client,
        cache_dir: &Path,
        max_size: u64,
    ) -> Result<(), DomainError> {
        let (content, fetch_error) =
            match source::fetch(filter, deadline, buf, client, cache_dir, max_size).await? {
                FetchOutcome::Fresh(content) => (content, None),
                FetchOutcome::Cached { content, error } => (content, Some(error)),
            };

        let checksum: Arc<str> = Arc::from(hex_digest(&content));
        let now = Utc::now();
        let has_rules = self.index.load().rule_sets[pos].is_some();

        if has_rules && filter.checksum.as_deref() == Some(&*checksum) {
            debug!(filter = %filter.name, "Filter content unchanged, skipping compile");
            if fetch_error.is_none() {
                self.publish(pos, None, |f| f.last_updated = Some(now));
            }
        } else {
            let size_bytes = content.len() as u64;
            let text = String::from_utf8_lossy(&content).into_owned();
            drop(content);

            let rules = tokio::task::spawn_blocking(move || CompiledRuleSet::compile(&text))
                .await
                .map_err(|e| DomainError::FilterCompile {
                    filter: filter.name.to_string(),
                    reason: e.to_string(),
                })?;

            info!(
                filter = %filter.name,
                rules = rules.rules_count(),
                skipped = rules.skipped(),
                bytes = size_bytes,
                cached = fetch_error.is_some(),
                "Filter compiled"
            );

            let rules_count = rules.rules_count();
            let from_cache = fetch_error.is_some();
            self.publish(pos, Some(Arc::new(rules)), |f| {
                f.size_bytes = size_bytes;
                f.rules_count = rules_count;
                f.checksum = Some(Arc::clone(&checksum));
                if !from_cache {
                    f.last_updated = Some(now);
                }
            });
        }

        match fetch_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn publish<F>(&self, pos: usize, rules: Option<Arc<CompiledRuleSet>>, update: F)
    where
        F: Fn(&mut Filter),
    {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        self.index.rcu(|current| {
            let mut next = CombinedIndex::clone(current);
            update(&mut next.filters[pos]);
            if let Some(rules) = &rules {
                next.rule_sets[pos] = Some(Arc::clone(rules));
            }
            next
        });
    }

    /// Drops every compiled rule set. Later refreshes are rejected.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let filters = self.filters();
        self.index.store(Arc::new(CombinedIndex::new(filters)));
        info!(engine = %self.name, "Filter engine closed");
    }
}

fn hex_digest(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
