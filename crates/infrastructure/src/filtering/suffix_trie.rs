use compact_str::CompactString;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::collections::HashMap;

pub type RuleId = u32;

#[derive(Clone, Copy)]
struct TrieRule {
    id: RuleId,
    /// `||host^` also covers `host` itself, `*.host` only its subdomains.
    includes_apex: bool,
}

#[derive(Default)]
struct TrieNode {
    children: HashMap<CompactString, TrieNode, FxBuildHasher>,
    rules: SmallVec<[TrieRule; 1]>,
}

/// Domain suffix index keyed by reversed labels.
#[derive(Default)]
pub struct SuffixTrie {
    root: TrieNode,
    len: usize,
}

impl SuffixTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, domain: &str, id: RuleId, includes_apex: bool) {
        let domain = domain.strip_prefix("*.").unwrap_or(domain);
        let mut node = &mut self.root;
        for label in domain.split('.').rev() {
            node = node.children.entry(CompactString::new(label)).or_default();
        }
        node.rules.push(TrieRule { id, includes_apex });
        self.len += 1;
    }

    /// Rules covering `domain`, most specific suffix first.
    #[inline]
    pub fn lookup(&self, domain: &str) -> SmallVec<[RuleId; 4]> {
        let labels: SmallVec<[&str; 8]> = domain.split('.').rev().collect();
        let n = labels.len();
        let mut node = &self.root;
        let mut hits: SmallVec<[RuleId; 4]> = SmallVec::new();

        for (i, label) in labels.iter().enumerate() {
            match node.children.get(*label) {
                Some(child) => {
                    let is_apex = i + 1 == n;
                    for rule in &child.rules {
                        if !is_apex || rule.includes_apex {
                            hits.push(rule.id);
                        }
                    }
                    node = child;
                }
                None => break,
            }
        }

        hits.reverse();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_excludes_apex() {
        let mut trie = SuffixTrie::new();
        trie.insert("*.ads.example", 7, false);

        assert_eq!(trie.lookup("x.ads.example").as_slice(), &[7]);
        assert_eq!(trie.lookup("a.b.ads.example").as_slice(), &[7]);
        assert!(trie.lookup("ads.example").is_empty());
        assert!(trie.lookup("example").is_empty());
    }

    #[test]
    fn test_anchored_rule_includes_apex() {
        let mut trie = SuffixTrie::new();
        trie.insert("tracker.example", 1, true);

        assert_eq!(trie.lookup("tracker.example").as_slice(), &[1]);
        assert_eq!(trie.lookup("cdn.tracker.example").as_slice(), &[1]);
        assert!(trie.lookup("nottracker.example").is_empty());
    }

    #[test]
    fn test_most_specific_first() {
        let mut trie = SuffixTrie::new();
        trie.insert("example", 1, true);
        trie.insert("ads.example", 2, true);

        assert_eq!(trie.lookup("x.ads.example").as_slice(), &[2, 1]);
        assert_eq!(trie.len(), 2);
    }
}
