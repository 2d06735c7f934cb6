mod compiler;
mod engine;
mod rule_set;
mod service;
mod source;
mod suffix_trie;

pub use compiler::{parse_list_line, ParsedLine, ParsedRule, RuleTarget};
pub use engine::{CombinedIndex, RuleListEngine};
pub use rule_set::CompiledRuleSet;
pub use service::FilteringService;
pub use source::{cache_path, DEFAULT_RULE_BUF_SIZE};
pub use suffix_trie::{RuleId, SuffixTrie};
