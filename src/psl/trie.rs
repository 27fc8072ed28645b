//! Label trie used by all five PSL suffix tables (spec §3 "PSL data").
//!
//! Rules are inserted root-to-leaf from the *outermost* label inward, so
//! `"co.uk"` occupies the path `root -> "uk" -> "co"`. This lets
//! [`SuffixTrie::longest_match_len`] walk a candidate domain's labels (also
//! given outermost/TLD first) once and fall out with the longest rule
//! matched along the way, rather than re-testing every candidate suffix
//! from scratch.

use std::collections::HashMap;

#[derive(Default, Clone)]
struct Node {
    children: HashMap<String, Node>,
    is_end: bool,
}

#[derive(Default, Clone)]
pub struct SuffixTrie {
    root: Node,
}

impl SuffixTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a dotted rule, e.g. `"co.uk"` or a single label `"com"`.
    pub fn insert(&mut self, rule: &str) {
        let mut node = &mut self.root;
        for label in rule.rsplit('.') {
            node = node.children.entry(label.to_string()).or_default();
        }
        node.is_end = true;
    }

    /// True iff `labels` (outermost/TLD first) is exactly a rule.
    pub fn contains_exact(&self, labels_tld_first: &[&str]) -> bool {
        let mut node = &self.root;
        for label in labels_tld_first {
            match node.children.get(*label) {
                Some(next) => node = next,
                None => return false,
            }
        }
        node.is_end
    }

    /// Walks `labels` (outermost/TLD first) as far as the trie allows,
    /// returning the number of labels consumed at the deepest `is_end`
    /// node visited — i.e. the longest rule matched along this path.
    pub fn longest_match_len(&self, labels_tld_first: &[&str]) -> Option<usize> {
        let mut node = &self.root;
        let mut best = if node.is_end { Some(0) } else { None };
        for (i, label) in labels_tld_first.iter().enumerate() {
            match node.children.get(*label) {
                Some(next) => {
                    node = next;
                    if node.is_end {
                        best = Some(i + 1);
                    }
                }
                None => break,
            }
        }
        best
    }

    /// Copies every rule from `other` into `self`.
    pub fn merge_from(&mut self, other: &SuffixTrie) {
        Self::merge_node(&mut self.root, &other.root);
    }

    fn merge_node(target: &mut Node, source: &Node) {
        target.is_end |= source.is_end;
        for (label, child) in &source.children {
            let entry = target.children.entry(label.clone()).or_default();
            Self::merge_node(entry, child);
        }
    }
}
