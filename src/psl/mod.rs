//! Public Suffix List engine (spec §4.1).
//!
//! Five suffix tables are maintained: registry-exact, registry-wildcard,
//! registry-exception, private-exact and private-wildcard. `isPublicSuffix`
//! and friends consult registry ∪ private; `isRegistrySuffix` consults
//! registry only. A caller-supplied [`PslOverride`] is always consulted
//! first.

mod data;
mod trie;

use std::sync::OnceLock;

use trie::SuffixTrie;

use crate::domain::validate_domain_syntax;
use crate::error::DcvError;

const PRIVATE_MARKER: &str = "===BEGIN PRIVATE DOMAINS===";

/// Result of consulting a caller-supplied override before the builtin
/// tables (spec §3 "A caller-supplied `PslOverride`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideResult {
    NotOverridden,
    EffectiveTld(String),
    InvalidTld,
}

pub trait PslOverride: Send + Sync {
    fn lookup(&self, domain: &str) -> OverrideResult;
}

pub struct PslEngine {
    registry_exact: SuffixTrie,
    registry_wildcard: SuffixTrie,
    registry_exception: SuffixTrie,
    private_exact: SuffixTrie,
    private_wildcard: SuffixTrie,
    override_supplier: Option<Box<dyn PslOverride>>,
    // Lazy cache per spec §4.1 ("Caches publicSuffixIndex ... lazily"): a
    // merged registry∪private exact trie. The registry-only index needs no
    // separate cache since `registry_exact` already serves that role
    // directly.
    public_suffix_index: OnceLock<SuffixTrie>,
}

enum Scope {
    Registry,
    Public,
}

impl PslEngine {
    /// Loads the bundled default snapshot.
    pub fn builtin() -> Self {
        Self::from_str(data::BUILTIN_PSL).expect("bundled PSL snapshot must parse")
    }

    pub fn with_override(mut self, supplier: Box<dyn PslOverride>) -> Self {
        self.override_supplier = Some(supplier);
        self
    }

    /// Parses a `publicsuffix.org`-format document.
    pub fn from_str(data: &str) -> Result<Self, DcvError> {
        let mut registry_exact = SuffixTrie::new();
        let mut registry_wildcard = SuffixTrie::new();
        let mut registry_exception = SuffixTrie::new();
        let mut private_exact = SuffixTrie::new();
        let mut private_wildcard = SuffixTrie::new();

        let mut in_private = false;
        for raw_line in data.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with("//") {
                if line.contains(PRIVATE_MARKER) {
                    in_private = true;
                }
                continue;
            }

            let (is_exception, is_wildcard, rule) = if let Some(rest) = line.strip_prefix('!') {
                (true, false, rest)
            } else if let Some(rest) = line.strip_prefix("*.") {
                (false, true, rest)
            } else {
                (false, false, line)
            };

            for ascii_rule in ascii_forms(rule) {
                if is_exception {
                    registry_exception.insert(&ascii_rule);
                } else if is_wildcard {
                    if in_private {
                        private_wildcard.insert(&ascii_rule);
                    } else {
                        registry_wildcard.insert(&ascii_rule);
                    }
                } else if in_private {
                    private_exact.insert(&ascii_rule);
                } else {
                    registry_exact.insert(&ascii_rule);
                }
            }
        }

        Ok(Self {
            registry_exact,
            registry_wildcard,
            registry_exception,
            private_exact,
            private_wildcard,
            override_supplier: None,
            public_suffix_index: OnceLock::new(),
        })
    }

    pub fn is_public_suffix(&self, domain: &str) -> bool {
        self.suffix_start(domain, Scope::Public) == Some(0)
    }

    pub fn is_registry_suffix(&self, domain: &str) -> bool {
        self.suffix_start(domain, Scope::Registry) == Some(0)
    }

    pub fn has_public_suffix(&self, domain: &str) -> bool {
        self.suffix_start(domain, Scope::Public).is_some()
    }

    pub fn public_suffix(&self, domain: &str) -> Option<String> {
        self.suffix_string(domain, Scope::Public)
    }

    pub fn registry_suffix(&self, domain: &str) -> Option<String> {
        self.suffix_string(domain, Scope::Registry)
    }

    /// The domain one level below its effective (override, else public)
    /// suffix — e.g. `baseDomain("foo.blogspot.com") == "foo.blogspot.com"`
    /// since `blogspot.com` is itself a (private) public suffix.
    pub fn base_domain(&self, domain: &str) -> Result<String, DcvError> {
        let labels: Vec<&str> = domain.split('.').collect();
        let start = self
            .effective_suffix_start(domain, &labels)
            .ok_or(DcvError::DomainInvalidNotUnderPublicSuffix)?;
        if start == 0 {
            // The domain *is* the suffix; there's no label left below it.
            return Err(DcvError::DomainInvalidNotUnderPublicSuffix);
        }
        Ok(labels[start - 1..].join("."))
    }

    /// `[domain, parent, ...]` stopping at the registrable name.
    pub fn domain_and_parents(&self, domain: &str) -> Result<Vec<String>, DcvError> {
        let labels: Vec<&str> = domain.split('.').collect();
        let start = self
            .effective_suffix_start(domain, &labels)
            .ok_or(DcvError::DomainInvalidNotUnderPublicSuffix)?;
        if start == 0 {
            return Err(DcvError::DomainInvalidNotUnderPublicSuffix);
        }
        let mut out = Vec::new();
        for i in 0..start {
            out.push(labels[i..].join("."));
        }
        Ok(out)
    }

    /// Syntactic validation plus "lives under a public suffix".
    pub fn validate_domain_name(&self, domain: &str) -> Result<(), DcvError> {
        validate_domain_syntax(domain)?;
        if !self.has_public_suffix(domain) {
            return Err(DcvError::DomainInvalidNotUnderPublicSuffix);
        }
        Ok(())
    }

    fn effective_suffix_start(&self, domain: &str, labels: &[&str]) -> Option<usize> {
        match self.consult_override(domain) {
            Some(OverrideResult::EffectiveTld(tld)) => {
                let tld_labels: Vec<&str> = tld.split('.').collect();
                if tld_labels.len() > labels.len() {
                    return None;
                }
                Some(labels.len() - tld_labels.len())
            }
            Some(OverrideResult::InvalidTld) => None,
            Some(OverrideResult::NotOverridden) | None => self.suffix_start(domain, Scope::Public),
        }
    }

    fn consult_override(&self, domain: &str) -> Option<OverrideResult> {
        self.override_supplier
            .as_ref()
            .map(|supplier| supplier.lookup(domain))
    }

    fn suffix_string(&self, domain: &str, scope: Scope) -> Option<String> {
        let labels: Vec<&str> = domain.split('.').collect();
        let start = match self.consult_override(domain) {
            Some(OverrideResult::EffectiveTld(tld)) => {
                let tld_labels: Vec<&str> = tld.split('.').collect();
                if tld_labels.len() > labels.len() {
                    return None;
                }
                labels.len() - tld_labels.len()
            }
            Some(OverrideResult::InvalidTld) => return None,
            Some(OverrideResult::NotOverridden) | None => self.suffix_start(domain, scope)?,
        };
        Some(labels[start..].join("."))
    }

    fn suffix_start(&self, domain: &str, scope: Scope) -> Option<usize> {
        if let Some(result) = self.consult_override(domain) {
            return match result {
                OverrideResult::EffectiveTld(tld) => {
                    let labels: Vec<&str> = domain.split('.').collect();
                    let tld_labels: Vec<&str> = tld.split('.').collect();
                    if tld_labels.len() > labels.len() {
                        None
                    } else {
                        Some(labels.len() - tld_labels.len())
                    }
                }
                OverrideResult::InvalidTld => None,
                OverrideResult::NotOverridden => self.find_suffix(domain, scope),
            };
        }
        self.find_suffix(domain, scope)
    }

    fn find_suffix(&self, domain: &str, scope: Scope) -> Option<usize> {
        let labels: Vec<&str> = domain.split('.').collect();
        let n = labels.len();
        let tld_first: Vec<&str> = labels.iter().rev().copied().collect();

        let exact_len = match scope {
            Scope::Registry => self.registry_exact.longest_match_len(&tld_first),
            Scope::Public => longest_of(
                self.registry_exact.longest_match_len(&tld_first),
                self.public_suffix_index().longest_match_len(&tld_first),
            ),
        };

        // Exception rules always prevail over any other matching rule,
        // regardless of length (publicsuffix.org algorithm step 3).
        let exception_len = self.registry_exception.longest_match_len(&tld_first);
        if let Some(len) = exception_len {
            return Some(n - len + 1);
        }

        let wildcard_len = match scope {
            Scope::Registry => self.registry_wildcard.longest_match_len(&tld_first),
            Scope::Public => longest_of(
                self.registry_wildcard.longest_match_len(&tld_first),
                self.private_wildcard.longest_match_len(&tld_first),
            ),
        };
        let wildcard_consumed = wildcard_len.and_then(|len| {
            let consumed = len + 1;
            if consumed <= n { Some(consumed) } else { None }
        });

        let consumed = longest_of(exact_len, wildcard_consumed)?;
        Some(n - consumed)
    }

    fn public_suffix_index(&self) -> &SuffixTrie {
        self.public_suffix_index.get_or_init(|| {
            // Merge registry + private exact tables into one trie so
            // repeated public-suffix queries avoid re-checking two tries.
            // Built lazily and cached for the engine's lifetime, matching
            // the "lazily computed, thread-safe" guidance for per-instance
            // PSL caches.
            let mut merged = self.registry_exact.clone();
            merged.merge_from(&self.private_exact);
            merged
        })
    }
}

fn longest_of(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    }
}

/// Returns the rule plus, if it contains non-ASCII characters, its IDNA
/// A-label (punycode) form too — spec §3 "each Unicode entry is also
/// inserted in its ASCII (punycode) form".
fn ascii_forms(rule: &str) -> Vec<String> {
    let mut forms = vec![rule.to_string()];
    if !rule.is_ascii()
        && let Ok(ascii) = idna::domain_to_ascii(rule)
        && ascii != rule
    {
        forms.push(ascii);
    }
    forms
}
