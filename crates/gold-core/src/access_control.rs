//! Access Control Overlay — spec §4.4.
//!
//! A `PublicViewMatcher` restricts which traces a public-facing view may
//! return. It is a mapping `corpus -> { key -> allowed values }`. A trace
//! is visible iff its corpus has an entry in the map, and for every key
//! listed under that corpus the trace's value for that key is one of the
//! allowed values; keys the corpus's rule set doesn't mention impose no
//! restriction.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::ParamSet;

#[derive(Debug, Clone, Default)]
pub struct PublicViewMatcher {
    rules: Option<BTreeMap<String, BTreeMap<String, BTreeSet<String>>>>,
}

impl PublicViewMatcher {
    /// No restrictions: every corpus and trace is visible.
    pub fn everything_public() -> Self {
        Self { rules: None }
    }

    pub fn new(rules: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>) -> Self {
        Self { rules: Some(rules) }
    }

    pub fn corpus_visible(&self, corpus: &str) -> bool {
        match &self.rules {
            None => true,
            Some(rules) => rules.contains_key(corpus),
        }
    }

    /// Is a trace with the given corpus and keys visible under this
    /// matcher?
    pub fn trace_visible(&self, corpus: &str, keys: &BTreeMap<String, String>) -> bool {
        let rules = match &self.rules {
            None => return true,
            Some(r) => r,
        };
        let Some(corpus_rules) = rules.get(corpus) else {
            return false;
        };
        for (key, allowed) in corpus_rules {
            match keys.get(key) {
                Some(value) if allowed.contains(value) => continue,
                _ => return false,
            }
        }
        true
    }

    /// Remove from `paramset` any key/value pair that is not reachable by
    /// at least one visible trace — used when building result ParamSets
    /// so a public view never leaks values that only appear on hidden
    /// traces (spec §4.4 invariant).
    pub fn filter_paramset(&self, corpus: &str, paramset: &ParamSet) -> ParamSet {
        let rules = match &self.rules {
            None => return paramset.clone(),
            Some(r) => r,
        };
        let Some(corpus_rules) = rules.get(corpus) else {
            return ParamSet::new();
        };
        let mut out = ParamSet::new();
        for (key, values) in paramset {
            match corpus_rules.get(key) {
                None => {
                    out.insert(key.clone(), values.clone());
                }
                Some(allowed) => {
                    let intersected: BTreeSet<String> =
                        values.intersection(allowed).cloned().collect();
                    if !intersected.is_empty() {
                        out.insert(key.clone(), intersected);
                    }
                }
            }
        }
        out
    }
}
