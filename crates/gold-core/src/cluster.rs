//! Cluster Builder — spec §4.8.
//!
//! Builds the node/link graph the force-directed cluster view renders: one
//! node per distinct digest passing the current filters, and one link per
//! digest pair for which a diff metric is known, weighted by that metric's
//! distance.

use std::collections::BTreeMap;

use crate::model::{Digest, Label, ParamSet};

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNode {
    pub digest: Digest,
    pub label: Label,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterLink {
    /// Index into `ClusterDiffResult::nodes`.
    pub left: usize,
    /// Index into `ClusterDiffResult::nodes`.
    pub right: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterDiffResult {
    pub nodes: Vec<ClusterNode>,
    pub links: Vec<ClusterLink>,
    pub paramset_by_digest: BTreeMap<Digest, ParamSet>,
    pub paramsets_union: ParamSet,
}

/// One digest contributing to the cluster, with its label and the union
/// ParamSet of traces currently producing it.
#[derive(Debug, Clone)]
pub struct ClusterInput {
    pub digest: Digest,
    pub label: Label,
    pub paramset: ParamSet,
}

/// Build the cluster graph. `diff_lookup(a, b)` returns the distance
/// metric for an (a, b) pair if a diff row exists between them (order
/// does not matter — diff rows are symmetric, spec §3 invariant 5).
pub fn build_cluster(
    inputs: &[ClusterInput],
    diff_lookup: impl Fn(Digest, Digest) -> Option<f64>,
) -> ClusterDiffResult {
    let mut nodes = Vec::with_capacity(inputs.len());
    let mut paramset_by_digest = BTreeMap::new();
    let mut paramsets_union = ParamSet::new();

    for input in inputs {
        nodes.push(ClusterNode {
            digest: input.digest,
            label: input.label,
        });
        paramset_by_digest.insert(input.digest, input.paramset.clone());
        for (key, values) in &input.paramset {
            paramsets_union
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    let mut links = Vec::new();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if let Some(distance) = diff_lookup(nodes[i].digest, nodes[j].digest) {
                links.push(ClusterLink {
                    left: i,
                    right: j,
                    distance,
                });
            }
        }
    }

    ClusterDiffResult {
        nodes,
        links,
        paramset_by_digest,
        paramsets_union,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn digest(b: u8) -> Digest {
        Digest::from_hex(&format!("{b:02x}{:030}", 0)).unwrap()
    }

    fn input(b: u8, label: Label) -> ClusterInput {
        let mut paramset = ParamSet::new();
        paramset.insert(
            "config".to_string(),
            BTreeSet::from([format!("cfg-{b}")]),
        );
        ClusterInput {
            digest: digest(b),
            label,
            paramset,
        }
    }

    #[test]
    fn test_links_only_for_known_pairs() {
        let inputs = vec![
            input(1, Label::Positive),
            input(2, Label::Untriaged),
            input(3, Label::Negative),
        ];
        let result = build_cluster(&inputs, |a, b| {
            if a == digest(1) && b == digest(2) {
                Some(0.4)
            } else {
                None
            }
        });
        assert_eq!(result.nodes.len(), 3);
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].distance, 0.4);
    }

    #[test]
    fn test_paramsets_union_merges_all_digests() {
        let inputs = vec![input(1, Label::Positive), input(2, Label::Untriaged)];
        let result = build_cluster(&inputs, |_, _| None);
        assert_eq!(result.paramsets_union.len(), 1);
        assert_eq!(
            result.paramsets_union.get("config").unwrap().len(),
            2
        );
    }
}
