//! `GetCluster` response, spec §4.8.

use std::collections::BTreeMap;

use gold_core::cluster::ClusterDiffResult;
use gold_core::model::{Label, ParamSet};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ClusterNodeWire {
    pub digest: String,
    pub label: Label,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterLinkWire {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterDiffResultWire {
    pub nodes: Vec<ClusterNodeWire>,
    pub links: Vec<ClusterLinkWire>,
    pub paramset_by_digest: BTreeMap<String, ParamSet>,
    pub paramsets_union: ParamSet,
}

impl From<&ClusterDiffResult> for ClusterDiffResultWire {
    fn from(result: &ClusterDiffResult) -> Self {
        Self {
            nodes: result
                .nodes
                .iter()
                .map(|n| ClusterNodeWire {
                    digest: n.digest.to_hex(),
                    label: n.label,
                })
                .collect(),
            links: result
                .links
                .iter()
                .map(|l| ClusterLinkWire {
                    left: l.left,
                    right: l.right,
                    distance: l.distance,
                })
                .collect(),
            paramset_by_digest: result
                .paramset_by_digest
                .iter()
                .map(|(d, p)| (d.to_hex(), p.clone()))
                .collect(),
            paramsets_union: result.paramsets_union.clone(),
        }
    }
}
