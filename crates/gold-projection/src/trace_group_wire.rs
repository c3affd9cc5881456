//! Wire shape for a trace group, spec §4.6.

use gold_core::model::Digest;
use gold_core::trace_group::TraceGroup;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TraceGroupRowWire {
    pub trace_id: String,
    pub digest_indices: Vec<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceGroupWire {
    pub digests: Vec<String>,
    pub traces: Vec<TraceGroupRowWire>,
    pub total_digests: usize,
}

impl From<&TraceGroup> for TraceGroupWire {
    fn from(group: &TraceGroup) -> Self {
        Self {
            digests: group.digests.iter().map(Digest::to_hex).collect(),
            traces: group
                .traces
                .iter()
                .map(|row| TraceGroupRowWire {
                    trace_id: row.trace_id.to_hex(),
                    digest_indices: row.digest_indices.clone(),
                })
                .collect(),
            total_digests: group.total_digests,
        }
    }
}
