//! `ComputeGUIStatus` response, spec §4.3.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CorpusStatusWire {
    pub corpus: String,
    pub untriaged_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuiStatusWire {
    pub last_commit_hash: Option<String>,
    pub last_commit_time: Option<chrono::DateTime<chrono::Utc>>,
    pub corpus_status: Vec<CorpusStatusWire>,
}
