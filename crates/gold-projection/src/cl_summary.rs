//! `NewAndUntriagedSummaryForCL` response, spec §4.3.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PatchsetNewAndUntriagedSummaryWire {
    pub patchset_id: String,
    pub patchset_order: u32,
    pub new_images: u64,
    pub new_untriaged_images: u64,
    pub total_untriaged_images: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewAndUntriagedSummaryWire {
    pub patchsets: Vec<PatchsetNewAndUntriagedSummaryWire>,
}
