//! Inbound search request, spec §4.2/§4.3.
//!
//! Carries the full public surface `Search` accepts, including the fields
//! outside the compiled [`gold_core::query::TraceFilterPlan`] (only-at-head,
//! must-have-reference, blame id, rgba bounds, CL scoping) that the Result
//! Pipeline applies after candidate selection.

use std::collections::BTreeMap;

use gold_core::model::MetricKind;
use gold_core::query::{SearchQuery, SortDirection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKindWire {
    Combined,
    Percent,
    Pixel,
}

impl From<MetricKindWire> for MetricKind {
    fn from(m: MetricKindWire) -> Self {
        match m {
            MetricKindWire::Combined => MetricKind::Combined,
            MetricKindWire::Percent => MetricKind::Percent,
            MetricKindWire::Pixel => MetricKind::Pixel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirectionWire {
    Asc,
    Desc,
}

impl From<SortDirectionWire> for SortDirection {
    fn from(s: SortDirectionWire) -> Self {
        match s {
            SortDirectionWire::Asc => SortDirection::Ascending,
            SortDirectionWire::Desc => SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub corpus: Option<String>,
    #[serde(default)]
    pub trace_key_filters: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub right_trace_key_filters: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub metric: Option<MetricKindWire>,
    pub metric_min: Option<f64>,
    pub metric_max: Option<f64>,
    #[serde(default)]
    pub include_positive: bool,
    #[serde(default)]
    pub include_negative: bool,
    #[serde(default = "default_true")]
    pub include_untriaged: bool,
    #[serde(default)]
    pub include_ignored: bool,
    #[serde(default)]
    pub only_at_head: bool,
    #[serde(default)]
    pub must_have_reference: bool,
    pub sort: Option<SortDirectionWire>,
    #[serde(default)]
    pub offset: u32,
    pub limit: Option<u32>,
    pub changelist_id: Option<String>,
    pub crs: Option<String>,
    #[serde(default)]
    pub patchsets: Vec<String>,
    #[serde(default)]
    pub include_digests_produced_on_master: bool,
    pub blame_group_id: Option<String>,
    pub rgba_min: Option<u8>,
    pub rgba_max: Option<u8>,
}

fn default_true() -> bool {
    true
}

impl SearchRequest {
    /// Project onto the subset of fields `gold_core::query::SearchQuery`
    /// compiles into a `TraceFilterPlan`. The remaining fields
    /// (`only_at_head`, `must_have_reference`, `blame_group_id`,
    /// `rgba_min`/`rgba_max`, `include_digests_produced_on_master`) are
    /// applied by the pipeline stages downstream of compilation.
    pub fn to_core_query(&self) -> SearchQuery {
        let mut q = SearchQuery {
            corpus: self.corpus.clone(),
            trace_key_filters: self.trace_key_filters.clone(),
            right_trace_key_filters: self.right_trace_key_filters.clone(),
            include_positive: self.include_positive,
            include_negative: self.include_negative,
            include_untriaged: self.include_untriaged,
            include_ignored: self.include_ignored,
            offset: self.offset,
            changelist_id: self.changelist_id.clone(),
            crs: self.crs.clone(),
            patchsets: self.patchsets.clone(),
            ..Default::default()
        };
        if let Some(metric) = self.metric {
            q.metric = metric.into();
        }
        q.metric_min = self.metric_min;
        q.metric_max = self.metric_max;
        if let Some(sort) = self.sort {
            q.sort = sort.into();
        }
        if let Some(limit) = self.limit {
            q.limit = limit;
        }
        q
    }
}
