//! The key names that together define a grouping ("what test is this"),
//! shared by every module that needs to re-derive a grouping from a
//! trace's keys (spec §3 invariant 1: the grouping id is a pure function
//! of the trace keys). Fixed to `corpus` + `name` to match the fixture
//! and `gold-store`'s own `TraceRow::grouping_id` derivation.

use std::collections::BTreeMap;

use gold_core::model::{Grouping, GroupingId};

pub const GROUPING_KEY_NAMES: &[&str] = &["corpus", "name"];

pub fn grouping_of(keys: &BTreeMap<String, String>) -> Grouping {
    Grouping::from_trace_keys(keys, GROUPING_KEY_NAMES)
}

pub fn grouping_id_of(keys: &BTreeMap<String, String>) -> GroupingId {
    grouping_of(keys).id()
}
