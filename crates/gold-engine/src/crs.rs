//! Code-review system client interface — spec §6.
//!
//! `getChangelist`/`getPatchsets` are the engine's view onto a CL that
//! some out-of-scope ingestion pipeline already wrote into `gold-store`'s
//! `changelists`/`patchsets` tables; `crs_url_template` renders a CL id to
//! a browsable URL for the `changelist_url` field of a CL-scoped search
//! response (spec §4.3 "Changelist result specifics"). No concrete HTTP
//! client to an external CRS lives in this crate — that collaborator is
//! out of scope (spec §1) — `ConfiguredCrsClient` only reads the copy of
//! CRS state `gold-store` already has and renders URLs from configured
//! templates.

use async_trait::async_trait;
use sqlx::PgPool;

use gold_core::model::{Changelist, Patchset};
use gold_errors::Result;

#[async_trait]
pub trait CodeReviewSystemClient: Send + Sync {
    async fn get_changelist(&self, crs: &str, cl_id: &str) -> Result<Option<Changelist>>;
    async fn get_patchsets(&self, crs: &str, cl_id: &str) -> Result<Vec<Patchset>>;
    fn crs_url_template(&self, crs: &str) -> Option<&str>;
}

/// Reads already-ingested CL/patchset rows via `gold-store` and renders
/// URLs from `GoldConfig::crs_url_templates`. The template's `{cl_id}`
/// placeholder is substituted with the CL id.
pub struct ConfiguredCrsClient {
    pool: PgPool,
    url_templates: std::collections::BTreeMap<String, String>,
}

impl ConfiguredCrsClient {
    pub fn new(pool: PgPool, url_templates: std::collections::BTreeMap<String, String>) -> Self {
        Self {
            pool,
            url_templates,
        }
    }

    /// Render `crs_url_template(crs)` against `cl_id`, or `None` if the
    /// CRS has no configured template.
    pub fn render_url(&self, crs: &str, cl_id: &str) -> Option<String> {
        self.crs_url_template(crs)
            .map(|template| template.replace("{cl_id}", cl_id))
    }
}

#[async_trait]
impl CodeReviewSystemClient for ConfiguredCrsClient {
    async fn get_changelist(&self, crs: &str, cl_id: &str) -> Result<Option<Changelist>> {
        gold_store::repo::changelists::get_changelist(&self.pool, crs, cl_id).await
    }

    async fn get_patchsets(&self, crs: &str, cl_id: &str) -> Result<Vec<Patchset>> {
        let cl = gold_store::repo::changelists::get_changelist(&self.pool, crs, cl_id).await?;
        Ok(cl.map(|c| c.patchsets).unwrap_or_default())
    }

    fn crs_url_template(&self, crs: &str) -> Option<&str> {
        self.url_templates.get(crs).map(String::as_str)
    }
}
