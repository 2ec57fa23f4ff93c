//! Map render cache - one rendered image per distinct alert combination
//!
//! ```text
//! AlertSet ──cache_key──▶ MapArtifactStore ──hit──▶ MapArtifact
//!                               │ miss
//!                               ▼
//!                  single-flight pipeline (one per key)
//!      template ─▶ paint_areas ─▶ Rasterizer ─▶ ArtifactUploader ─▶ store.insert
//! ```
//!
//! Concurrent requests for the same key share one pipeline run and all
//! observe its outcome. A failed run stores nothing, so the next request
//! starts a fresh attempt.

mod paint;
mod raster;

pub use paint::{paint_areas, ALERT_FILL, ALERT_FILL_OPACITY};
pub use raster::{ConvertRasterizer, DEFAULT_PROGRAM, DEFAULT_WIDTH};

use crate::error::{AlertError, Result};
use crate::repository::MapArtifactStore;
use crate::traits::{ArtifactUploader, Rasterizer};
use crate::types::{AlertSet, MapArtifact};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

type RenderFuture = Shared<BoxFuture<'static, Result<MapArtifact>>>;

/// Filesystem-safe name derived from a cache key
pub fn cache_stem(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapLookup {
    /// True when the artifact was already stored before this request
    pub cached: bool,
    pub artifact: MapArtifact,
}

struct Inner {
    store: MapArtifactStore,
    template_path: PathBuf,
    rasterizer: Arc<dyn Rasterizer>,
    uploader: Arc<dyn ArtifactUploader>,
    in_flight: Mutex<HashMap<String, RenderFuture>>,
}

#[derive(Clone)]
pub struct MapRenderCache {
    inner: Arc<Inner>,
}

impl MapRenderCache {
    pub fn new(
        store: MapArtifactStore,
        template_path: impl Into<PathBuf>,
        rasterizer: Arc<dyn Rasterizer>,
        uploader: Arc<dyn ArtifactUploader>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                template_path: template_path.into(),
                rasterizer,
                uploader,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Number of keys currently being rendered
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Return the artifact for `alerts`, rendering it at most once per key
    pub async fn get_or_render(&self, alerts: &AlertSet) -> Result<MapLookup> {
        let key = alerts.cache_key();

        if let Some(artifact) = self.inner.store.get(&key).await? {
            debug!("Map cache hit for '{}'", key);
            return Ok(MapLookup {
                cached: true,
                artifact,
            });
        }

        let render = self.join_or_start(&key, alerts);
        let artifact = render.await?;
        Ok(MapLookup {
            cached: false,
            artifact,
        })
    }

    fn join_or_start(&self, key: &str, alerts: &AlertSet) -> RenderFuture {
        let mut in_flight = self.inner.in_flight.lock();
        if let Some(existing) = in_flight.get(key) {
            debug!("Joining in-flight render for '{}'", key);
            return existing.clone();
        }

        let inner = Arc::clone(&self.inner);
        let task_key = key.to_string();
        let areas: Vec<String> = alerts.ids().into_iter().map(str::to_string).collect();

        // Runs detached so the render completes even if every waiter goes away
        let task = tokio::spawn(async move {
            let outcome = inner.render(&task_key, &areas).await;
            inner.in_flight.lock().remove(&task_key);
            outcome
        });

        let render = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(AlertError::Render(format!("render task failed: {}", e))),
            }
        }
        .boxed()
        .shared();

        in_flight.insert(key.to_string(), render.clone());
        render
    }
}

impl Inner {
    async fn render(&self, key: &str, areas: &[String]) -> Result<MapArtifact> {
        // Another leader may have finished between our miss and taking the slot
        if let Some(artifact) = self.store.get(key).await? {
            return Ok(artifact);
        }

        info!("Rendering map for '{}'", key);

        let template = tokio::fs::read(&self.template_path).await.map_err(|e| {
            AlertError::Render(format!(
                "map template {:?} unreadable: {}",
                self.template_path, e
            ))
        })?;

        let svg = paint_areas(&template, areas.iter().map(String::as_str))?;
        let raster = self.rasterizer.rasterize(&cache_stem(key), svg).await?;
        if raster.is_empty() {
            return Err(AlertError::Render("rasterizer returned no data".to_string()));
        }

        let handle = self.uploader.upload(raster).await.map_err(|e| {
            warn!("Map upload for '{}' failed: {}", key, e);
            e
        })?;

        self.store.insert(key, &handle).await
    }
}
