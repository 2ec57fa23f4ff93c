//! Capabilities the engine consumes from outside
//!
//! Implementations:
//! - `alertsrv::providers::HttpAlertProvider`: JSON alert feed
//! - `alertsrv::telegram::TelegramTransport`: message sender and artifact uploader
//! - [`crate::maps::ConvertRasterizer`]: external SVG -> PNG program

use crate::error::Result;
use crate::types::AlertSet;
use async_trait::async_trait;

/// Snapshot source of currently active alerts
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch one consistent snapshot or fail
    async fn fetch(&self) -> Result<AlertSet>;
}

/// Outbound notification channel
///
/// Implementations should not block indefinitely; the fanout also wraps each
/// call in its own timeout.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, subscriber_id: i64, text: &str) -> Result<()>;
}

/// Vector -> raster conversion
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// `stem` is a filesystem-safe name unique per alert combination
    async fn rasterize(&self, stem: &str, svg: Vec<u8>) -> Result<Vec<u8>>;
}

/// Hands rendered bytes to the transport and returns a durable reference
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    async fn upload(&self, raster: Vec<u8>) -> Result<String>;
}
