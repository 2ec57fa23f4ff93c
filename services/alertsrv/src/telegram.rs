//! Telegram Bot API transport
//!
//! `sendMessage` delivers subscriber notifications; `sendPhoto` uploads a
//! rendered map to the upload chat, and the largest returned photo's
//! `file_id` becomes the durable map handle.

use alert_engine::{AlertError, ArtifactUploader, MessageSender};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PhotoMessage {
    #[serde(default)]
    photo: Vec<PhotoSize>,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    file_id: String,
    width: u32,
    height: u32,
}

/// Unwrap a Bot API envelope
fn decode<T: DeserializeOwned>(method: &str, body: &[u8]) -> Result<T, String> {
    let response: ApiResponse<T> = serde_json::from_slice(body)
        .map_err(|e| format!("{} returned malformed response: {}", method, e))?;

    if !response.ok {
        return Err(format!(
            "{} rejected: {}",
            method,
            response.description.unwrap_or_else(|| "no description".to_string())
        ));
    }

    response
        .result
        .ok_or_else(|| format!("{} returned no result", method))
}

/// Pick the highest-resolution photo's `file_id`
fn largest_photo(message: PhotoMessage) -> Option<String> {
    message
        .photo
        .into_iter()
        .max_by_key(|size| u64::from(size.width) * u64::from(size.height))
        .map(|size| size.file_id)
}

#[derive(Clone)]
pub struct TelegramTransport {
    client: Client,
    base_url: String,
    upload_chat_id: i64,
}

impl TelegramTransport {
    pub fn new(
        api_base: &str,
        bot_token: &str,
        upload_chat_id: i64,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
            upload_chat_id,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn read_body(response: reqwest::Response, method: &str) -> Result<Vec<u8>, String> {
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| format!("{} body unreadable: {}", method, e))
    }
}

#[async_trait]
impl MessageSender for TelegramTransport {
    async fn send(&self, subscriber_id: i64, text: &str) -> alert_engine::Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": subscriber_id, "text": text }))
            .send()
            .await
            .map_err(|e| AlertError::Send(format!("sendMessage failed: {}", e)))?;

        let body = Self::read_body(response, "sendMessage")
            .await
            .map_err(AlertError::Send)?;
        decode::<serde_json::Value>("sendMessage", &body).map_err(AlertError::Send)?;

        debug!("Delivered message to {}", subscriber_id);
        Ok(())
    }
}

#[async_trait]
impl ArtifactUploader for TelegramTransport {
    async fn upload(&self, raster: Vec<u8>) -> alert_engine::Result<String> {
        let photo = Part::bytes(raster)
            .file_name("map.png")
            .mime_str("image/png")
            .map_err(|e| AlertError::Render(format!("invalid upload part: {}", e)))?;
        let form = Form::new()
            .text("chat_id", self.upload_chat_id.to_string())
            .part("photo", photo);

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AlertError::Render(format!("sendPhoto failed: {}", e)))?;

        let body = Self::read_body(response, "sendPhoto")
            .await
            .map_err(AlertError::Render)?;
        let message: PhotoMessage = decode("sendPhoto", &body).map_err(AlertError::Render)?;

        largest_photo(message)
            .ok_or_else(|| AlertError::Render("sendPhoto returned no photo sizes".to_string()))
    }
}
