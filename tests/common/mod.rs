#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use time_travel_booth::config::ModelIds;
use time_travel_booth::gemini::types::{GenerateContentRequest, GenerateContentResponse};
use time_travel_booth::{BoothError, ContentGenerator, ImageService};
use tokio::sync::Notify;

/// Answers every request with the same reply, optionally waiting for a
/// go-ahead first so tests can observe the in-flight state.
pub struct FakeGemini {
    reply: Result<Value, BoothError>,
    gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
    pub models: Mutex<Vec<String>>,
}

impl FakeGemini {
    pub fn replying(reply: Result<Value, BoothError>) -> Self {
        Self {
            reply,
            gate: None,
            calls: AtomicUsize::new(0),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(reply: Result<Value, BoothError>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(reply)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for FakeGemini {
    async fn generate_content(
        &self,
        model: &str,
        _request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, BoothError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.models.lock().unwrap().push(model.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply
            .clone()
            .map(|body| serde_json::from_value(body).expect("fake reply must be a valid response"))
    }
}

pub fn service(fake: Arc<FakeGemini>) -> ImageService {
    ImageService::new(fake, ModelIds::default())
}

pub fn text_reply(text: &str) -> Result<Value, BoothError> {
    Ok(json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }))
}

pub fn image_reply(data: &str) -> Result<Value, BoothError> {
    Ok(json!({ "candidates": [{ "content": { "parts": [
        { "text": "Here is your photo in Ancient Rome." },
        { "inlineData": { "mimeType": "image/png", "data": data } }
    ] } }] }))
}

pub fn no_image_reply() -> Result<Value, BoothError> {
    text_reply("I could not produce an image for that request.")
}

pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 120, 40]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
        .unwrap();
    out
}

pub fn jpeg_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Jpeg(85))
        .unwrap();
    out
}
