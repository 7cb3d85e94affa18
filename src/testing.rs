//! Fixtures shared by the unit tests.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use url::Url;

use crate::config::{ApiKey, AppConfig};
use crate::constants::API_KEY_HEADER;
use crate::ingest::{UploadedFile, UploadedImage, decode_upload};

pub(crate) fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut output = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut output), format)
        .expect("encode fixture");
    output
}

pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(&solid(width, height, color), ImageFormat::Png)
}

pub(crate) fn jpeg_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(&solid(width, height, color), ImageFormat::Jpeg)
}

pub(crate) fn png_upload(name: &str, width: u32, height: u32, color: [u8; 3]) -> UploadedImage {
    decode_upload(UploadedFile::new(name, png_bytes(width, height, color))).expect("decode fixture")
}

/// Builds a multipart/form-data body, returning the content type and the body.
pub(crate) fn multipart_body(
    files: &[(&str, &str, Vec<u8>)],
    fields: &[(&str, &str)],
) -> (String, Vec<u8>) {
    let boundary = "photo-diary-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

/// What the fake provider saw.
#[derive(Clone, Default)]
pub(crate) struct MockGemini {
    pub(crate) bodies: Arc<Mutex<Vec<Value>>>,
    pub(crate) keys: Arc<Mutex<Vec<String>>>,
}

/// A successful `generateContent` answer carrying `text`.
pub(crate) fn text_answer(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

/// Serves `answer` with `status` for every model on a local port.
pub(crate) async fn start_mock_gemini(status: StatusCode, answer: Value) -> (Url, MockGemini) {
    let seen = MockGemini::default();
    let app = axum::Router::new()
        .route(
            "/v1beta/models/{model}",
            axum::routing::post(
                move |State(seen): State<MockGemini>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| {
                    let answer = answer.clone();
                    async move {
                        if let Some(key) = headers.get(API_KEY_HEADER) {
                            seen.keys
                                .lock()
                                .unwrap()
                                .push(key.to_str().unwrap().to_string());
                        }
                        seen.bodies.lock().unwrap().push(body);
                        (status, Json(answer)).into_response()
                    }
                },
            ),
        )
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (Url::parse(&format!("http://{addr}/")).unwrap(), seen)
}

/// Answers every model, but only after `delay`.
pub(crate) async fn start_slow_gemini(delay: Duration) -> Url {
    let app = axum::Router::new().route(
        "/v1beta/models/{model}",
        axum::routing::post(move || async move {
            tokio::time::sleep(delay).await;
            Json(text_answer("too late"))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// A base URL nobody listens on.
pub(crate) async fn dead_endpoint() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// Default config pointed at `base` with a test key.
pub(crate) fn test_config(base: Url) -> AppConfig {
    let mut config = AppConfig::new(ApiKey::new(Some("test-key")).unwrap()).unwrap();
    config.api_base_url = base;
    config
}
