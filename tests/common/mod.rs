#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header::CONTENT_TYPE, StatusCode},
    Router,
};
use ndarray::ArrayView4;
use onnx_classifier::{
    models::{ClassCatalog, InferenceBackend, ModelManager},
    storage::LocalFileStorage,
    web::{create_app, AppState},
    ClassifierError, Config,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "----classifier-test-boundary";

/// 模拟后端：返回固定分数，`scores`为`None`时失败
pub struct MockBackend {
    scores: Option<Vec<f32>>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn returning(scores: Vec<f32>) -> Self {
        Self {
            scores: Some(scores),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            scores: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceBackend for MockBackend {
    fn infer(&self, _tensor: ArrayView4<'_, f32>) -> onnx_classifier::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scores
            .clone()
            .ok_or_else(|| ClassifierError::Inference("mock runtime failure".to_string()))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

pub struct AppTestContext {
    pub app: Router,
    pub backend: Arc<MockBackend>,
    pub upload_dir: TempDir,
}

impl AppTestContext {
    pub fn new(backend: MockBackend, classes: &[&str]) -> Self {
        Self::with_config(backend, classes, |config| config)
    }

    pub fn with_config(
        backend: MockBackend,
        classes: &[&str],
        configure: impl FnOnce(Config) -> Config,
    ) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = configure(
            Config::new("127.0.0.1:0".into(), "models".into(), false)
                .unwrap()
                .with_upload_dir(upload_dir.path()),
        );

        let backend = Arc::new(backend);
        let catalog = ClassCatalog::new(classes.iter().map(|s| s.to_string()).collect()).unwrap();
        let manager = ModelManager::with_backend(config.clone(), backend.clone(), catalog);
        let storage = Arc::new(LocalFileStorage::new(&config.upload_dir).unwrap());

        let app = create_app(AppState::new(manager, storage)).unwrap();

        Self {
            app,
            backend,
            upload_dir,
        }
    }

    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }

    pub async fn send(&self, req: Request) -> (StatusCode, serde_json::Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}

pub fn gray_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// 几乎无法压缩的PNG，用于大小限制测试
pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    let img = image::RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        image::Rgb([channel(), channel(), channel()])
    });
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// 一个multipart字段：字段名、可选文件名、可选内容类型、数据
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content_type: Some(content_type),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

pub fn multipart_request(parts: &[Part<'_>]) -> Request {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
