//! Common test utilities and fixtures.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;
use scollector_exporter::core::Config;
use scollector_exporter::store::SampleStore;
use scollector_exporter::Application;
use serde_json::{json, Value};
use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// Current time as OpenTSDB seconds.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Test fixture builder for OpenTSDB data points with sensible defaults.
pub struct TestPointBuilder {
    metric: String,
    timestamp: i64,
    value: Value,
    tags: serde_json::Map<String, Value>,
}

impl TestPointBuilder {
    pub fn new(metric: &str) -> Self {
        Self {
            metric: metric.to_string(),
            timestamp: now_secs(),
            value: json!(1),
            tags: serde_json::Map::new(),
        }
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn age(mut self, age: Duration) -> Self {
        self.timestamp = now_secs() - age.as_secs() as i64;
        self
    }

    pub fn tag(mut self, name: &str, value: &str) -> Self {
        self.tags.insert(name.to_string(), json!(value));
        self
    }

    pub fn build(self) -> Value {
        json!({
            "metric": self.metric,
            "timestamp": self.timestamp,
            "value": self.value,
            "tags": self.tags,
        })
    }
}

/// Exporter under test, driven in-process through its router.
pub struct TestExporter {
    pub router: Router,
    pub store: SampleStore,
    put_path: String,
}

impl TestExporter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let put_path = config.server.put_path.clone();
        let app = Application::new(config).unwrap();
        Self {
            router: app.router(),
            store: app.store().clone(),
            put_path,
        }
    }

    /// POST a batch of points as plain JSON and wait until it is applied.
    pub async fn post_batch(&self, points: Vec<Value>) -> StatusCode {
        let body = serde_json::to_vec(&Value::Array(points)).unwrap();
        self.post_raw(body, "application/json", None).await
    }

    /// POST a gzip-compressed batch and wait until it is applied.
    pub async fn post_gzip(&self, points: Vec<Value>) -> StatusCode {
        let body = serde_json::to_vec(&Value::Array(points)).unwrap();
        self.post_raw(gzip(&body), "application/json", Some("gzip")).await
    }

    pub async fn post_raw(
        &self,
        body: Vec<u8>,
        content_type: &str,
        content_encoding: Option<&str>,
    ) -> StatusCode {
        let mut request = Request::post(self.put_path.as_str()).header(header::CONTENT_TYPE, content_type);
        if let Some(encoding) = content_encoding {
            request = request.header(header::CONTENT_ENCODING, encoding);
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        self.store.flush().await.unwrap();
        response.status()
    }

    /// Send a request with an arbitrary method to the ingestion path.
    pub async fn request(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// Scrape `/metrics` and return the body.
    pub async fn scrape(&self) -> String {
        let (status, body) = self
            .request(Request::get("/metrics").body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    /// Lines of a scrape that belong to `name` (excluding comments).
    pub async fn series_lines(&self, name: &str) -> Vec<String> {
        let prefix_plain = format!("{} ", name);
        let prefix_labels = format!("{}{{", name);
        self.scrape()
            .await
            .lines()
            .filter(|line| line.starts_with(&prefix_plain) || line.starts_with(&prefix_labels))
            .map(str::to_string)
            .collect()
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Macro for creating a test point quickly.
#[macro_export]
macro_rules! test_point {
    ($metric:expr, $value:expr) => {
        TestPointBuilder::new($metric).value($value).build()
    };
    ($metric:expr, $value:expr, $($tag:expr => $tag_value:expr),+) => {
        TestPointBuilder::new($metric)
            .value($value)
            $(.tag($tag, $tag_value))+
            .build()
    };
}
