//! HTTP route handlers for the plant report web application.
//!
//! `POST /analyze` and `POST /download` speak JSON (and return a PDF on
//! success for the latter); everything else falls through to static files.

mod analyze;
mod download;

use analyze::analyze;
use download::download;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    routing::post,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::state::AppState;

/// JSON body limit for `/download` (a data URI of a large photo fits).
pub const DOWNLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>, static_dir: &Path, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/analyze",
            post(analyze).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/download",
            post(download).layer(DefaultBodyLimit::max(DOWNLOAD_BODY_LIMIT)),
        )
        // Static files with Cache-Control: no-cache (cache but always revalidate via ETag)
        .fallback_service(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache"),
                ))
                .service(ServeDir::new(static_dir)),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use super::download::GENERATE_ERROR;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use plant_report_core::{
        AnalyzerInfo, AppConfig, Error, ImageAnalyzer, InlineImage, PlantReporter, Result,
    };
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "plantreportboundary";

    /// Answers with a fixed text, or fails when `answer` is `None`.
    struct MockAnalyzer {
        answer: Option<&'static str>,
    }

    #[async_trait]
    impl ImageAnalyzer for MockAnalyzer {
        fn info(&self) -> AnalyzerInfo {
            AnalyzerInfo {
                name: "mock",
                requires_api_key: false,
            }
        }

        async fn describe(&self, _prompt: &str, _image: &InlineImage) -> Result<String> {
            self.answer
                .map(ToString::to_string)
                .ok_or_else(|| Error::AnalyzerRequest("model unavailable".to_string()))
        }
    }

    struct TestApp {
        tmp: TempDir,
        router: Router,
    }

    impl TestApp {
        fn new(answer: Option<&'static str>, cache_enabled: bool) -> Self {
            let tmp = TempDir::new().unwrap();
            let mut config = AppConfig::default();
            config.storage.upload_dir = tmp.path().join("upload");
            config.storage.reports_dir = tmp.path().join("reports");
            config.cache.enabled = cache_enabled;

            let static_dir = tmp.path().join("public");
            std::fs::create_dir_all(&static_dir).unwrap();
            std::fs::write(static_dir.join("index.html"), "<h1>Plant Report</h1>").unwrap();

            let reporter = PlantReporter::with_analyzer(Arc::new(MockAnalyzer { answer }), &config);
            let state = Arc::new(AppState::with_reporter(reporter, &config));
            let router = router(state, &static_dir, 1024 * 1024);
            Self { tmp, router }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        fn files_in(&self, dir: &str) -> usize {
            std::fs::read_dir(self.tmp.path().join(dir)).map_or(0, Iterator::count)
        }
    }

    fn multipart_request(field: &str, content_type: Option<&str>, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"leaf.png\"\r\n")
                .as_bytes(),
        );
        if let Some(ct) = content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    /// A small opaque PNG.
    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(3, 2, image::Rgb([0, 120, 0]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_analyze_returns_result_and_image() {
        let app = TestApp::new(Some("A snake plant."), false);
        let png = tiny_png();

        let response = app
            .send(multipart_request("image", Some("image/png"), &png))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["result"], "A snake plant.");
        let data_uri = body["image"].as_str().unwrap();
        let payload = data_uri.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), png);
        assert!(body.get("id").is_none());

        assert_eq!(app.files_in("upload"), 0);
    }

    #[tokio::test]
    async fn test_analyze_guesses_mime_from_file_name() {
        let app = TestApp::new(Some("ok"), false);

        let response = app.send(multipart_request("image", None, &tiny_png())).await;
        let body = body_json(response).await;
        assert!(body["image"].as_str().unwrap().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_analyze_without_file_is_an_error() {
        let app = TestApp::new(Some("unused"), false);

        let response = app
            .send(multipart_request("photo", Some("image/png"), b"xx"))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "no image file was uploaded");
    }

    #[tokio::test]
    async fn test_analyze_non_multipart_body_uses_error_envelope() {
        let app = TestApp::new(Some("unused"), false);

        let response = app.send(json_request("/analyze", "{}")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = body_json(response).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert_eq!(app.files_in("upload"), 0);
    }

    #[tokio::test]
    async fn test_analyze_failure_cleans_upload() {
        let app = TestApp::new(None, false);

        let response = app
            .send(multipart_request("image", Some("image/png"), &tiny_png()))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = body_json(response).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("model unavailable"));
        assert_eq!(app.files_in("upload"), 0);
    }

    #[tokio::test]
    async fn test_download_returns_pdf_attachment() {
        let app = TestApp::new(None, false);
        let data_uri = format!("data:image/png;base64,{}", STANDARD.encode(tiny_png()));
        let body = json!({ "result": "Peace lily. Keep soil moist.", "image": data_uri });

        let response = app.send(json_request("/download", body.to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");

        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"report-"));
        assert!(disposition.ends_with(".pdf\""));

        let pdf = body_bytes(response).await;
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(app.files_in("reports"), 0);
    }

    #[tokio::test]
    async fn test_download_without_image() {
        let app = TestApp::new(None, false);

        let response = app
            .send(json_request("/download", json!({ "result": "Just text" }).to_string()))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_download_bad_image_uses_generic_error() {
        let app = TestApp::new(None, false);
        let body = json!({ "result": "x", "image": "data:image/png;base64,AAAA" });

        let response = app.send(json_request("/download", body.to_string())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], GENERATE_ERROR);
        assert_eq!(app.files_in("reports"), 0);
    }

    #[tokio::test]
    #[allow(clippy::cast_possible_truncation)]
    async fn test_download_accepts_unpadded_image() {
        let app = TestApp::new(None, false);
        // A PNG whose length is not a multiple of 3, so its base64 is padded
        let png = (1..=16u8)
            .map(|width| {
                let img = image::RgbImage::from_fn(u32::from(width), 2, |x, y| {
                    image::Rgb([(x * 37) as u8, (y * 91) as u8, width])
                });
                let mut out = std::io::Cursor::new(Vec::new());
                image::DynamicImage::ImageRgb8(img)
                    .write_to(&mut out, image::ImageFormat::Png)
                    .unwrap();
                out.into_inner()
            })
            .find(|png| png.len() % 3 != 0)
            .unwrap();
        let encoded = STANDARD.encode(&png);
        assert!(encoded.ends_with('='));
        let data_uri = format!("data:image/png;base64,{}", encoded.trim_end_matches('='));
        let body = json!({ "result": "Aloe vera.", "image": data_uri });

        let response = app.send(json_request("/download", body.to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let pdf = body_bytes(response).await;
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_download_malformed_json() {
        let app = TestApp::new(None, false);

        let response = app.send(json_request("/download", "{not json")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], GENERATE_ERROR);
    }

    #[tokio::test]
    async fn test_cached_analysis_downloads_by_id() {
        let app = TestApp::new(Some("Cached basil."), true);

        let response = app
            .send(multipart_request("image", Some("image/png"), &tiny_png()))
            .await;
        let body = body_json(response).await;
        let id = body["id"].as_str().unwrap().to_string();

        let response = app
            .send(json_request("/download", json!({ "id": id }).to_string()))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.starts_with(b"%PDF-"));

        let response = app
            .send(json_request("/download", json!({ "id": "missing" }).to_string()))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_static_files_are_served() {
        let app = TestApp::new(None, false);

        let response = app
            .send(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"<h1>Plant Report</h1>");

        let response = app
            .send(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
