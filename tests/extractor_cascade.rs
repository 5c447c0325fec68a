// tests/extractor_cascade.rs
//
// The extraction cascade end to end against mocked pages, plus the
// /extract HTTP surface via oneshot.

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt as _;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use news_pipeline::config::extractor::SiteRuleCfg;
use news_pipeline::config::ExtractorConfig;
use news_pipeline::extract::browser::{BrowserError, BrowserLauncher, BrowserPool, BrowserSession};
use news_pipeline::extract::server::{router, ExtractorState};
use news_pipeline::extract::{paragraphs, readability, Cascade, Method};
use news_pipeline::IngestError;

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {path}: {e}"))
}

async fn page_server(route: &str, status: u16, body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(&server)
        .await;
    server
}

fn cascade(cfg: &ExtractorConfig) -> Cascade {
    Cascade::new(reqwest::Client::new(), cfg).expect("cascade")
}

/// Renders a fixed page; counts renders.
struct FixedLauncher {
    html: Option<String>,
    renders: Arc<AtomicUsize>,
}

struct FixedSession {
    html: Option<String>,
    renders: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for FixedSession {
    async fn render(&mut self, _url: &str) -> Result<String, BrowserError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.html
            .clone()
            .ok_or_else(|| BrowserError::Render("tab crashed".into()))
    }
}

#[async_trait]
impl BrowserLauncher for FixedLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        Ok(Box::new(FixedSession {
            html: self.html.clone(),
            renders: self.renders.clone(),
        }))
    }
}

fn pool(html: Option<String>) -> (Arc<BrowserPool>, Arc<AtomicUsize>) {
    let renders = Arc::new(AtomicUsize::new(0));
    let launcher = FixedLauncher {
        html,
        renders: renders.clone(),
    };
    (Arc::new(BrowserPool::new(Arc::new(launcher))), renders)
}

#[tokio::test]
async fn direct_fetch_with_readability() {
    let server = page_server("/lokal/1_haushalt.html", 200, fixture("article.html")).await;
    let url = format!("{}/lokal/1_haushalt.html", server.uri());

    let r = cascade(&ExtractorConfig::default()).extract(&url).await.unwrap();
    assert_eq!(r.method, Method::Readability);
    assert!(!r.paywalled);
    assert!(r.content.contains("Stadtrat hat am Donnerstagabend"));
}

#[tokio::test]
async fn paywall_marker_is_flagged() {
    let server = page_server("/weser.html", 200, fixture("paywalled.html")).await;
    let url = format!("{}/weser.html", server.uri());

    let r = cascade(&ExtractorConfig::default()).extract(&url).await.unwrap();
    assert!(r.paywalled);
    assert!(matches!(
        r.method,
        Method::Readability | Method::ParagraphFallback
    ));
    assert!(r.content.contains("Kreistag"));
}

fn lengths(html: &str, url: &str) -> (usize, usize) {
    let primary = readability::extract(html, Some(url)).expect("readability result");
    let fallback = paragraphs::extract(html).expect("paragraph result");
    (primary.content.chars().count(), fallback.content.chars().count())
}

#[tokio::test]
async fn paywalled_page_switches_to_longer_paragraph_text() {
    let html = fixture("paywall_overlay.html");
    let server = page_server("/wirtschaft/7_fernwaerme.html", 200, html.clone()).await;
    let url = format!("{}/wirtschaft/7_fernwaerme.html", server.uri());
    let (primary, fallback) = lengths(&html, &url);
    assert!(fallback > primary, "fixture: locked body must outweigh the teaser");

    let r = cascade(&ExtractorConfig::default()).extract(&url).await.unwrap();
    assert_eq!(r.method, Method::ParagraphFallback);
    assert!(r.paywalled);
    assert!(r.content.contains("zwölftausend Haushalte"));
}

#[tokio::test]
async fn paywalled_page_keeps_readability_when_fallback_is_not_longer() {
    let html = fixture("paywall_inline.html");
    let server = page_server("/kreis/8_radwege.html", 200, html.clone()).await;
    let url = format!("{}/kreis/8_radwege.html", server.uri());
    let (primary, fallback) = lengths(&html, &url);
    assert!(fallback <= primary, "fixture: list items only reach readability");

    let r = cascade(&ExtractorConfig::default()).extract(&url).await.unwrap();
    assert_eq!(r.method, Method::Readability);
    assert!(r.paywalled);
    assert!(r.content.contains("Marienfeld"));
}

#[tokio::test]
async fn unreachable_page_fails() {
    let server = page_server("/gone.html", 404, String::new()).await;
    let url = format!("{}/gone.html", server.uri());

    let err = cascade(&ExtractorConfig::default())
        .extract(&url)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::ExtractionFailed { .. }));
}

#[tokio::test]
async fn browser_render_wins_without_a_direct_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixture("paywalled.html")))
        .expect(0)
        .mount(&server)
        .await;
    let url = format!("{}/a.html", server.uri());

    let (pool, renders) = pool(Some(fixture("article.html")));
    let r = cascade(&ExtractorConfig::default())
        .with_browser(pool)
        .extract(&url)
        .await
        .unwrap();
    assert_eq!(r.method, Method::ChromiumBypass);
    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert!(r.content.contains("Nachtragshaushalt"));
}

#[tokio::test]
async fn broken_browser_falls_through_to_direct_fetch() {
    let server = page_server("/a.html", 200, fixture("article.html")).await;
    let url = format!("{}/a.html", server.uri());

    let (pool, renders) = pool(None);
    let r = cascade(&ExtractorConfig::default())
        .with_browser(pool)
        .extract(&url)
        .await
        .unwrap();
    assert_eq!(r.method, Method::Readability);
    // One relaunch after the first failed render.
    assert_eq!(renders.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn browser_only_for_listed_domains() {
    let server = page_server("/a.html", 200, fixture("article.html")).await;
    let url = format!("{}/a.html", server.uri());

    let mut cfg = ExtractorConfig::default();
    cfg.browser.domains = vec!["faz.net".into()];
    let (pool, renders) = pool(Some(fixture("article.html")));
    let r = cascade(&cfg).with_browser(pool).extract(&url).await.unwrap();
    assert_eq!(r.method, Method::Readability);
    assert_eq!(renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn site_api_is_tried_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles/4711"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "headline": "Aus der API",
            "body": "<p>Volltext direkt aus der Schnittstelle.</p>",
        })))
        .mount(&server)
        .await;

    let cfg = ExtractorConfig {
        site_rules: vec![SiteRuleCfg {
            host: "127.0.0.1".into(),
            id_pattern: r"/(\d+)_[^/]+\.html$".into(),
            api_url: format!("{}/api/articles/{{id}}", server.uri()),
        }],
        ..Default::default()
    };
    let url = format!("{}/lokal/4711_artikel.html", server.uri());
    let r = cascade(&cfg).extract(&url).await.unwrap();
    assert_eq!(r.method, Method::SiteApi);
    assert_eq!(r.title, "Aus der API");
    assert_eq!(r.content, "Volltext direkt aus der Schnittstelle.");
}

fn api_rule(server: &MockServer) -> ExtractorConfig {
    ExtractorConfig {
        site_rules: vec![SiteRuleCfg {
            host: "127.0.0.1".into(),
            id_pattern: r"/(\d+)_[^/]+\.html$".into(),
            api_url: format!("{}/api/articles/{{id}}", server.uri()),
        }],
        ..Default::default()
    }
}

async fn paywalled_api(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/articles/4711"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "headline": "Aus der API",
            "body": "<p>Nur der Vorspann. Weiterlesen nur mit Abo.</p>",
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn paywalled_site_api_falls_through_to_the_page() {
    let server = MockServer::start().await;
    paywalled_api(&server).await;
    Mock::given(method("GET"))
        .and(path("/lokal/4711_artikel.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(fixture("article.html")),
        )
        .mount(&server)
        .await;

    let url = format!("{}/lokal/4711_artikel.html", server.uri());
    let r = cascade(&api_rule(&server)).extract(&url).await.unwrap();
    assert_eq!(r.method, Method::Readability);
    assert!(r.paywalled);
    assert!(r.content.contains("Nachtragshaushalt"));
}

#[tokio::test]
async fn paywalled_site_api_is_kept_when_the_page_yields_nothing() {
    let server = MockServer::start().await;
    paywalled_api(&server).await;

    let url = format!("{}/lokal/4711_artikel.html", server.uri());
    let r = cascade(&api_rule(&server)).extract(&url).await.unwrap();
    assert_eq!(r.method, Method::SiteApi);
    assert!(r.paywalled);
    assert_eq!(r.content, "Nur der Vorspann. Weiterlesen nur mit Abo.");
}

// --- HTTP surface -----------------------------------------------------------

async fn post_extract(body: &'static str) -> (StatusCode, serde_json::Value) {
    let app = router(ExtractorState {
        cascade: Arc::new(cascade(&ExtractorConfig::default())),
    });
    let req = Request::builder()
        .method("POST")
        .uri("/extract")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn malformed_json_is_400() {
    let (status, v) = post_extract("{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("Invalid JSON"));
}

#[tokio::test]
async fn missing_url_is_400() {
    let (status, v) = post_extract(r#"{"link":"https://x"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Missing url field");

    let (status, _) = post_extract(r#"{"url":"   "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_extraction_is_422_with_url() {
    let (status, v) = post_extract(r#"{"url":"http://127.0.0.1:9/nothing.html"}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["error"], "Could not extract content");
    assert_eq!(v["url"], "http://127.0.0.1:9/nothing.html");
}

#[tokio::test]
async fn health_is_ok() {
    let app = router(ExtractorState {
        cascade: Arc::new(cascade(&ExtractorConfig::default())),
    });
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
