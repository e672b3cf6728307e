use super::rag_config;
use rag_reader::services::preview::{PdfSource, Platform, PreviewCoordinator, WebStrategy};
use rag_reader::services::resource_fetcher::ResourceFetcher;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn coordinator(rag_uri: &str, platform: Platform, cache: &TempDir) -> PreviewCoordinator {
    let fetcher = ResourceFetcher::new(&rag_config(rag_uri)).unwrap();
    PreviewCoordinator::new(fetcher, platform, "http://localhost:8081", cache.path())
}

#[tokio::test]
async fn test_native_download_is_idempotent() {
    let rag = MockServer::start().await;
    let cache = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/document/get/doc1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .expect(1)
        .mount(&rag)
        .await;

    let preview = coordinator(&rag.uri(), Platform::Native, &cache);

    let first = preview.download("doc1").await.unwrap();
    assert!(!first.reused);
    assert!(first.local_uri.starts_with("file://"));
    assert_eq!(
        std::fs::read(preview.cache_path("doc1")).unwrap(),
        b"%PDF-1.4".to_vec()
    );

    let second = preview.download("doc1").await.unwrap();
    assert!(second.reused);
    assert_eq!(second.local_uri, first.local_uri);
}

#[tokio::test]
async fn test_failed_download_leaves_no_file() {
    let rag = MockServer::start().await;
    let cache = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&rag)
        .await;

    let preview = coordinator(&rag.uri(), Platform::Native, &cache);
    assert!(preview.download("doc1").await.is_err());
    assert!(!preview.cache_path("doc1").exists());
}

#[tokio::test]
async fn test_web_download_returns_document_url() {
    let cache = TempDir::new().unwrap();
    let preview = coordinator("http://rag.local", Platform::Web, &cache);

    let result = preview.download("doc1").await.unwrap();
    assert_eq!(result.local_uri, "http://rag.local/v1/document/get/doc1");
    assert!(std::fs::read_dir(cache.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_web_blob_source_released_on_drop() {
    let rag = MockServer::start().await;
    let cache = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/document/get/doc1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&rag)
        .await;

    let fetcher = ResourceFetcher::new(&rag_config(&rag.uri())).unwrap();
    let blobs = fetcher.blobs().clone();
    let preview = PreviewCoordinator::new(fetcher, Platform::Web, "http://localhost:8081", cache.path())
        .with_web_strategy(WebStrategy::Blob);

    let source = preview.resolve_source("doc1").await.unwrap();
    assert!(matches!(source, PdfSource::Blob(_)));
    assert!(source.uri().starts_with("blob:"));
    assert_eq!(blobs.live_count(), 1);

    drop(source);
    assert_eq!(blobs.live_count(), 0);
}

#[tokio::test]
async fn test_concurrent_downloads_share_one_cached_file() {
    let rag = MockServer::start().await;
    let cache = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/document/get/doc1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4 shared".to_vec())
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .mount(&rag)
        .await;

    let preview = coordinator(&rag.uri(), Platform::Native, &cache);
    let (first, second) = tokio::join!(preview.download("doc1"), preview.download("doc1"));

    assert_eq!(first.unwrap().local_uri, second.unwrap().local_uri);
    assert_eq!(
        std::fs::read(preview.cache_path("doc1")).unwrap(),
        b"%PDF-1.4 shared".to_vec()
    );
    let leftovers: Vec<_> = std::fs::read_dir(cache.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty());
}
