use rag_reader::config::Config;
use rag_reader::models::internal::Document;
use rag_reader::services::resource_fetcher::{FetchError, ResourceFetcher};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher_for(uri: &str, max_concurrent_fetches: usize) -> ResourceFetcher {
    ResourceFetcher::new(&Config {
        api_url: uri.to_string(),
        api_key: "rag-key".to_string(),
        max_concurrent_fetches,
        ..Config::default()
    })
    .unwrap()
}

fn document(id: &str, thumbnail: Option<&str>) -> Document {
    serde_json::from_value(json!({
        "id": id,
        "dataset_id": "ds1",
        "name": format!("{}.pdf", id),
        "thumbnail": thumbnail
    }))
    .unwrap()
}

#[tokio::test]
async fn test_thumbnails_keep_input_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/document/image/ds1-t1"))
        .and(header("authorization", "Bearer rag-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![1u8, 2, 3]),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/document/image/ds1-t3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server.uri(), 4);
    let docs = vec![
        document("a", Some("t1")),
        document("b", None),
        document("c", Some("t3")),
    ];
    let thumbs = fetcher.fetch_thumbnails(&docs).await;

    assert_eq!(thumbs.len(), 3);
    assert_eq!(thumbs[0].0, "a");
    assert_eq!(thumbs[0].1.as_deref(), Some("data:image/png;base64,AQID"));
    assert_eq!(thumbs[1], ("b".to_string(), None));
    assert_eq!(thumbs[2], ("c".to_string(), None));
}

#[tokio::test]
async fn test_thumbnail_fetches_are_bounded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0u8])
                .set_delay(Duration::from_millis(200)),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server.uri(), 1);
    let docs: Vec<Document> = (0..3)
        .map(|i| document(&format!("d{}", i), Some("t")))
        .collect();

    let started = Instant::now();
    let thumbs = fetcher.fetch_thumbnails(&docs).await;

    // One permit means the three delayed responses run back to back
    assert!(started.elapsed() >= Duration::from_millis(550));
    assert!(thumbs.iter().all(|(_, uri)| uri.is_some()));
}

#[tokio::test]
async fn test_pdf_blob_released_on_drop() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/document/get/doc1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.7".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server.uri(), 4);
    let url = fetcher.document_url("doc1");
    {
        let handle = fetcher.fetch_pdf_blob(&url).await.unwrap();
        assert_eq!(fetcher.blobs().live_count(), 1);
        assert!(fetcher.blobs().resolve(handle.url()).is_some());
    }
    assert_eq!(fetcher.blobs().live_count(), 0);
}

#[tokio::test]
async fn test_failed_pdf_fetch_leaves_no_blob() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server.uri(), 4);
    let result = fetcher.fetch_pdf_blob(&fetcher.document_url("doc1")).await;

    assert!(matches!(result, Err(FetchError::Status { status: 403 })));
    assert_eq!(fetcher.blobs().live_count(), 0);
}
