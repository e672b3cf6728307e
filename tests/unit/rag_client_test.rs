use rag_reader::api::dto::ListParams;
use rag_reader::api::envelope::ApiError;
use rag_reader::config::Config;
use rag_reader::services::rag_client::RagClient;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(uri: &str) -> RagClient {
    RagClient::new(&Config {
        api_url: uri.to_string(),
        api_key: "rag-key".to_string(),
        ..Config::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_list_datasets_sends_paging_and_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/datasets"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "20"))
        .and(query_param("orderby", "create_time"))
        .and(query_param("desc", "true"))
        .and(header("authorization", "Bearer rag-key"))
        .and(header("ngrok-skip-browser-warning", "true"))
        .and(header("user-agent", "ExpoApp/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": [{"id": "ds1", "name": "Bio"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let datasets = client_for(&mock_server.uri())
        .list_datasets(&ListParams::default())
        .await
        .unwrap();
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].name, "Bio");
}

#[tokio::test]
async fn test_code_102_lists_as_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 102,
            "message": "You don't own the dataset."
        })))
        .mount(&mock_server)
        .await;

    let datasets = client_for(&mock_server.uri())
        .list_datasets(&ListParams::default())
        .await
        .unwrap();
    assert!(datasets.is_empty());
}

#[tokio::test]
async fn test_list_documents_requires_dataset() {
    let client = client_for("http://localhost:1");
    let result = client.list_documents("", &ListParams::default()).await;
    assert!(matches!(result, Err(ApiError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_list_documents_reads_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ds1/documents"))
        .and(query_param("name", "bab"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "docs": [{"id": "doc1", "knowledgebase_id": "ds1", "name": "bab1.pdf", "thumbnail": "t1"}],
                "total": 1
            }
        })))
        .mount(&mock_server)
        .await;

    let page = client_for(&mock_server.uri())
        .list_documents("ds1", &ListParams::named("bab"))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.docs[0].dataset_id, "ds1");
}

#[tokio::test]
async fn test_http_error_status_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/chats"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server.uri())
        .list_chat_assistants(&ListParams::default())
        .await;
    assert!(matches!(result, Err(ApiError::Status { status: 502, .. })));
}

#[tokio::test]
async fn test_completion_body_and_prefixed_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chats/chat-1/completions"))
        .and(body_json(json!({
            "question": "Apa itu sel?",
            "stream": false,
            "session_id": "s1",
            "user_id": "user-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": "data:{\"code\": 0, \"data\": {\"answer\": \"Sel adalah unit terkecil ##0$$\", \"reference\": {\"chunks\": [{\"id\": \"c1\", \"content\": \"Sel...\"}]}, \"session_id\": \"s1\"}}"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let answer = client_for(&mock_server.uri())
        .send_completion("chat-1", "Apa itu sel?", Some("s1"), "user-1")
        .await
        .unwrap();
    assert!(answer.answer.starts_with("Sel adalah"));
    assert_eq!(answer.references.len(), 1);
    assert_eq!(answer.session_id.as_deref(), Some("s1"));
}

#[tokio::test]
async fn test_completion_error_code_is_hard_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chats/chat-1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 102,
            "message": "Please input your question."
        })))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server.uri())
        .send_completion("chat-1", "?", None, "user-1")
        .await;
    match result {
        Err(ApiError::Server { code, message }) => {
            assert_eq!(code, 102);
            assert_eq!(message, "Please input your question.");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_rename_session_puts_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/chats/chat-1/sessions/s1"))
        .and(body_json(json!({"name": "Materi Sel", "user_id": "user-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(1)
        .mount(&mock_server)
        .await;

    client_for(&mock_server.uri())
        .rename_session("chat-1", "s1", "Materi Sel", "user-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_find_assistant_on_second_page() {
    let mock_server = MockServer::start().await;
    let first_page: Vec<_> = (0..100)
        .map(|i| json!({"id": format!("other-{}", i), "name": format!("Other {}", i)}))
        .collect();

    Mock::given(method("GET"))
        .and(path("/api/v1/chats"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": first_page
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chats"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": [{"id": "math", "name": "Math Assistant"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let assistant = client_for(&mock_server.uri())
        .find_assistant_for("Math")
        .await
        .unwrap()
        .expect("assistant on page 2");
    assert_eq!(assistant.id, "math");
}

#[tokio::test]
async fn test_related_questions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/sessions/related_questions"))
        .and(body_json(json!({"question": "Apa itu sel?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": ["Apa fungsi membran sel?", "Apa itu organel?"]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let questions = client_for(&mock_server.uri())
        .related_questions("Apa itu sel?")
        .await
        .unwrap();
    assert_eq!(questions, vec!["Apa fungsi membran sel?", "Apa itu organel?"]);
}

#[tokio::test]
async fn test_related_questions_without_data_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/sessions/related_questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .mount(&mock_server)
        .await;

    let questions = client_for(&mock_server.uri())
        .related_questions("Apa itu sel?")
        .await
        .unwrap();
    assert!(questions.is_empty());
}
