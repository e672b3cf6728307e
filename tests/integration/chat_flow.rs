use super::{completion_body, json, test_config, Arc};
use rag_reader::orchestrator::chat_session::{
    AssistantTarget, ChatSessionReconciler, ChatState, APOLOGY_MESSAGE,
};
use rag_reader::services::completion_client::CompletionClient;
use rag_reader::services::rag_client::RagClient;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_assistants(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": [
                {"id": "chat-bio-2", "name": "Biologi Lanjutan Assistant"},
                {"id": "chat-bio", "name": "Biologi Assistant"}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_session(server: &MockServer, chat_id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/api/v1/chats/{}/sessions", chat_id)))
        .and(body_partial_json(json!({"name": "new session", "user_id": "user-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "id": "s1",
                "chat_id": chat_id,
                "name": "new session",
                "messages": [{"role": "assistant", "content": "Hi! I'm your assistant, what can I do for you?"}]
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_book_chat_end_to_end() {
    let rag = MockServer::start().await;
    let llm = MockServer::start().await;
    let config = test_config(&rag.uri(), &llm.uri(), "http://localhost:1");

    mount_assistants(&rag).await;
    mount_session(&rag, "chat-bio").await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chats/chat-bio/completions"))
        .and(body_partial_json(json!({"session_id": "s1", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "answer": "Fotosintesis terjadi di kloroplas ##0$$",
                "reference": {"chunks": [{"id": "c1", "content": "Kloroplas...", "document_name": "bab3.pdf"}]},
                "session_id": "s1"
            }
        })))
        .expect(2)
        .mount(&rag)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/chats/chat-bio/sessions/s1"))
        .and(body_partial_json(json!({"name": "Materi Fotosintesis"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(1)
        .mount(&rag)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("x-title", "Rag Reader"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Materi Fotosintesis")))
        .expect(1)
        .mount(&llm)
        .await;

    let mut chat = ChatSessionReconciler::new(Arc::new(RagClient::new(&config).unwrap()), "user-1")
        .with_title_generator(Arc::new(CompletionClient::new(&config).unwrap()));

    chat.open(AssistantTarget::BookName("Biologi".to_string()))
        .await
        .unwrap();
    assert!(matches!(chat.state(), ChatState::Active { chat_id, .. } if chat_id == "chat-bio"));

    let reply = chat.send("Jelaskan tentang fotosintesis").await.unwrap().unwrap();
    assert_eq!(reply.references.len(), 1);
    assert_eq!(reply.references[0].document_name.as_deref(), Some("bab3.pdf"));

    chat.send("Di mana terjadinya?").await.unwrap();
    assert_eq!(chat.messages().len(), 5);
}

#[tokio::test]
async fn test_backend_failure_mid_conversation() {
    let rag = MockServer::start().await;
    let config = test_config(&rag.uri(), "http://localhost:1", "http://localhost:1");

    mount_session(&rag, "chat-bio").await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chats/chat-bio/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&rag)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .mount(&rag)
        .await;

    let mut chat = ChatSessionReconciler::new(Arc::new(RagClient::new(&config).unwrap()), "user-1");
    chat.open(AssistantTarget::Id("chat-bio".to_string()))
        .await
        .unwrap();

    let reply = chat.send("halo").await.unwrap().unwrap();
    assert_eq!(reply.content, APOLOGY_MESSAGE);
    assert!(chat.messages().iter().any(|m| m.is_user && m.content == "halo"));
}

#[tokio::test]
async fn test_book_without_assistant() {
    let rag = MockServer::start().await;
    let config = test_config(&rag.uri(), "http://localhost:1", "http://localhost:1");
    mount_assistants(&rag).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&rag)
        .await;

    let mut chat = ChatSessionReconciler::new(Arc::new(RagClient::new(&config).unwrap()), "user-1");
    let state = chat
        .open(AssistantTarget::BookName("Sejarah".to_string()))
        .await
        .unwrap();
    assert_eq!(state, &ChatState::Unavailable);
}
