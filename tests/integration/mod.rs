// tests/integration/mod.rs

pub use serde_json::json;
pub use std::sync::Arc;

use rag_reader::config::Config;

pub mod chat_flow;
pub mod preview;

// ============================================
// Shared Test Helpers
// ============================================

/// Config pointing every backend at mock servers
pub fn test_config(rag_uri: &str, completion_uri: &str, supabase_uri: &str) -> Config {
    Config {
        api_url: rag_uri.to_string(),
        api_key: "rag-key".to_string(),
        user_id: "user-1".to_string(),
        completion_base_url: completion_uri.to_string(),
        completion_api_key: "completion-key".to_string(),
        site_url: Some("reader.example.com".to_string()),
        site_name: Some("Rag Reader".to_string()),
        supabase_url: supabase_uri.to_string(),
        supabase_anon_key: "anon".to_string(),
        ..Config::default()
    }
}

pub fn rag_config(rag_uri: &str) -> Config {
    test_config(rag_uri, "http://localhost:1", "http://localhost:1")
}

/// Chat completion response with `content` as the single choice
pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "gen-1",
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}
