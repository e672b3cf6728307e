pub mod completion_client;
pub mod preview;
pub mod rag_client;
pub mod resource_fetcher;

// Re-export for convenience
pub use completion_client::CompletionClient;
pub use preview::PreviewCoordinator;
pub use rag_client::RagClient;
pub use resource_fetcher::ResourceFetcher;
