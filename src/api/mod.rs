pub mod dto;
pub mod envelope;
pub mod proxy;

pub use envelope::{ApiError, ApiOutcome};
pub use proxy::{create_router, ProxyState};
