pub mod chat_session;
pub mod study_aids;

pub use chat_session::{AssistantTarget, ChatSessionReconciler, ChatState};
pub use study_aids::{Lookup, StudyAids};
