pub mod blob_registry;
pub mod supabase;

pub use blob_registry::{BlobHandle, BlobRegistry};
pub use supabase::{SupabaseClient, SupabaseError};
