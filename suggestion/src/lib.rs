pub mod engine;
pub mod store_cap;
pub mod types;

pub use engine::{generate_candidates, SuggestionError};
pub use store_cap::{enforce_store_cap, StoreCapOutcome, StoreCapSelection};
pub use types::{MigrationCandidate, SuggestionRequest, SuggestionResult};
