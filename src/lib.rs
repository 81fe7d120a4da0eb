pub mod batch;
pub mod cancel;
pub mod client;
pub mod config;
pub mod enrich;
pub mod error;
pub mod field;
pub mod merge;
pub mod persistence;
pub mod retry;
pub mod serializer;
pub mod session;
pub mod track;

pub use batch::{BatchFailure, BatchProcessor, BatchProgress, BatchState, BatchSummary};
pub use cancel::CancellationState;
pub use client::{ListingClient, ListingQuery, PlaylistSummary};
pub use config::AiConfig;
pub use enrich::{Enricher, Enrichment, EnrichmentClient};
pub use error::QuizlistError;
pub use field::{Field, FieldMap, FieldType, FieldValue};
pub use merge::StagedProposal;
pub use persistence::{FileStorage, MemoryStorage, StateStorage};
pub use retry::{retry_transient, RetryConfig};
pub use serializer::{Document, ImportReport};
pub use session::{AuthSession, AuthToken};
pub use track::{Playlist, Track};

pub type Result<T> = std::result::Result<T, QuizlistError>;
