pub mod batch;
pub mod cache;
pub mod orchestrator;
pub mod registry;
pub mod scoring;

pub use batch::{BatchCoordinator, BatchEntry, BatchOptions, CompanyHints, DomainCompleteCallback};
pub use cache::EnrichmentCache;
pub use orchestrator::{EnrichRequest, Orchestrator, ProgressCallback};
pub use registry::{Registry, Source};
pub use scoring::{
    score, score_record, CompositeScore, Confidence, KnownAttributes, LeadStatus, ScoreFactors,
    ScoringAttributes,
};
