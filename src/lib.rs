pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::EnrichConfig;

pub use adapters::LocalSink;
pub use core::{
    BatchCoordinator, BatchEntry, BatchOptions, CompanyHints, CompositeScore, EnrichRequest,
    EnrichmentCache, KnownAttributes, Orchestrator, Registry,
};
pub use domain::model::{Domain, EnrichmentRecord, SourceId, SourceResult, SourceStatus};
pub use domain::ports::{PersistenceSink, QueryExecutor, SourceAdapter};
pub use utils::error::{EnrichError, Result};
