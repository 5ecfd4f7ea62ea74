//! The marketplace product synchronization engine: credential resolution,
//! remote catalog pagination, record normalization, image mirroring and
//! idempotent persistence, driven per marketplace by the orchestrator.

pub mod client;
pub mod credentials;
pub mod error;
pub mod mirror;
pub mod normalize;
pub mod orchestrator;
pub mod signature;
pub mod store;

pub use client::{CatalogCount, CatalogPage, CatalogSource, MarketplaceClient};
pub use error::SyncError;
pub use mirror::ImageMirror;
pub use normalize::{normalize, ProductRow};
pub use orchestrator::{run_tick, sync_marketplace, SyncOptions, SyncOutcome};
pub use store::{OwnerOnConflict, ProductSink, ProductUpsertStore};
