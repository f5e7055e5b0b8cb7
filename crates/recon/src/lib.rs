//! `scoresheet-recon`: multi-source scoring-play reconciliation engine.
//!
//! Pure engine crate: receives one game's raw goal records from an
//! authoritative feed and any number of derived feeds, returns per-player and
//! per-team discrepancies against the authoritative feed.
//! No CLI dependencies.

pub mod aggregate;
pub mod builder;
pub mod config;
pub mod discrepancy;
pub mod engine;
pub mod error;
pub mod identity;
pub mod model;
pub mod normalize;
pub mod source;

pub use config::{ReconConfig, SourceProfile};
pub use engine::{reconcile, run};
pub use error::ReconError;
pub use model::{GameInput, GameReconciliationResult, ReconciliationStatus, SourceId};
pub use source::{load_game, DirectorySource, GameSource};
