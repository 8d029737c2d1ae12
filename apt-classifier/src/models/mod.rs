//! Data models for the classifier

pub mod artist;
pub mod batch_run;

pub use artist::{Attribution, Field, NormalizedRecord, PriorClassification, RawArtistRecord};
pub use batch_run::{BatchRun, BatchState, StateTransition};
