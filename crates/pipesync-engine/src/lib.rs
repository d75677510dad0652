//! Pipesync Engine
//!
//! The step-chain engine that keeps the pipeline published. Instance
//! credentials rotate, so the whole sequence repeats on a fixed interval:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SyncEngine                           │
//! │  - run(cancel): endless interval loop                       │
//! │  - run_cycle(): one pass over the step chain + cleanup      │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!        fetch_source → materialize_credentials → publish_pipeline
//! ```
//!
//! A step failure abandons the rest of the chain for that cycle only; the
//! checkout directory is removed unconditionally before the engine sleeps,
//! and the next cycle starts from scratch.

mod engine;
mod error;
mod step;

pub use engine::{SyncConfig, SyncEngine};
pub use error::SyncError;
pub use step::Step;
