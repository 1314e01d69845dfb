//! Clipstream transcode pipeline
//!
//! Owns everything between "asset finalized" and "asset playable": the
//! priority-ordered job queue and its scheduler ([`queue`]), the worker that
//! drives the external streaming provider ([`transcode`]), and the provider
//! client itself ([`provider`]).

pub mod provider;
pub mod queue;
pub mod transcode;

pub use provider::{HttpStreamProvider, IngestMeta, StreamDetails, StreamProvider};
pub use queue::{TranscodeQueue, TranscodeQueueConfig};
pub use transcode::TranscodeWorker;
