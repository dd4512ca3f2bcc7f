//! commit-karaoke - turns git pushes into karaoke videos
//!
//! A webhook-driven pipeline: a push arrives, its commit message becomes a
//! comic song (lyrics, voice, instrumental), the song becomes a karaoke
//! video, and the video fans out to a GitHub release and the configured
//! social destinations. Every completed run lands in an append-only history
//! ledger.
//!
//! # Architecture
//!
//! - `server`: webhook intake; verifies signatures and spawns detached runs
//! - `webhook`: signature verification and event filtering
//! - `core`: orchestration (batching, stage chain, fan-out, model loader)
//! - `adapters`: external collaborators (LLM, speech, instrumental model,
//!   ffmpeg, renderer, release/upload destinations)
//! - `ledger`: durable run history
//! - `domain`: payload and per-run data structures
//!
//! # Usage
//!
//! ```bash
//! # Serve the webhook endpoint
//! commit-karaoke serve --port 3000
//!
//! # Replay a stored push payload without signature checks
//! commit-karaoke run payload.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errlog;
pub mod genre;
pub mod ledger;
pub mod server;
pub mod webhook;

// Re-export main types at crate root for convenience
pub use crate::core::{Pipeline, ResourceLoader, StageOutcome};
pub use domain::{Commit, HistoryRow, Lyrics, PushPayload, RunOutput, WorkUnit};
pub use genre::Genre;
pub use ledger::HistoryLedger;
pub use server::AppState;
