//! Data structures flowing through the pipeline.

pub mod push;
pub mod work;

pub use push::{Commit, CommitAuthor, PushPayload, Repository, Sender};
pub use work::{HistoryRow, Lyrics, RunOutput, WorkUnit};
