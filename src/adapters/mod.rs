//! External collaborators.
//!
//! Each adapter owns the call/response contract of one external system:
//! HTTP clients for the LLM and the upload destinations, subprocesses for
//! speech, instrumental inference, audio post-processing, rendering and
//! release creation. Their internals are out of scope for the pipeline;
//! only these seams matter.

pub mod facebook;
pub mod ffmpeg;
pub mod lyricist;
pub mod musicgen;
pub mod release;
pub mod renderer;
pub mod voice;
pub mod youtube;

pub use lyricist::{fallback_lyrics, pick_link, Lyricist};
pub use musicgen::{ModelHandles, MusicGenSource};
pub use release::{CreatedRelease, ReleaseParams};
pub use renderer::RenderProps;
