//! Command-line interface.
//!
//! `serve` runs the webhook server; `run` replays a stored push payload
//! through the pipeline without signature checks, which is the fastest way
//! to exercise a deployment end to end.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::config;
use crate::core::shared_pipeline;
use crate::server::{serve, AppState};
use crate::webhook::{decide, FilterDecision};

/// commit-karaoke - turns git pushes into karaoke videos
#[derive(Parser, Debug)]
#[command(name = "commit-karaoke")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the webhook server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000", env = "PORT")]
        port: u16,
    },

    /// Replay a stored push payload through the pipeline
    Run {
        /// Path to a JSON file holding a push event payload
        payload: PathBuf,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve { port } => {
                let pipeline = shared_pipeline();
                let state = AppState::new(config().webhook_secret.as_bytes(), pipeline);
                serve(state, port).await
            }

            Commands::Run { payload } => {
                let raw = tokio::fs::read_to_string(&payload)
                    .await
                    .with_context(|| format!("Failed to read payload: {}", payload.display()))?;
                let push: crate::domain::PushPayload =
                    serde_json::from_str(&raw).context("Payload is not a push event")?;

                let commit = match decide(&push) {
                    FilterDecision::NoCommit => {
                        println!("ignored: no commit found");
                        return Ok(());
                    }
                    FilterDecision::SkipRequested => {
                        println!("ignored: [skip ci] commit");
                        return Ok(());
                    }
                    FilterDecision::Process(commit) => commit,
                };

                let pipeline = shared_pipeline();
                let output = pipeline.process_push(push, commit).await?;

                println!("release: {}", output.release_url);
                if let Some(url) = output.youtube_url {
                    println!("youtube: {url}");
                }
                if let Some(url) = output.facebook_url {
                    println!("facebook: {url}");
                }
                println!("video: {}", output.video_path);
                Ok(())
            }
        }
    }
}
