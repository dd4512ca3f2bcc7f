//! Pipeline orchestrator.
//!
//! Drives one work unit end to end: lyrics, audio, video in a hard
//! dependency chain, then the publication fan-out, then the history ledger.
//! Stage-chain failures abort the run and land in the durable error log;
//! fan-out failures are isolated per stage and only cost the run a link.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::adapters::musicgen::{self, MusicGenSource};
use crate::adapters::release::{self, ReleaseParams};
use crate::adapters::renderer::{self, RenderProps};
use crate::adapters::{facebook, fallback_lyrics, ffmpeg, pick_link, voice, youtube, Lyricist};
use crate::config::config;
use crate::core::batcher;
use crate::core::loader::ResourceLoader;
use crate::core::outcome::{settle, StageOutcome};
use crate::domain::{Commit, HistoryRow, Lyrics, PushPayload, RunOutput, WorkUnit};
use crate::errlog::{log_error_best_effort, ErrorContext};
use crate::genre::Genre;
use crate::ledger::HistoryLedger;

/// Shared pipeline state: one per process, used by every run
pub struct Pipeline {
    lyricist: Lyricist,
    loader: ResourceLoader<MusicGenSource>,
    ledger: HistoryLedger,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            lyricist: Lyricist::new(),
            loader: ResourceLoader::new(MusicGenSource::new()),
            ledger: HistoryLedger::default(),
        }
    }

    /// Process a filtered push: resolve the work unit and run it.
    ///
    /// This is the detached-task entry point; failures are recorded in the
    /// durable error log before being returned, because no caller response
    /// can carry them anymore.
    #[instrument(skip(self, payload, commit), fields(sha = %commit.short_sha()))]
    pub async fn process_push(&self, payload: PushPayload, commit: Commit) -> Result<RunOutput> {
        let unit = batcher::resolve_work_unit(&payload, commit);
        info!(
            sha = %unit.commit.short_sha(),
            batched = unit.batched,
            "Starting pipeline run"
        );

        match self.run_work_unit(&payload, &unit).await {
            Ok(output) => {
                info!(release = %output.release_url, "Pipeline run completed");
                Ok(output)
            }
            Err(err) => {
                log_error_best_effort(
                    ErrorContext {
                        caller: "pipeline",
                        commit_sha: &unit.commit.id,
                        commit_message: &unit.message,
                    },
                    &err,
                )
                .await;
                Err(err)
            }
        }
    }

    async fn run_work_unit(&self, payload: &PushPayload, unit: &WorkUnit) -> Result<RunOutput> {
        let short_sha = unit.commit.short_sha().to_string();

        // Stage 1: lyrics. The genre is chosen locally; a collaborator
        // failure degrades to the canned verse and the chain continues.
        let genre = Genre::pick(&mut rand::thread_rng());
        let lyrics = match self.lyricist.generate_lyrics(&unit.message, genre).await {
            Ok(lyrics) => lyrics,
            Err(err) => {
                warn!(
                    error = format!("{err:#}"),
                    "Lyrics generation failed, using fallback"
                );
                fallback_lyrics(&unit.message, genre)
            }
        };

        // Stage 2: audio.
        let audio_path = self.generate_audio(unit, &lyrics).await?;

        // Stage 3: video.
        let props = RenderProps {
            commit_message: unit.message.clone(),
            author_name: unit.author.clone(),
            author_avatar_url: unit.avatar_url.clone(),
            generated_text: lyrics.text.clone(),
            genre: lyrics.genre,
            palette: lyrics.genre.palette(),
            my_face_url: config().my_face_url.clone(),
            company_logo_url: config().company_logo_url.clone(),
            audio_path: audio_path.to_string_lossy().to_string(),
        };
        let video_path = renderer::render_video(props, &short_sha).await?;
        let video_abs = tokio::fs::canonicalize(&video_path)
            .await
            .unwrap_or(video_path);

        let description = self.build_description(unit, &lyrics).await;
        let upload_title = if lyrics.title.trim().is_empty() {
            unit.message.clone()
        } else {
            lyrics.title.clone()
        };

        let output = self
            .publish(payload, unit, &lyrics, &video_abs, &upload_title, &description)
            .await;

        self.record_history(unit, &lyrics, &output).await;

        Ok(output)
    }

    /// Instrumental and voice run concurrently and join before mixing.
    /// Voice failure costs only the vocal track; instrumental failure (or a
    /// model load failure behind it) aborts the run.
    async fn generate_audio(&self, unit: &WorkUnit, lyrics: &Lyrics) -> Result<PathBuf> {
        let cfg = config();
        tokio::fs::create_dir_all(&cfg.temp_dir)
            .await
            .context("Failed to create temp dir")?;

        let short_sha = unit.commit.short_sha();
        let final_mp3 = cfg.temp_dir.join(format!("{short_sha}.mp3"));

        let instrumental_task = async {
            let handles = self.loader.acquire().await?;
            musicgen::generate_instrumental(handles, lyrics.genre, &unit.message, short_sha).await
        };
        let voice_task = voice::synthesize(&lyrics.text, lyrics.genre, short_sha);

        let (instrumental_result, voice_result) = tokio::join!(instrumental_task, voice_task);

        let instrumental_path = match instrumental_result {
            Ok(path) => path,
            Err(err) => {
                // The voice track is scratch; do not leak it past the run.
                if let Ok(voice_path) = &voice_result {
                    let _ = tokio::fs::remove_file(voice_path).await;
                }
                return Err(err.context("Instrumental generation failed"));
            }
        };

        match voice_result {
            Ok(voice_path) => {
                let mixed = ffmpeg::mix_tracks(&instrumental_path, &voice_path, &final_mp3).await;

                for tmp in [&instrumental_path, &voice_path] {
                    if let Err(err) = tokio::fs::remove_file(tmp).await {
                        debug!(?err, "Intermediate track already gone");
                    }
                }

                mixed?;
            }
            Err(err) => {
                warn!(
                    error = format!("{err:#}"),
                    "Voice generation failed, using instrumental only"
                );
                tokio::fs::rename(&instrumental_path, &final_mp3)
                    .await
                    .context("Failed to move instrumental into place")?;
            }
        }

        info!(path = %final_mp3.display(), "Final audio ready");
        Ok(final_mp3)
    }

    /// Video description: lyrics, commit context, and a comic CTA whose
    /// target is a pure function of the commit sha
    async fn build_description(&self, unit: &WorkUnit, lyrics: &Lyrics) -> String {
        let target = pick_link(unit.commit.short_sha());
        let snippet: String = lyrics.text.chars().take(60).collect();
        let cta = self
            .lyricist
            .generate_cta(lyrics.genre, &snippet, target.url)
            .await;

        let base = format!(
            "{}\n\nCommit: {}\nAutore: @{}",
            lyrics.text, unit.message, unit.author
        );

        if cta.is_empty() {
            base
        } else {
            format!("{base}\n\n---\n{cta}")
        }
    }

    /// Publication fan-out: all stages run concurrently, each settles into
    /// its own outcome, nothing short-circuits.
    async fn publish(
        &self,
        payload: &PushPayload,
        unit: &WorkUnit,
        lyrics: &Lyrics,
        video_abs: &Path,
        upload_title: &str,
        description: &str,
    ) -> RunOutput {
        let cfg = config();
        let video_str = video_abs.to_string_lossy().to_string();

        let repo_full_name = if payload.repository.full_name.is_empty() {
            cfg.github_repo.clone()
        } else {
            payload.repository.full_name.clone()
        };

        let params = ReleaseParams {
            commit_sha: unit.commit.id.clone(),
            commit_message: unit.message.clone(),
            generated_title: lyrics.title.clone(),
            generated_text: lyrics.text.clone(),
            author_name: unit.author.clone(),
            author_avatar_url: unit.avatar_url.clone(),
            repo_full_name,
            video_path: video_str.clone(),
            youtube_url: None,
            facebook_url: None,
        };

        let (release_outcome, youtube_outcome, facebook_outcome) = tokio::join!(
            settle("GitHub Release", release::create_release(&params)),
            async {
                if cfg.youtube_enabled {
                    settle(
                        "YouTube",
                        youtube::upload(&video_str, upload_title, description),
                    )
                    .await
                } else {
                    StageOutcome::disabled()
                }
            },
            async {
                if cfg.facebook_enabled {
                    settle(
                        "Facebook",
                        facebook::upload(&video_str, upload_title, description),
                    )
                    .await
                } else {
                    StageOutcome::disabled()
                }
            },
        );

        let youtube_url = youtube_outcome.value();
        let facebook_url = facebook_outcome.value();

        let (release_url, tag_name) = match &release_outcome {
            StageOutcome::Success(release) => {
                (release.release_url.clone(), release.tag_name.clone())
            }
            StageOutcome::Failure(_) => {
                (String::new(), format!("v-{}", unit.commit.short_sha()))
            }
        };

        if release_outcome.is_success() && (youtube_url.is_some() || facebook_url.is_some()) {
            let update = ReleaseParams {
                youtube_url: youtube_url.clone(),
                facebook_url: facebook_url.clone(),
                ..params
            };
            settle(
                "Release update with social links",
                release::update_release_notes(&tag_name, &update),
            )
            .await;
        }

        RunOutput {
            release_url,
            tag_name,
            youtube_url,
            facebook_url,
            video_path: video_str,
        }
    }

    /// Append the run to the ledger and push it, both best-effort: a ledger
    /// problem never retroactively fails a completed run.
    async fn record_history(&self, unit: &WorkUnit, lyrics: &Lyrics, output: &RunOutput) {
        let title = if lyrics.title.trim().is_empty() {
            unit.message.clone()
        } else {
            lyrics.title.clone()
        };

        let row = HistoryRow {
            date: Utc::now().format("%Y-%m-%d %H:%M").to_string(),
            author: format!("@{}", unit.author),
            title,
            release_url: output.release_url.clone(),
            tag_name: output.tag_name.clone(),
            youtube_url: output.youtube_url.clone(),
            facebook_url: output.facebook_url.clone(),
        };

        if let Err(err) = self.ledger.append(&row).await {
            log_error_best_effort(
                ErrorContext {
                    caller: "history",
                    commit_sha: &unit.commit.id,
                    commit_message: &unit.message,
                },
                &err,
            )
            .await;
            return;
        }

        if let Err(err) = self.ledger.publish().await {
            warn!(error = format!("{err:#}"), "Ledger publish failed");
        }
    }

    /// Shared model loader, exposed so a deployment can warm it up ahead of
    /// the first push
    pub fn loader(&self) -> &ResourceLoader<MusicGenSource> {
        &self.loader
    }
}

/// Convenience constructor used by the server and the CLI
pub fn shared_pipeline() -> Arc<Pipeline> {
    Arc::new(Pipeline::new())
}
