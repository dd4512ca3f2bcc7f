//! Lyrics and description copy via the local LLM.
//!
//! Talks to an Ollama endpoint. Every call has a deterministic fallback so
//! an unreachable or misbehaving model never stops a run: lyrics degrade to
//! a canned verse derived from the commit message, the CTA degrades to a
//! fixed line.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::config::config;
use crate::domain::Lyrics;
use crate::genre::Genre;

const LLM_MODEL: &str = "llama3";

/// Promotional links rotated through video descriptions
pub struct StudioLink {
    pub url: &'static str,
    pub label: &'static str,
}

pub const STUDIO_LINKS: [StudioLink; 4] = [
    StudioLink {
        url: "https://www.thinkpinkstudio.it",
        label: "sito Italia",
    },
    StudioLink {
        url: "https://www.thinkpinkstudio.ug",
        label: "sito Uganda",
    },
    StudioLink {
        url: "https://www.facebook.com/thinkpinkphoto",
        label: "Facebook",
    },
    StudioLink {
        url: "https://www.linkedin.com/company/thinkpinkstudio/?viewAsMember=true",
        label: "LinkedIn",
    },
];

const FALLBACK_CTA: &str =
    "Visto il disastro? Venite a vedere cosa facciamo: https://www.thinkpinkstudio.it";

/// Pick the CTA target for a commit; pure function of the short sha
pub fn pick_link(short_sha: &str) -> &'static StudioLink {
    let sum: u32 = short_sha.chars().take(8).map(|c| c as u32).sum();
    &STUDIO_LINKS[sum as usize % STUDIO_LINKS.len()]
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct LyricsJson {
    #[serde(default)]
    title: String,
    #[serde(default)]
    lyrics: String,
}

#[derive(Debug, Deserialize)]
struct CtaJson {
    #[serde(default)]
    cta: String,
}

/// Client for the text-generation collaborator
pub struct Lyricist {
    client: reqwest::Client,
    host: String,
}

impl Default for Lyricist {
    fn default() -> Self {
        Self::new()
    }
}

impl Lyricist {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            host: config().ollama_host.clone(),
        }
    }

    async fn generate_json(&self, prompt: String, temperature: f64) -> Result<String> {
        let url = format!("{}/api/generate", self.host);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": LLM_MODEL,
                "prompt": prompt,
                "format": "json",
                "stream": false,
                "options": { "temperature": temperature },
            }))
            .send()
            .await
            .context("Failed to reach the LLM")?
            .error_for_status()
            .context("LLM rejected the request")?;

        let body: OllamaResponse = response.json().await.context("Malformed LLM response")?;

        let text = body.response.trim().to_string();
        if text.is_empty() {
            anyhow::bail!("LLM returned an empty response");
        }

        Ok(text)
    }

    /// Ask for a comic song rewrite of the commit message. Errors here are
    /// expected to be absorbed by the caller via `fallback_lyrics`.
    pub async fn generate_lyrics(&self, commit_message: &str, genre: Genre) -> Result<Lyrics> {
        let prompt = format!(
            "Sei un autore comico musicale italiano.\n\
             Riscrivi il commit message come canzone {} da 10 secondi.\n\
             \n\
             Vincoli:\n\
             - Scrivi esattamente 30 parole cantabili\n\
             - Il testo sara CANTATO da una voce: usa rime e ritmo\n\
             - Tono: idiota, ironico, memabile\n\
             - Mantieni un riferimento al messaggio originale\n\
             - Evita contenuti offensivi\n\
             \n\
             Output JSON valido con chiavi:\n\
             {{\n\
               \"title\": \"titolo ironico breve\",\n\
               \"lyrics\": \"testo\\nsu piu righe\\ncon a capo\"\n\
             }}\n\
             \n\
             Commit message originale:\n\
             {}",
            genre.label(),
            commit_message
        );

        let raw = self.generate_json(prompt, 1.0).await?;
        let parsed: LyricsJson =
            serde_json::from_str(&raw).context("LLM lyrics are not the expected JSON")?;

        if parsed.lyrics.trim().is_empty() {
            anyhow::bail!("LLM returned no lyrics");
        }

        let title = if parsed.title.trim().is_empty() {
            format!("Commit {}", genre.label())
        } else {
            parsed.title.trim().to_string()
        };

        Ok(Lyrics {
            genre,
            title,
            text: parsed.lyrics.trim().to_string(),
        })
    }

    /// Comic call-to-action for the video description. Never fails; the
    /// fixed line covers every error path.
    pub async fn generate_cta(&self, genre: Genre, lyrics_snippet: &str, target_url: &str) -> String {
        let prompt = format!(
            "Sei un copywriter comico. La canzone è in stile {}.\n\
             \n\
             Testo della canzone (snippet): \"{}\"\n\
             \n\
             Scrivi una CTA ironica di 1-2 righe (massimo 80 caratteri) per \
             invitarci a visitare questo link: {}\n\
             \n\
             Vincoli:\n\
             - Tono: idiotico, meme, coerente con il karaoke\n\
             - Non usare emoji\n\
             - Termina con lo URL: {}\n\
             - Massimo 80 caratteri (incluso il link)",
            genre.label(),
            lyrics_snippet,
            target_url,
            target_url
        );

        let result: Result<String> = async {
            let raw = self.generate_json(prompt, 1.1).await?;
            let parsed: CtaJson = serde_json::from_str(&raw).context("CTA is not JSON")?;
            let cta = parsed.cta.trim().to_string();
            if cta.is_empty() {
                anyhow::bail!("LLM returned no CTA");
            }
            Ok(cta)
        }
        .await;

        match result {
            Ok(cta) => cta.chars().take(150).collect(),
            Err(_) => FALLBACK_CTA.to_string(),
        }
    }
}

/// Canned lyrics used whenever the LLM is unavailable or unusable.
/// Deterministic for a given (message, genre); this path never fails.
pub fn fallback_lyrics(commit_message: &str, genre: Genre) -> Lyrics {
    let snippet: String = commit_message.chars().take(40).collect();

    Lyrics {
        genre,
        title: format!("Commit {}: caos in produzione", genre.label()),
        text: [
            format!("Ho pushato: {snippet}"),
            "La CI urla, il linter piange".to_string(),
            "il deploy balla sul precipizio".to_string(),
            "i bug ritornano come per magia".to_string(),
            "ma noi cantiamo, ship it via!".to_string(),
            "Produzione esplode, che allegria".to_string(),
        ]
        .join("\n"),
    }
}
