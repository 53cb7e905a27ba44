//! Commit message drafting through a local Ollama server.
//!
//! Large diffs are summarised file by file (in parallel) before the final
//! request, so the prompt stays small enough for local models.

use crate::config::Config;
use crate::error::{Result, SnapError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;
use ureq::Agent;

/// Drafts a one-line commit message from a diff.
pub trait MessageGenerator: Send + Sync {
    /// Cheap reachability probe.
    fn is_available(&self) -> bool;

    /// A cleaned, single-line message. The same diff and seed should give
    /// the same message.
    fn generate(&self, diff: &str, seed: u64) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    seed: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct Ollama {
    agent: Agent,
    base_url: String,
    model: String,
    temperature: f64,
    chunk_threshold: usize,
}

impl Ollama {
    pub fn from_config(config: &Config) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.request_timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            chunk_threshold: config.chunk_threshold,
        }
    }

    fn complete(&self, prompt: String, seed: u64) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                seed,
            },
        };
        tracing::debug!(model = %self.model, seed, prompt_len = request.prompt.len(), "ollama generate");
        let url = format!("{}/api/generate", self.base_url);
        let mut response = self.agent.post(&url).send_json(&request)?;
        let body: GenerateResponse = response.body_mut().read_json()?;
        Ok(body.response)
    }

    fn summarize_chunk(&self, chunk: &str, seed: u64) -> Result<String> {
        let raw = self.complete(summary_prompt(chunk), seed)?;
        let line = raw.trim().lines().next().unwrap_or("");
        let summary = collapse_whitespace(line);
        if summary.is_empty() {
            return Err(SnapError::OllamaError("empty summary".to_string()));
        }
        Ok(summary)
    }
}

impl MessageGenerator for Ollama {
    fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.agent.get(&url).call() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "ollama not reachable");
                false
            }
        }
    }

    fn generate(&self, diff: &str, seed: u64) -> Result<String> {
        let input = if diff.len() <= self.chunk_threshold {
            diff.to_string()
        } else {
            let chunks = split_diff(diff);
            tracing::debug!(chunks = chunks.len(), "summarising large diff");
            let summaries: Vec<String> = thread::scope(|scope| {
                let handles: Vec<_> = chunks
                    .iter()
                    .map(|chunk| scope.spawn(move || self.summarize_chunk(chunk, seed)))
                    .collect();
                handles
                    .into_iter()
                    .filter_map(|handle| handle.join().ok().and_then(|r| r.ok()))
                    .collect()
            });
            if summaries.is_empty() {
                return Err(SnapError::OllamaError(
                    "failed to summarize any diff chunks".to_string(),
                ));
            }
            summaries.join("; ")
        };

        let raw = self.complete(commit_prompt(&input), seed)?;
        clean_commit_message(&raw)
    }
}

fn commit_prompt(changes: &str) -> String {
    format!(
        r#"You write git commit messages. Reply with ONE line in conventional commit form.

Rules:
- Format: <type>: <description>
- Types: feat, fix, docs, style, refactor, test, chore
- Keep the description under 72 characters
- No explanations, no markdown, no quotes, no second line

Good replies:
feat: add user authentication system
fix: resolve memory leak in cache
docs: update installation guide

Changes:
{changes}

Commit message:"#
    )
}

fn summary_prompt(chunk: &str) -> String {
    format!(
        "Summarize what this git diff chunk adds, changes or removes in a few words.\n\nDiff:\n{chunk}\n\nSummary:"
    )
}

/// Split a multi-file diff at each `diff --git` header.
pub fn split_diff(diff: &str) -> Vec<String> {
    let mut parts = diff.split("\ndiff --git ");
    let mut chunks = Vec::new();
    if let Some(first) = parts.next() {
        if !first.trim().is_empty() {
            chunks.push(first.to_string());
        }
    }
    chunks.extend(parts.map(|part| format!("diff --git {}", part)));
    chunks
}

/// Reduce a raw model reply to a single commit message line.
pub fn clean_commit_message(raw: &str) -> Result<String> {
    static PREFIX: OnceLock<Option<Regex>> = OnceLock::new();
    let prefix = PREFIX.get_or_init(|| Regex::new(r"(?i)^(commit message|message|output):").ok());

    let line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    let line = match prefix.as_ref().and_then(|re| re.find(line)) {
        Some(m) => line[m.end()..].trim(),
        None => line,
    };
    let line = line.trim_matches('`').trim();
    let line = strip_quotes(line);
    let message = collapse_whitespace(line);

    if message.is_empty() {
        return Err(SnapError::OllamaError(format!(
            "failed to extract commit message from reply: {:?}",
            raw
        )));
    }
    Ok(message)
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s[1..s.len() - 1].trim();
        }
    }
    s
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_commit_message() {
        let cases = [
            ("feat: add new feature", "feat: add new feature"),
            ("commit message: feat: add new feature", "feat: add new feature"),
            ("Commit message: feat: add new feature", "feat: add new feature"),
            ("OUTPUT: fix: typo", "fix: typo"),
            ("`feat: add new feature`", "feat: add new feature"),
            ("\"feat: add new feature\"", "feat: add new feature"),
            ("'fix: quoted'", "fix: quoted"),
            ("feat: add new feature\n\nThis is a description", "feat: add new feature"),
            ("\n\n  fix:   spaced    out  \n", "fix: spaced out"),
        ];
        for (input, expected) in cases {
            assert_eq!(clean_commit_message(input).unwrap(), expected, "{:?}", input);
        }
    }

    #[test]
    fn test_clean_commit_message_rejects_empty_results() {
        for input in ["", "commit message:", "   \n\n   ", "```", "\"\""] {
            assert!(clean_commit_message(input).is_err(), "{:?}", input);
        }
    }

    #[test]
    fn test_split_diff_by_file() {
        let diff = "diff --git a/x b/x\n+1\ndiff --git a/y b/y\n+2\ndiff --git a/z b/z\n+3";
        let chunks = split_diff(diff);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("diff --git a/x"));
        assert_eq!(chunks[1], "diff --git a/y b/y\n+2");
        assert_eq!(chunks[2], "diff --git a/z b/z\n+3");
    }

    #[test]
    fn test_split_diff_drops_blank_preamble() {
        let chunks = split_diff("\ndiff --git a/x b/x\n+1");
        assert_eq!(chunks, vec!["diff --git a/x b/x\n+1".to_string()]);
    }

    #[test]
    fn test_prompts_embed_input() {
        assert!(commit_prompt("a; b").contains("Changes:\na; b"));
        assert!(summary_prompt("+x").contains("+x"));
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            model: "phi4",
            prompt: "p".to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: 0.3,
                seed: 42,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "phi4");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["seed"], 42);
    }

    #[test]
    fn test_unreachable_server_is_unavailable() {
        let config = Config {
            ollama_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        };
        let ollama = Ollama::from_config(&config);
        assert!(!ollama.is_available());
    }
}
