use crate::insight::{self, DisabledEngine, GeminiEngine, GeminiSettings, InsightEngine};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// Headroom over the request timeout before a flush stops waiting on a worker.
const FLUSH_MARGIN: Duration = Duration::from_secs(10);

/// School records sidecar: newline-delimited JSON requests on stdin,
/// one JSON response per line on stdout.
#[derive(Debug, Clone, Parser)]
#[command(name = "saathid", version)]
pub struct Config {
    /// Workspace directory to open (and seed) at start-up.
    #[arg(long, env = "SAATHI_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// API key for the hosted text collaborator. Without one every
    /// narrative falls back to its default text.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub ai_api_key: Option<String>,

    #[arg(long, env = "SAATHI_AI_BASE_URL", default_value = insight::DEFAULT_BASE_URL)]
    pub ai_base_url: String,

    #[arg(long, env = "SAATHI_AI_MODEL", default_value = insight::DEFAULT_MODEL)]
    pub ai_model: String,

    #[arg(long, default_value_t = 20)]
    pub ai_timeout_secs: u64,

    /// tracing filter directive, e.g. `info` or `saathid=debug`.
    #[arg(long = "log", env = "SAATHI_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Config {
    /// How long `feedback.flush` waits for background enhancements.
    pub fn enhancement_wait(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs).saturating_add(FLUSH_MARGIN)
    }

    pub fn insight_engine(&self) -> Arc<dyn InsightEngine> {
        let Some(key) = self.ai_api_key.as_ref().filter(|k| !k.trim().is_empty()) else {
            tracing::info!("no collaborator API key; narratives will use fallback text");
            return Arc::new(DisabledEngine);
        };
        let settings = GeminiSettings {
            api_key: key.trim().to_string(),
            base_url: self.ai_base_url.clone(),
            model: self.ai_model.clone(),
            timeout: Duration::from_secs(self.ai_timeout_secs),
        };
        match GeminiEngine::new(settings) {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                tracing::warn!(error = %e, "could not build collaborator client; narratives will use fallback text");
                Arc::new(DisabledEngine)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let cfg = Config::try_parse_from(["saathid"]).expect("parse");
        assert_eq!(cfg.ai_timeout_secs, 20);
        assert!(!cfg.ai_base_url.is_empty());
        assert_eq!(cfg.enhancement_wait(), Duration::from_secs(30));
    }

    #[test]
    fn enhancement_wait_follows_request_timeout() {
        let cfg = Config::try_parse_from(["saathid", "--ai-timeout-secs", "300"]).expect("parse");
        assert!(cfg.enhancement_wait() > Duration::from_secs(300));
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = Config::try_parse_from([
            "saathid",
            "--workspace",
            "/tmp/ws",
            "--ai-model",
            "m1",
            "--log",
            "debug",
        ])
        .expect("parse");
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(cfg.ai_model, "m1");
        assert_eq!(cfg.log_filter, "debug");
    }
}
