use std::path::PathBuf;

use assetforge_core::prompt::{LibraryLoadError, PromptLibrary};

/// Pipeline and orchestrator settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// JSON prompt template library. `None` starts with an empty library.
    pub prompt_library_path: Option<PathBuf>,
    /// Bounded capacity of the pipeline task channel.
    pub queue_capacity: usize,
    /// Ask the background remover to crop transparent borders itself.
    pub delegate_trim: bool,
    /// Terrain key that is itself the opaque ground layer and skips
    /// background removal.
    pub ground_texture_key: String,
    /// How often the generation-queue drainer polls.
    pub worker_poll_interval_secs: u64,
    /// Cap on auxiliary context images per generation.
    pub max_context_references: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prompt_library_path: None,
            queue_capacity: 256,
            delegate_trim: false,
            ground_texture_key: "grass_base".into(),
            worker_poll_interval_secs: 5,
            max_context_references: 4,
        }
    }
}

impl PipelineConfig {
    /// Load from environment variables.
    ///
    /// | Env var                     | Default      |
    /// |-----------------------------|--------------|
    /// | `PROMPT_LIBRARY_PATH`       | unset        |
    /// | `PIPELINE_QUEUE_CAPACITY`   | `256`        |
    /// | `DELEGATE_TRIM`             | `false`      |
    /// | `GROUND_TEXTURE_KEY`        | `grass_base` |
    /// | `WORKER_POLL_INTERVAL_SECS` | `5`          |
    /// | `MAX_CONTEXT_REFERENCES`    | `4`          |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let queue_capacity: usize = std::env::var("PIPELINE_QUEUE_CAPACITY")
            .unwrap_or_else(|_| defaults.queue_capacity.to_string())
            .parse()
            .expect("PIPELINE_QUEUE_CAPACITY must be a valid usize");

        let worker_poll_interval_secs: u64 = std::env::var("WORKER_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| defaults.worker_poll_interval_secs.to_string())
            .parse()
            .expect("WORKER_POLL_INTERVAL_SECS must be a valid u64");

        let max_context_references: usize = std::env::var("MAX_CONTEXT_REFERENCES")
            .unwrap_or_else(|_| defaults.max_context_references.to_string())
            .parse()
            .expect("MAX_CONTEXT_REFERENCES must be a valid usize");

        Self {
            prompt_library_path: std::env::var("PROMPT_LIBRARY_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            queue_capacity: queue_capacity.max(1),
            delegate_trim: std::env::var("DELEGATE_TRIM")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.delegate_trim),
            ground_texture_key: std::env::var("GROUND_TEXTURE_KEY")
                .unwrap_or(defaults.ground_texture_key),
            worker_poll_interval_secs,
            max_context_references,
        }
    }

    /// Load the configured prompt library, or an empty one.
    pub fn load_prompt_library(&self) -> Result<PromptLibrary, LibraryLoadError> {
        match &self.prompt_library_path {
            Some(path) => PromptLibrary::load(path),
            None => Ok(PromptLibrary::new()),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn empty_library_without_path() {
        let config = PipelineConfig::default();
        assert!(config.load_prompt_library().unwrap().is_empty());
        assert_eq!(config.ground_texture_key, "grass_base");
    }
}
