/// Remote service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub generation_url: String,
    pub background_removal_url: String,
    pub resize_url: String,
    /// Sent as `Authorization: Bearer` when set.
    pub api_key: Option<String>,
    /// Per-request timeout for every remote call.
    pub timeout_secs: u64,
    /// Model identifier passed to the generation service.
    pub generation_model: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                   |
    /// |---------------------------|---------------------------|
    /// | `GENERATION_SERVICE_URL`  | `http://localhost:8100`   |
    /// | `BACKGROUND_REMOVAL_URL`  | `http://localhost:8101`   |
    /// | `RESIZE_SERVICE_URL`      | `http://localhost:8102`   |
    /// | `REMOTE_API_KEY`          | unset                     |
    /// | `REMOTE_TIMEOUT_SECS`     | `120`                     |
    /// | `GENERATION_MODEL`        | `image-gen-default`       |
    pub fn from_env() -> Self {
        let timeout_secs: u64 = std::env::var("REMOTE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REMOTE_TIMEOUT_SECS must be a valid u64");

        Self {
            generation_url: std::env::var("GENERATION_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8100".into()),
            background_removal_url: std::env::var("BACKGROUND_REMOVAL_URL")
                .unwrap_or_else(|_| "http://localhost:8101".into()),
            resize_url: std::env::var("RESIZE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8102".into()),
            api_key: std::env::var("REMOTE_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_secs,
            generation_model: std::env::var("GENERATION_MODEL")
                .unwrap_or_else(|_| "image-gen-default".into()),
        }
    }
}
