use serde::Deserialize;
use validator::Validate;

/// Main configuration for the reader client
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct Config {
    /// Document/RAG backend base URL
    #[validate(length(min = 1))]
    pub api_url: String,

    /// Bearer key for the RAG backend
    pub api_key: String,

    /// User agent sent with every RAG request
    pub user_agent: String,

    /// Header that tells the tunneling proxy to skip its browser interstitial
    pub tunnel_bypass_header: String,

    /// User id sent to the RAG backend when the caller has none
    pub user_id: String,

    /// OpenAI-compatible completion provider base URL
    pub completion_base_url: String,

    /// Completion provider key
    pub completion_api_key: String,

    /// Model used for summaries, quizzes and session titles
    pub completion_model: String,

    /// Public site URL, used for auth redirects and attribution
    pub site_url: Option<String>,

    /// Public site name, sent as completion attribution
    pub site_name: Option<String>,

    /// Supabase project URL
    pub supabase_url: String,

    /// Supabase anon key
    pub supabase_anon_key: String,

    /// PDF proxy port
    #[validate(range(min = 1024, max = 65535))]
    pub proxy_port: u16,

    /// Upper bound on simultaneous authenticated asset fetches
    #[validate(range(min = 1, max = 64))]
    pub max_concurrent_fetches: usize,

    /// Directory for downloaded PDFs
    pub cache_dir: String,

    /// Log level (e.g., info, debug, trace)
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let home = dirs::home_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".".to_string());

        let settings = config::Config::builder()
            // Core defaults
            .set_default("api_url", "http://localhost:9380")?
            .set_default("api_key", "")?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("tunnel_bypass_header", DEFAULT_TUNNEL_BYPASS_HEADER)?
            .set_default("user_id", "")?
            .set_default("completion_base_url", DEFAULT_COMPLETION_BASE_URL)?
            .set_default("completion_api_key", "")?
            .set_default("completion_model", DEFAULT_COMPLETION_MODEL)?
            .set_default("supabase_url", "http://localhost:54321")?
            .set_default("supabase_anon_key", "")?
            .set_default("proxy_port", 8081)?
            .set_default("max_concurrent_fetches", 4)?
            .set_default("cache_dir", format!("{}/.rag-reader/cache", home))?
            .set_default("log_level", "info")?
            // Load from ~/.rag-reader/config.toml (if present)
            .add_source(
                config::File::with_name(&format!("{}/.rag-reader/config", home)).required(false),
            )
            // Environment overrides: RAG_READER__API_URL, RAG_READER__API_KEY, etc.
            .add_source(config::Environment::with_prefix("RAG_READER").separator("__"))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Base URL with any trailing slash removed
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Where auth emails send the user back to.
    ///
    /// The site URL gets an `https://` scheme unless it already carries one and
    /// loses its trailing slash before `/auth/callback` is appended.
    pub fn auth_redirect_url(&self) -> String {
        let mut url = self
            .site_url
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "http://localhost:8081".to_string());
        if !url.starts_with("http") {
            url = format!("https://{}", url);
        }
        let url = url.trim_end_matches('/');
        format!("{}/auth/callback", url)
    }
}

pub const DEFAULT_USER_AGENT: &str = "ExpoApp/1.0";
pub const DEFAULT_TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_COMPLETION_MODEL: &str = "google/gemini-2.5-pro-preview";

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:9380".to_string(),
            api_key: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tunnel_bypass_header: DEFAULT_TUNNEL_BYPASS_HEADER.to_string(),
            user_id: String::new(),
            completion_base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
            completion_api_key: String::new(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            site_url: None,
            site_name: None,
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: String::new(),
            proxy_port: 8081,
            max_concurrent_fetches: 4,
            cache_dir: std::env::temp_dir()
                .join("rag-reader")
                .display()
                .to_string(),
            log_level: "info".to_string(),
        }
    }
}
