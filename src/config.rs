// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the model server, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Preferred model; when unset the first installed model is used.
    pub default_model: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            default_model: std::env::var("OLLAMA_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty()),
        }
    }

    pub fn generate_endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

// ============================================================================
// Tests
// ============================================================================
