pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub upload_dir: PathBuf,
    /// Full generateContent endpoint URL, model included.
    pub api_url: String,
    /// Usually left out of the config file; `GOOGLE_API_KEY` overrides.
    pub api_key: Option<String>,
    pub api_timeout_ms: u64,
    pub extraction_timeout_ms: u64,
    pub max_history_length: usize,
    pub max_history_entry_length: usize,
    /// Prompt-truncation threshold for assembled context blobs, in bytes.
    pub max_content_length: usize,
    pub zip_max_size_mb: u64,
    pub max_files_in_folder: usize,
    pub max_file_size_mb: u64,
    pub allowed_extensions: Vec<String>,
    /// Transcript mirror database; `None` disables mirroring and keyword
    /// file search.
    pub transcript_db: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let allowed_extensions = [
            ".js", ".jsx", ".ts", ".tsx", ".html", ".htm", ".css", ".scss", ".sass", ".less",
            ".php", ".py", ".java", ".cs", ".go", ".rb", ".swift", ".kt", ".kts", ".c", ".cpp",
            ".h", ".hpp", ".md", ".txt", ".json", ".xml", ".yaml", ".yml", ".sql", ".env",
            ".config", ".ini", ".sh", ".bat", ".dockerfile", ".gitignore", ".mod", ".sum",
            ".gradle", ".properties", ".lock", ".toml", ".tf", ".tfvars", ".vue", ".svelte",
            ".pl", ".pm", ".lua", ".rs", ".dart",
        ]
        .iter()
        .map(|ext| ext.to_string())
        .collect();

        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            upload_dir: PathBuf::from("uploads"),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            api_timeout_ms: 180_000,
            extraction_timeout_ms: 100_000,
            max_history_length: 200,
            max_history_entry_length: 500,
            max_content_length: 100_000,
            zip_max_size_mb: 500,
            max_files_in_folder: 10_000,
            max_file_size_mb: 500,
            allowed_extensions,
            transcript_db: Some(PathBuf::from("transcripts.db")),
        }
    }
}
