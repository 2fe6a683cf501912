use crate::gemini::DEFAULT_GEMINI_MODEL;
use crate::prompt::{ProviderFormat, TranslationRequest};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub fn format(self) -> ProviderFormat {
        match self {
            ProviderKind::Gemini => ProviderFormat::StructuredJson,
            ProviderKind::OpenAi => ProviderFormat::PlainInstruction,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" | "chatgpt" => Ok(ProviderKind::OpenAi),
            other => Err(format!("Unknown AI service provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: ProviderKind,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub openai_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub source_language: String,
    pub target_languages: Vec<String>,
    pub tutor_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            openai_url: String::new(),
            openai_api_key: String::new(),
            openai_model: String::new(),
            source_language: "English".to_string(),
            target_languages: Vec::new(),
            tutor_mode: false,
        }
    }
}

impl Settings {
    pub fn provider_kind(&self) -> ProviderKind {
        self.provider
    }

    /// Stores the language and mode choices of the last request.
    pub fn remember_preferences(&mut self, request: &TranslationRequest) {
        self.source_language = request.source_language().to_string();
        self.target_languages = request.target_languages().to_vec();
        self.tutor_mode = request.tutor_mode();
    }

    /// True when both settings would build the same provider.
    pub fn same_connection(&self, other: &Settings) -> bool {
        self.provider == other.provider
            && self.gemini_api_key == other.gemini_api_key
            && self.gemini_model == other.gemini_model
            && self.openai_url == other.openai_url
            && self.openai_api_key == other.openai_api_key
            && self.openai_model == other.openai_model
    }

    /// Copy with API keys masked, for display.
    pub fn redacted(&self) -> Settings {
        let mut copy = self.clone();
        copy.gemini_api_key = mask(&copy.gemini_api_key);
        copy.openai_api_key = mask(&copy.openai_api_key);
        copy
    }
}

fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 8 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

pub fn app_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home_dir.join(".tutor-translate"))
}

pub fn logs_dir() -> Result<PathBuf> {
    Ok(app_dir()?.join("logs"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(app_dir()?.join("config.json"))
}

pub fn load() -> Result<Settings> {
    load_from(&config_path()?)
}

pub fn save(settings: &Settings) -> Result<()> {
    save_to(&config_path()?, settings)
}

pub fn load_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let data = fs::read_to_string(path).context("read config.json")?;
    let settings: Settings = serde_json::from_str(&data).context("parse config.json")?;
    Ok(settings)
}

pub fn save_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create config directory")?;
    }
    let data = serde_json::to_string_pretty(settings).context("serialize config")?;
    fs::write(path, data).context("write config.json")?;
    Ok(())
}
