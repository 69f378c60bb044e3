use crate::cli::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_API_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "deepseek-chat";

pub struct Config {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
    pub stream_timeout: u64,
    pub verbose: bool,
    pub suggestions_enabled: bool,
    pub recipes_path: Option<PathBuf>,
    pub custom_recipes_path: Option<PathBuf>,
    pub amap_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiFileConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub stream_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelFileConfig {
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecipesFileConfig {
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub custom: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AmapFileConfig {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionFileConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub suggestions: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiFileConfig,
    #[serde(default)]
    pub model: ModelFileConfig,
    #[serde(default)]
    pub recipes: RecipesFileConfig,
    #[serde(default)]
    pub amap: AmapFileConfig,
    #[serde(default)]
    pub session: SessionFileConfig,
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> Result<Self, String> {
        let file_config = FileConfig::load().unwrap_or_default();

        // API key stays env-only
        let api_key = env::var("DEEPSEEK_API_KEY")
            .map_err(|_| "DEEPSEEK_API_KEY environment variable not set")?;

        // Endpoint: CLI args > env var > config file > default
        let api_endpoint = args
            .api_endpoint
            .clone()
            .or_else(|| env::var("CHEFCHAT_API_ENDPOINT").ok())
            .or(file_config.api.endpoint.clone())
            .map(|endpoint| {
                // Accept a base URL with or without /v1 and normalize it
                if endpoint.ends_with("/chat/completions") {
                    endpoint
                } else if endpoint.ends_with("/v1") {
                    format!("{}/chat/completions", endpoint)
                } else if endpoint.ends_with("/v1/") {
                    format!("{}chat/completions", endpoint)
                } else {
                    format!("{}/v1/chat/completions", endpoint.trim_end_matches('/'))
                }
            })
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        let model = args
            .model
            .clone()
            .or_else(|| env::var("CHEFCHAT_MODEL").ok())
            .or(file_config.model.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let stream_timeout = env::var("CHEFCHAT_STREAM_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .or(file_config.api.stream_timeout)
            .unwrap_or(30);

        let verbose = args.verbose
            || env::var("CHEFCHAT_VERBOSE")
                .ok()
                .map(|v| v == "true")
                .or(file_config.session.verbose)
                .unwrap_or(false);

        let suggestions_enabled =
            !args.no_suggestions && file_config.session.suggestions.unwrap_or(true);

        let recipes_path = args
            .recipes
            .clone()
            .or_else(|| env::var("CHEFCHAT_RECIPES").ok().map(PathBuf::from))
            .or(file_config.recipes.dataset.clone().map(PathBuf::from));

        let custom_recipes_path = file_config
            .recipes
            .custom
            .clone()
            .map(PathBuf::from)
            .or_else(|| {
                dirs::home_dir()
                    .map(|home| home.join(".config").join("chefchat").join("custom_recipes.json"))
            });

        let amap_key = env::var("AMAP_API_KEY")
            .ok()
            .or(file_config.amap.key.clone());

        Ok(Config {
            api_key,
            api_endpoint,
            model,
            stream_timeout,
            verbose,
            suggestions_enabled,
            recipes_path,
            custom_recipes_path,
            amap_key,
        })
    }
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        for path in Self::config_paths() {
            if path.exists() {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

                let is_yaml = matches!(
                    path.extension().and_then(|s| s.to_str()),
                    Some("yaml") | Some("yml")
                );
                let config: FileConfig = if is_yaml {
                    serde_yaml::from_str(&contents).with_context(|| {
                        format!("Failed to parse YAML config file: {}", path.display())
                    })?
                } else {
                    serde_json::from_str(&contents).with_context(|| {
                        format!("Failed to parse JSON config file: {}", path.display())
                    })?
                };

                return Ok(config);
            }
        }

        Ok(FileConfig::default())
    }

    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Local override first
        paths.push(PathBuf::from(".chefchat.yaml"));
        paths.push(PathBuf::from(".chefchat.yml"));
        paths.push(PathBuf::from(".chefchat.json"));

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("chefchat");
            paths.push(config_dir.join("chefchat.yaml"));
            paths.push(config_dir.join("chefchat.yml"));
            paths.push(config_dir.join("chefchat.json"));
        }

        paths
    }
}
