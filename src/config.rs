use std::path::PathBuf;

use clap::Parser;

use crate::chat::ChatSettings;
use crate::error::ConfigError;
use crate::models::{Exercise, Meal, Record};

/// Health Assistant: chat about your workouts and meals.
///
/// Every option can also come from the environment or a `.env` file.
#[derive(Debug, Parser)]
#[command(name = "health-assistant")]
#[command(version)]
pub struct Cli {
    /// Chat service endpoint, e.g. https://<resource>.openai.azure.com
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT", default_value = "")]
    pub endpoint: String,

    /// Chat service API key
    #[arg(long, env = "AZURE_OPENAI_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Model deployment name
    #[arg(long, env = "AZURE_DEPLOYMENT_NAME", default_value = "gpt-4")]
    pub deployment: String,

    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = "2024-02-01")]
    pub api_version: String,

    /// Meal collection file
    #[arg(long, env = "HEALTH_MEALS_FILE", default_value = Meal::DEFAULT_PATH)]
    pub meals_file: PathBuf,

    /// Exercise collection file
    #[arg(long, env = "HEALTH_EXERCISES_FILE", default_value = Exercise::DEFAULT_PATH)]
    pub exercises_file: PathBuf,

    #[arg(long, default_value_t = 0.3)]
    pub temperature: f32,

    #[arg(long, default_value_t = 200)]
    pub max_tokens: u32,
}

impl Cli {
    pub fn chat_settings(&self) -> Result<ChatSettings, ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("AZURE_OPENAI_ENDPOINT"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("AZURE_OPENAI_KEY"));
        }
        Ok(ChatSettings {
            endpoint: self.endpoint.trim().to_string(),
            api_key: self.api_key.trim().to_string(),
            deployment: self.deployment.clone(),
            api_version: self.api_version.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }
}
