use std::fmt;

#[derive(Debug)]
pub enum ChefChatError {
    ApiError {
        status: u16,
        message: String,
    },
    ConfigError(String),
    ToolError(String),
    UnknownAgent(String),
    NetworkError(reqwest::Error),
    Timeout,
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
    Other(String),
}

impl fmt::Display for ChefChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChefChatError::ApiError { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            ChefChatError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ChefChatError::ToolError(msg) => write!(f, "Tool error: {}", msg),
            ChefChatError::UnknownAgent(name) => write!(f, "Unknown agent: {}", name),
            ChefChatError::NetworkError(e) => write!(f, "Network error: {}", e),
            ChefChatError::Timeout => write!(f, "Request timeout"),
            ChefChatError::IoError(e) => write!(f, "IO error: {}", e),
            ChefChatError::JsonError(e) => write!(f, "JSON error: {}", e),
            ChefChatError::YamlError(e) => write!(f, "YAML error: {}", e),
            ChefChatError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ChefChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChefChatError::NetworkError(e) => Some(e),
            ChefChatError::IoError(e) => Some(e),
            ChefChatError::JsonError(e) => Some(e),
            ChefChatError::YamlError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChefChatError {
    fn from(err: reqwest::Error) -> Self {
        ChefChatError::NetworkError(err)
    }
}

impl From<std::io::Error> for ChefChatError {
    fn from(err: std::io::Error) -> Self {
        ChefChatError::IoError(err)
    }
}

impl From<serde_json::Error> for ChefChatError {
    fn from(err: serde_json::Error) -> Self {
        ChefChatError::JsonError(err)
    }
}

impl From<serde_yaml::Error> for ChefChatError {
    fn from(err: serde_yaml::Error) -> Self {
        ChefChatError::YamlError(err)
    }
}

impl From<anyhow::Error> for ChefChatError {
    fn from(err: anyhow::Error) -> Self {
        ChefChatError::Other(err.to_string())
    }
}

impl From<String> for ChefChatError {
    fn from(msg: String) -> Self {
        ChefChatError::Other(msg)
    }
}

impl From<&str> for ChefChatError {
    fn from(msg: &str) -> Self {
        ChefChatError::Other(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChefChatError>;
