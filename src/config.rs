use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::sync::Arc;

pub const DEFAULT_API_VERSION: &str = "2025-03-01-preview";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

// Azure OpenAI settings. Endpoint and key may be absent; that is only
// detected when a sentiment request arrives.
#[derive(Clone, Debug, Default)]
pub struct AzureOpenAiConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: String,
    pub deployment: String,
}

pub type SharedAzureConfig = Arc<AzureOpenAiConfig>;

impl AzureOpenAiConfig {
    /// Both secrets, or `None` when either one is missing.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.endpoint.as_deref(), self.api_key.as_deref()) {
            (Some(endpoint), Some(key)) => Some((endpoint, key)),
            _ => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfigYaml {
    pub node_name: Option<String>,
    pub environment: Option<String>,
    pub port: Option<u16>,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_key: Option<String>,
    pub azure_openai_api_version: Option<String>,
    pub azure_openai_deployment: Option<String>,
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub node_name: String,
    pub environment: String,
    pub port: u16,
    pub azure: SharedAzureConfig,
}

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Self::from_env()
        }
    }

    pub fn from_yaml(file_path: &str) -> Result<Self, ConfigError> {
        let yaml_content = fs::read_to_string(file_path).map_err(|source| ConfigError::Read {
            path: file_path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<Self, ConfigError> {
        let yaml_config: ConfigYaml = serde_yaml::from_str(yaml_content)?;

        let azure = AzureOpenAiConfig {
            endpoint: non_empty(yaml_config.azure_openai_endpoint),
            api_key: non_empty(yaml_config.azure_openai_key),
            api_version: yaml_config
                .azure_openai_api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            deployment: yaml_config
                .azure_openai_deployment
                .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
        };

        Ok(Self {
            node_name: yaml_config
                .node_name
                .unwrap_or_else(|| "sentiment-service".to_string()),
            environment: yaml_config
                .environment
                .unwrap_or_else(|| "development".to_string()),
            port: yaml_config.port.unwrap_or(DEFAULT_PORT),
            azure: Arc::new(azure),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    // Build the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let azure = AzureOpenAiConfig {
            endpoint: non_empty(lookup("AZURE_OPENAI_ENDPOINT")),
            api_key: non_empty(lookup("AZURE_OPENAI_KEY")),
            api_version: lookup("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            deployment: lookup("AZURE_OPENAI_DEPLOYMENT")
                .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
        };

        Ok(Self {
            node_name: lookup("NODE_NAME").unwrap_or_else(|| "sentiment-service".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            port,
            azure: Arc::new(azure),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_any_variables() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.environment, "development");
        assert_eq!(config.azure.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.azure.deployment, DEFAULT_DEPLOYMENT);
        assert!(!config.azure.is_configured());
    }

    #[test]
    fn test_azure_credentials_from_env() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
            ("AZURE_OPENAI_KEY", "secret"),
        ]))
        .unwrap();
        assert_eq!(
            config.azure.credentials(),
            Some(("https://example.openai.azure.com", "secret"))
        );
    }

    #[test]
    fn test_one_missing_secret_is_not_configured() {
        let config = AppConfig::from_lookup(lookup_from(&[(
            "AZURE_OPENAI_ENDPOINT",
            "https://example.openai.azure.com",
        )]))
        .unwrap();
        assert!(config.azure.credentials().is_none());

        let config = AppConfig::from_lookup(lookup_from(&[
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
            ("AZURE_OPENAI_KEY", ""),
        ]))
        .unwrap();
        assert!(!config.azure.is_configured());
    }

    #[test]
    fn test_whitespace_secret_counts_as_present() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
            ("AZURE_OPENAI_KEY", "  "),
        ]))
        .unwrap();
        assert_eq!(
            config.azure.credentials(),
            Some(("https://example.openai.azure.com", "  "))
        );

        let config = AppConfig::from_yaml_str("azure_openai_endpoint: \"\"\nazure_openai_key: secret\n").unwrap();
        assert!(config.azure.endpoint.is_none());
        assert!(!config.azure.is_configured());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("PORT", "eighty")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name: "PORT", .. })
        ));
    }

    #[test]
    fn test_yaml_config() {
        let yaml = r#"
node_name: sentiment-eu
environment: production
port: 9000
azure_openai_endpoint: https://example.openai.azure.com
azure_openai_key: secret
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.node_name, "sentiment-eu");
        assert_eq!(config.port, 9000);
        assert!(config.azure.is_configured());
        assert_eq!(config.azure.deployment, DEFAULT_DEPLOYMENT);
    }

    #[test]
    fn test_yaml_without_azure_section_still_loads() {
        let config = AppConfig::from_yaml_str("environment: staging\n").unwrap();
        assert_eq!(config.environment, "staging");
        assert!(!config.azure.is_configured());
    }
}
