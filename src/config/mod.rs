//! Configuration loading and management
//!
//! Validation handlers can be declared in YAML instead of code:
//!
//! ```yaml
//! handlers:
//!   get_pet:
//!     parameters:
//!       - name: petId
//!         in: path
//!         required: true
//!         schema: { type: integer }
//!   upload_avatar:
//!     body_required: true
//!     body:
//!       - contentType: multipart/form-data
//!     file_uploads:
//!       - name: avatar
//!         content_type: image/.*
//! ```

use crate::core::ConfigError;
use crate::server::{ValidationHandler, ValidationHandlerBuilder};
use crate::validation::{BodySpec, ParameterSpec};
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A multipart file that must be present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUploadRule {
    /// Name of the form field
    pub name: String,

    /// Regular expression the part content type must fully match
    pub content_type: String,
}

/// Declaration of one validation handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Parameters; each one must carry its location (`in`)
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,

    /// Accepted bodies, tried in order
    #[serde(default)]
    pub body: Vec<BodySpec>,

    #[serde(default)]
    pub body_required: bool,

    #[serde(default)]
    pub file_uploads: Vec<FileUploadRule>,

    /// Body buffering limit in bytes
    #[serde(default)]
    pub max_body_size: Option<usize>,
}

impl HandlerConfig {
    /// Compile into a handler using the bundled schema engine
    pub fn build(&self) -> Result<ValidationHandler, ConfigError> {
        Ok(ValidationHandlerBuilder::from_config(self)?.build())
    }
}

/// Complete configuration: named handlers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub handlers: IndexMap<String, HandlerConfig>,
}

impl ValidationConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn handler(&self, name: &str) -> Option<&HandlerConfig> {
        self.handlers.get(name)
    }

    /// Compile every declared handler, failing on the first invalid one
    pub fn build_handlers(&self) -> Result<IndexMap<String, ValidationHandler>> {
        self.handlers
            .iter()
            .map(|(name, config)| {
                let handler = config
                    .build()
                    .map_err(|e| anyhow::anyhow!("handler '{}': {}", name, e))?;
                Ok((name.clone(), handler))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParameterLocation;
    use crate::validation::Style;

    const YAML: &str = r#"
handlers:
  get_pet:
    parameters:
      - name: petId
        in: path
        required: true
        schema: { type: integer }
      - name: tags
        in: query
        style: exploded
        schema:
          type: array
          items: { type: string }
  create_pet:
    body_required: true
    max_body_size: 1024
    body:
      - contentType: application/json
        schema: { type: object, required: [name] }
"#;

    #[test]
    fn test_parse_handlers() {
        let config = ValidationConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.handlers.len(), 2);
        let names: Vec<&String> = config.handlers.keys().collect();
        assert_eq!(names, vec!["get_pet", "create_pet"]);

        let get_pet = config.handler("get_pet").unwrap();
        assert_eq!(get_pet.parameters[0].location, Some(ParameterLocation::Path));
        assert_eq!(get_pet.parameters[1].style, Style::Exploded);
        assert!(!get_pet.body_required);

        let create_pet = config.handler("create_pet").unwrap();
        assert!(create_pet.body_required);
        assert_eq!(create_pet.max_body_size, Some(1024));
        assert_eq!(create_pet.body[0].content_type, "application/json");
    }

    #[test]
    fn test_build_handlers() {
        let config = ValidationConfig::from_yaml_str(YAML).unwrap();
        let handlers = config.build_handlers().unwrap();
        let get_pet = &handlers["get_pet"];
        assert_eq!(get_pet.processors(ParameterLocation::Path).len(), 1);
        assert_eq!(get_pet.processors(ParameterLocation::Query).len(), 1);
        assert_eq!(handlers["create_pet"].max_body_size(), 1024);
    }

    #[test]
    fn test_parameter_without_location_is_rejected() {
        let config = ValidationConfig::from_yaml_str(
            "handlers:\n  h:\n    parameters:\n      - name: q\n",
        )
        .unwrap();
        let err = config.build_handlers().unwrap_err();
        assert!(err.to_string().contains("handler 'h'"));
    }

    #[test]
    fn test_unknown_content_type_is_rejected() {
        let config = ValidationConfig::from_yaml_str(
            "handlers:\n  h:\n    body:\n      - contentType: application/xml\n",
        )
        .unwrap();
        assert!(matches!(
            config.handler("h").unwrap().build(),
            Err(ConfigError::UnsupportedContentType { .. })
        ));
    }

    #[test]
    fn test_empty_config() {
        let config = ValidationConfig::from_yaml_str("{}").unwrap();
        assert!(config.handlers.is_empty());
        assert!(ValidationConfig::from_yaml_file("/nonexistent/validation.yaml").is_err());
    }
}
