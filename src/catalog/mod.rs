/*!
Command catalog: the CLI's self-described command metadata.

The catalog is data, never code. It is either the compiled-in declaration
list (`vendure.json`, mirroring the Vendure CLI's `add` / `migrate` commands)
or a user supplied JSON / YAML file with the same shape:

  [
    {
      "name": "add",
      "description": "...",
      "options": [
        { "long": "--entity <name>", "description": "...", "required": false,
          "subOptions": [ { "long": "--translatable", "description": "..." } ] }
      ]
    }
  ]

Loaded once at startup and shared read-only afterwards.
*/

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("vendure.json");

/// One flag of a command, possibly carrying its own nested options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    pub long: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_options: Option<Vec<CommandOption>>,
}

impl CommandOption {
    #[cfg(test)]
    pub fn new(long: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            short: None,
            long: long.into(),
            description: description.into(),
            required: None,
            sub_options: None,
        }
    }

    #[cfg(test)]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    #[cfg(test)]
    pub fn with_sub_options(mut self, sub_options: Vec<CommandOption>) -> Self {
        self.sub_options = Some(sub_options);
        self
    }

    /// Nested options, if any. An empty list counts as "no sub-options".
    pub fn sub_options(&self) -> Option<&[CommandOption]> {
        self.sub_options.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse YAML catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("catalog declares command '{0}' more than once")]
    DuplicateCommand(String),
}

/// Immutable list of command descriptors.
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
    commands: Vec<CommandDefinition>,
}

impl CommandCatalog {
    pub fn new(commands: Vec<CommandDefinition>) -> Result<Self, CatalogError> {
        for (idx, cmd) in commands.iter().enumerate() {
            if commands[..idx].iter().any(|c| c.name == cmd.name) {
                return Err(CatalogError::DuplicateCommand(cmd.name.clone()));
            }
        }
        Ok(Self { commands })
    }

    /// The compiled-in Vendure CLI declarations.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(raw)?)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, CatalogError> {
        Self::new(serde_yaml::from_str(raw)?)
    }

    /// Load a catalog file; `.yaml` / `.yml` go through YAML, anything else is JSON.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let lower = path.to_string_lossy().to_ascii_lowercase();
        if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Self::from_yaml(&raw)
        } else {
            Self::from_json(&raw)
        }
    }

    pub fn commands(&self) -> &[CommandDefinition] {
        &self.commands
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = CommandCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), 2);
        let add = catalog.get("add").unwrap();
        let entity = add
            .options
            .iter()
            .find(|o| o.long.starts_with("--entity"))
            .unwrap();
        assert_eq!(entity.short.as_deref(), Some("-e"));
        assert_eq!(entity.sub_options().map(|s| s.len()), Some(3));
        assert!(catalog.get("migrate").is_some());
    }

    #[test]
    fn yaml_catalog_uses_camel_case_keys() {
        let raw = r#"
- name: deploy
  description: Deploy things
  options:
    - long: --target <env>
      description: Target environment
      subOptions:
        - long: --dry-run
          description: Only print
"#;
        let catalog = CommandCatalog::from_yaml(raw).unwrap();
        let deploy = catalog.get("deploy").unwrap();
        assert_eq!(deploy.options[0].required, None);
        assert_eq!(deploy.options[0].sub_options().unwrap()[0].long, "--dry-run");
    }

    #[test]
    fn empty_sub_option_list_is_treated_as_none() {
        let opt = CommandOption::new("--flag", "").with_sub_options(vec![]);
        assert!(opt.sub_options().is_none());
    }

    #[test]
    fn duplicate_commands_rejected() {
        let cmd = CommandDefinition {
            name: "add".into(),
            description: String::new(),
            options: vec![],
        };
        let err = CommandCatalog::new(vec![cmd.clone(), cmd]).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yml");
        std::fs::write(&path, "- name: build\n  description: Build\n").unwrap();
        let catalog = CommandCatalog::load(&path).unwrap();
        assert_eq!(catalog.get("build").unwrap().options.len(), 0);

        let missing = CommandCatalog::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, CatalogError::Read { .. }));
    }
}
