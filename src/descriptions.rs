//! Curated descriptions layered over the catalog's raw text.
//!
//! Catalog descriptions are written for humans at a terminal; agents need to
//! know which parameters go together. Where curated text exists it replaces
//! the raw description, otherwise the raw text passes through unchanged.

use std::collections::HashMap;

use crate::catalog::CommandDefinition;
use crate::schema::{ParameterSchema, SubCommandSchema};

const ADD_COMMAND: &str = "Add features to your Vendure project.

This tool creates plugins and wires codegen, Admin UI extensions or a custom config. Entities, services, job queues \
and API extensions have their own tools (`*_add_entity`, `*_add_service`, `*_add_job_queue`, `*_add_api_extension`).

IMPORTANT USAGE PATTERNS:
- For API Extension: plugin name as `name`, plus queryName OR mutationName, plus selectedService
- For Entity: entity class name as `name`, plus selectedPlugin=\"plugin-name\"
- For Service: service class name as `name`, plus selectedPlugin=\"plugin-name\"
- For Job Queue: plugin name as `value`, plus name=\"queue-name\" and selectedService=\"service-name\"

EXAMPLES:
- Create new plugin: {plugin: \"MyNewPlugin\"}
- Add codegen: {codegen: \"my-plugin\"}
- Add entity (*_add_entity): {name: \"CustomProduct\", selectedPlugin: \"my-plugin\"}
- Add API extension (*_add_api_extension): {name: \"my-plugin\", queryName: \"customProducts\", selectedService: \"ProductService\"}

Use the list_plugins analysis task first to see available plugin names.";

const ADD_PARAMETERS: &[(&str, &str)] = &[
    ("plugin", "Create a new plugin with the specified name. Example: \"MyNewPlugin\""),
    (
        "entity",
        "Add a new entity with the specified class name. Example: \"Product\" or \"Customer\". Requires selectedPlugin to be specified.",
    ),
    (
        "selectedPlugin",
        "Name of the plugin to add the entity/service/api-extension to. Must be an existing plugin name. Example: \"my-plugin\" or \"test-plugin\"",
    ),
    (
        "service",
        "Add a new service with the specified class name. Example: \"ProductService\" or \"OrderService\". Requires selectedPlugin to be specified.",
    ),
    (
        "type",
        "Type of service: \"basic\" or \"entity\" (default: basic). Use \"entity\" when working with database entities.",
    ),
    (
        "selectedEntity",
        "Name of the entity for entity service (automatically sets type to entity). Example: \"Product\"",
    ),
    (
        "jobQueue",
        "Add job-queue support to the specified plugin. Provide the plugin name. Example: \"my-plugin\"",
    ),
    (
        "name",
        "Name for the job queue (required with jobQueue). Example: \"email-queue\" or \"product-import-queue\"",
    ),
    (
        "selectedService",
        "Name of the service to add the job queue or API extension to. Must be an existing service. Example: \"ProductService\"",
    ),
    (
        "codegen",
        "Add GraphQL codegen configuration to the specified plugin. Provide the plugin name. Example: \"my-plugin\"",
    ),
    (
        "apiExtension",
        "Add an API extension scaffold to the specified plugin. Provide the plugin name. Example: \"my-plugin\". Requires queryName or mutationName and selectedService.",
    ),
    (
        "queryName",
        "Name for the GraphQL query (used with apiExtension). Example: \"customProducts\" or \"getSpecialOffers\"",
    ),
    (
        "mutationName",
        "Name for the GraphQL mutation (used with apiExtension). Example: \"createCustomOrder\" or \"updateSpecialPrice\"",
    ),
    (
        "uiExtensions",
        "Add Admin UI extensions setup to the specified plugin. Provide the plugin name. Example: \"my-plugin\"",
    ),
    ("customFields", "Add custom fields support to the entity (boolean flag)"),
    ("translatable", "Make the entity translatable (boolean flag)"),
    (
        "config",
        "Specify the path to a custom Vendure config file. Example: \"./custom-vendure-config.ts\"",
    ),
];

#[derive(Debug, Clone)]
pub struct DescriptionEnhancer {
    commands: HashMap<String, String>,
    parameters: HashMap<String, HashMap<String, String>>,
    /// CLI binary named in sub-command tool descriptions.
    cli_binary: String,
}

impl DescriptionEnhancer {
    /// Enhancer with no curated text; every description passes through.
    pub fn empty() -> Self {
        Self {
            commands: HashMap::new(),
            parameters: HashMap::new(),
            cli_binary: "vendure".into(),
        }
    }

    /// Curated text for the Vendure `add` command.
    pub fn vendure() -> Self {
        let mut enhancer = Self::empty();
        enhancer.commands.insert("add".into(), ADD_COMMAND.into());
        enhancer.parameters.insert(
            "add".into(),
            ADD_PARAMETERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        enhancer
    }

    pub fn with_cli_binary(mut self, name: impl Into<String>) -> Self {
        self.cli_binary = name.into();
        self
    }

    #[cfg(test)]
    pub fn with_parameter(
        mut self,
        command: impl Into<String>,
        parameter: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.parameters
            .entry(command.into())
            .or_default()
            .insert(parameter.into(), text.into());
        self
    }

    pub fn command_description(&self, command: &CommandDefinition) -> String {
        self.commands
            .get(&command.name)
            .cloned()
            .unwrap_or_else(|| command.description.clone())
    }

    pub fn parameter_description<'a>(&'a self, command: &str, parameter: &str, raw: &'a str) -> &'a str {
        self.parameters
            .get(command)
            .and_then(|p| p.get(parameter))
            .map(String::as_str)
            .unwrap_or(raw)
    }

    /// Copy of `schema` with curated parameter descriptions applied.
    pub fn enhance_schema(&self, command: &str, schema: &ParameterSchema) -> ParameterSchema {
        let mut out = schema.clone();
        for name in schema.names() {
            if let Some(spec) = out.get_mut(name) {
                spec.description = self
                    .parameter_description(command, name, &spec.description)
                    .to_string();
            }
        }
        out
    }

    /// Like [`enhance_schema`](Self::enhance_schema) but leaves the synthesized
    /// own-value field alone; its name may collide with a curated parameter.
    pub fn enhance_sub_command(&self, command: &str, sub: &SubCommandSchema) -> ParameterSchema {
        let mut out = self.enhance_schema(command, &sub.parameters);
        if let (Some(spec), Some(raw)) = (out.get_mut(&sub.value_field), sub.parameters.get(&sub.value_field)) {
            spec.description = raw.description.clone();
        }
        out
    }

    /// Sub-command tools keep the raw option text and point at their parent command.
    pub fn sub_command_description(&self, command: &str, option_description: &str) -> String {
        format!("{option_description} (used in \"{} {command}\")", self.cli_binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParameterKind, ParameterSpec};

    fn cmd(name: &str) -> CommandDefinition {
        CommandDefinition {
            name: name.into(),
            description: "raw".into(),
            options: vec![],
        }
    }

    #[test]
    fn curated_command_text_replaces_raw() {
        let enhancer = DescriptionEnhancer::vendure();
        assert!(enhancer.command_description(&cmd("add")).starts_with("Add features"));
        assert_eq!(enhancer.command_description(&cmd("migrate")), "raw");
    }

    #[test]
    fn parameter_descriptions_are_scoped_by_command() {
        let enhancer = DescriptionEnhancer::empty().with_parameter("add", "plugin", "curated");
        assert_eq!(enhancer.parameter_description("add", "plugin", "raw"), "curated");
        assert_eq!(enhancer.parameter_description("migrate", "plugin", "raw"), "raw");
        assert_eq!(enhancer.parameter_description("add", "other", "raw"), "raw");
    }

    #[test]
    fn enhance_schema_keeps_shape() {
        let mut schema = ParameterSchema::new();
        schema.insert(
            "translatable",
            ParameterSpec {
                kind: ParameterKind::Boolean,
                required: false,
                optional_value: false,
                description: "raw".into(),
            },
        );
        let enhanced = DescriptionEnhancer::vendure().enhance_schema("add", &schema);
        let spec = enhanced.get("translatable").unwrap();
        assert_eq!(spec.description, "Make the entity translatable (boolean flag)");
        assert_eq!(spec.kind, ParameterKind::Boolean);
        assert_eq!(schema.get("translatable").unwrap().description, "raw");
    }

    #[test]
    fn synthesized_value_field_keeps_its_own_text() {
        let mut parameters = ParameterSchema::new();
        for (name, desc) in [("name", "The name of the entity to create/use"), ("selectedPlugin", "raw")] {
            parameters.insert(
                name,
                ParameterSpec {
                    kind: ParameterKind::String,
                    required: true,
                    optional_value: false,
                    description: desc.into(),
                },
            );
        }
        let sub = SubCommandSchema {
            parameters,
            value_field: "name".into(),
            description: "Add entity".into(),
        };
        let enhanced = DescriptionEnhancer::vendure().enhance_sub_command("add", &sub);
        assert_eq!(enhanced.get("name").unwrap().description, "The name of the entity to create/use");
        assert!(enhanced.get("selectedPlugin").unwrap().description.starts_with("Name of the plugin"));
    }

    #[test]
    fn sub_command_text_mentions_parent() {
        let text = DescriptionEnhancer::empty().sub_command_description("add", "Add entity");
        assert_eq!(text, "Add entity (used in \"vendure add\")");

        let text = DescriptionEnhancer::vendure()
            .with_cli_binary("shop-cli")
            .sub_command_description("add", "Add entity");
        assert_eq!(text, "Add entity (used in \"shop-cli add\")");
    }
}
