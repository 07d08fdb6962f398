/*!
Tool registry: every tool the server exposes, built once at startup.

  <prefix>_<command>                 main-command schema of each catalog entry
  <prefix>_<command>_<snake(sub)>    one per option carrying sub-options
  <prefix>_get_docs                  documentation (type: full | standard)
  <prefix>_analyse                   project analysis (task: ...)
  <prefix>_add_help                  usage guides for the add tools

Immutable after construction; shared through `Arc`.
*/

use std::sync::Arc;

use indexmap::IndexMap;
use rmcp::model::Tool;
use serde_json::{Map, Value, json};

use crate::analysis::AnalysisTask;
use crate::catalog::CommandCatalog;
use crate::descriptions::DescriptionEnhancer;
use crate::help;
use crate::schema::{ParameterSchema, SchemaError, derive_command_schema, naming};

/// What a tool call is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRoute {
    Command {
        command: String,
    },
    /// `option` is the parent option's canonical name; the value found under
    /// `value_field` is moved back to it before dispatch.
    SubCommand {
        command: String,
        option: String,
        value_field: String,
    },
    Docs,
    Analyse,
    Help,
}

#[derive(Debug, Clone)]
pub struct ToolEntry {
    pub tool: Tool,
    pub route: ToolRoute,
    /// Present for catalog-derived tools.
    pub schema: Option<ParameterSchema>,
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    entries: IndexMap<String, ToolEntry>,
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl ToolRegistry {
    pub fn build(
        catalog: &CommandCatalog,
        enhancer: &DescriptionEnhancer,
        prefix: &str,
    ) -> Result<Self, SchemaError> {
        let mut registry = Self::default();

        for command in catalog.commands() {
            let derived = derive_command_schema(command)?;

            let main = enhancer.enhance_schema(&command.name, &derived.main_command);
            registry.register(
                format!("{prefix}_{}", command.name),
                enhancer.command_description(command),
                ToolRoute::Command {
                    command: command.name.clone(),
                },
                Some(main),
            );

            for (option, sub) in &derived.sub_commands {
                let parameters = enhancer.enhance_sub_command(&command.name, sub);
                registry.register(
                    format!("{prefix}_{}_{}", command.name, naming::to_snake(option)),
                    enhancer.sub_command_description(&command.name, &sub.description),
                    ToolRoute::SubCommand {
                        command: command.name.clone(),
                        option: option.clone(),
                        value_field: sub.value_field.clone(),
                    },
                    Some(parameters),
                );
            }
        }

        registry.register_builtin(prefix);
        tracing::debug!(tools = registry.len(), "tool registry built");
        Ok(registry)
    }

    fn register_builtin(&mut self, prefix: &str) {
        let docs_schema = json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "enum": ["full", "standard"],
                    "description": "The type of documentation to retrieve."
                }
            },
            "required": ["type"]
        });
        self.register_raw(
            format!("{prefix}_get_docs"),
            "Retrieves Vendure documentation. Specify \"full\" for the complete version or \"standard\" for the overview.",
            ToolRoute::Docs,
            object(docs_schema),
        );

        let task_lines = AnalysisTask::ALL
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");
        let analyse_schema = json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "enum": AnalysisTask::ALL.iter().map(|t| t.name()).collect::<Vec<_>>(),
                    "description": format!("The analysis task to run:\n{task_lines}")
                }
            },
            "required": ["task"]
        });
        self.register_raw(
            format!("{prefix}_analyse"),
            "Run a project analysis task. Specify which analysis to run.",
            ToolRoute::Analyse,
            object(analyse_schema),
        );

        let help_schema = json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": help::operations(),
                    "description": "Specific operation to get help for, or \"all\" for the complete guide."
                }
            }
        });
        self.register_raw(
            format!("{prefix}_add_help"),
            "Get detailed guidance on using the add tools: required parameter combinations and examples.",
            ToolRoute::Help,
            object(help_schema),
        );
    }

    fn register(&mut self, name: String, description: String, route: ToolRoute, schema: Option<ParameterSchema>) {
        let input = schema.as_ref().map(ParameterSchema::to_json_schema).unwrap_or_default();
        self.insert(name, description, route, input, schema);
    }

    fn register_raw(&mut self, name: String, description: &str, route: ToolRoute, input: Map<String, Value>) {
        self.insert(name, description.to_string(), route, input, None);
    }

    fn insert(
        &mut self,
        name: String,
        description: String,
        route: ToolRoute,
        input: Map<String, Value>,
        schema: Option<ParameterSchema>,
    ) {
        if self.entries.contains_key(&name) {
            tracing::warn!(tool = %name, "duplicate tool name skipped");
            return;
        }
        let tool = Tool::new(name.clone(), description, Arc::new(input));
        self.entries.insert(name, ToolEntry { tool, route, schema });
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.get(name)
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.entries.values().map(|e| e.tool.clone()).collect()
    }

    #[cfg(test)]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CommandDefinition, CommandOption};

    fn builtin() -> ToolRegistry {
        ToolRegistry::build(
            &CommandCatalog::builtin().unwrap(),
            &DescriptionEnhancer::vendure(),
            "vendure",
        )
        .unwrap()
    }

    fn schema_json(registry: &ToolRegistry, name: &str) -> Value {
        serde_json::to_value(registry.get(name).unwrap().tool.input_schema.as_ref()).unwrap()
    }

    #[test]
    fn builtin_catalog_tool_names() {
        let registry = builtin();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            [
                "vendure_add",
                "vendure_add_entity",
                "vendure_add_service",
                "vendure_add_job_queue",
                "vendure_add_api_extension",
                "vendure_migrate",
                "vendure_get_docs",
                "vendure_analyse",
                "vendure_add_help",
            ]
        );
    }

    #[test]
    fn main_tool_excludes_sub_command_options() {
        let registry = builtin();
        let schema = schema_json(&registry, "vendure_add");
        let props = schema["properties"].as_object().unwrap();
        assert_eq!(
            props.keys().collect::<Vec<_>>(),
            ["plugin", "codegen", "uiExtensions", "config"]
        );
        assert!(schema.get("required").is_none());
        assert!(
            registry
                .get("vendure_add")
                .unwrap()
                .tool
                .description
                .as_deref()
                .unwrap()
                .starts_with("Add features")
        );
    }

    #[test]
    fn sub_command_tool_shape() {
        let registry = builtin();
        let entry = registry.get("vendure_add_job_queue").unwrap();
        assert_eq!(
            entry.route,
            ToolRoute::SubCommand {
                command: "add".into(),
                option: "jobQueue".into(),
                value_field: "value".into(),
            }
        );
        assert_eq!(
            entry.tool.description.as_deref(),
            Some("Add job-queue support to the specified plugin (used in \"vendure add\")")
        );
        let schema = schema_json(&registry, "vendure_add_job_queue");
        assert_eq!(schema["required"], json!(["name", "selectedService"]));
        assert_eq!(
            schema["properties"]["value"]["description"],
            json!("The name of the job queue to create/use")
        );
    }

    #[test]
    fn builtin_tools_carry_enums() {
        let registry = builtin();
        assert_eq!(
            schema_json(&registry, "vendure_get_docs")["properties"]["type"]["enum"],
            json!(["full", "standard"])
        );
        let analyse = schema_json(&registry, "vendure_analyse");
        assert_eq!(analyse["properties"]["task"]["enum"].as_array().unwrap().len(), 4);
        assert_eq!(analyse["required"], json!(["task"]));
    }

    #[test]
    fn custom_prefix_and_collisions() {
        let catalog = CommandCatalog::new(vec![CommandDefinition {
            name: "analyse".into(),
            description: "clashes with the analysis tool".into(),
            options: vec![CommandOption::new("--deep", "Deep scan")],
        }])
        .unwrap();
        let registry = ToolRegistry::build(&catalog, &DescriptionEnhancer::empty(), "shop").unwrap();
        let entry = registry.get("shop_analyse").unwrap();
        assert_eq!(entry.route, ToolRoute::Command { command: "analyse".into() });
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn conflicting_sub_options_fail_the_build() {
        let catalog = CommandCatalog::new(vec![CommandDefinition {
            name: "add".into(),
            description: "Add".into(),
            options: vec![CommandOption::new("--thing <x>", "Thing").with_sub_options(vec![
                CommandOption::new("--name <n>", "Name"),
                CommandOption::new("--value <v>", "Value"),
            ])],
        }])
        .unwrap();
        let err = ToolRegistry::build(&catalog, &DescriptionEnhancer::empty(), "vendure").unwrap_err();
        assert!(matches!(err, SchemaError::Conflict { .. }));
    }
}
