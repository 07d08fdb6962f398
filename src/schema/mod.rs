/*!
Schema derivation: CLI option metadata -> typed parameter schemas.

Key items:
  derive_command_schema(&CommandDefinition) -> DerivedCommandSchema
  ParameterSchema::to_json_schema   (tool registration)
  ParameterSchema::validate         (incoming argument objects)

Arity comes from the `long` string alone:
  --flag            boolean, optional
  --value [x]       string,  optional
  --value <x>       string,  required unless `required: false` and the
                    description lacks the "required with" marker

Options carrying `subOptions` become their own sub-command schema and never
show up in the main command schema.
*/

pub mod naming;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::catalog::{CommandDefinition, CommandOption};

/// Free-text marker that promotes an otherwise optional `<value>` option to required.
pub const REQUIRED_WITH_MARKER: &str = "required with";

/// Default and fallback names for a sub-command's own value.
const VALUE_FIELD: &str = "name";
const VALUE_FIELD_FALLBACK: &str = "value";

/* ---- Types ---- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Boolean,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub kind: ParameterKind,
    pub required: bool,
    /// `--flag [x]`: the flag may be passed without a value.
    pub optional_value: bool,
    pub description: String,
}

/// Ordered parameter name -> spec mapping. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    fields: IndexMap<String, ParameterSpec>,
}

/// Parameter group of an option with nested options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubCommandSchema {
    pub parameters: ParameterSchema,
    /// Field holding the parent option's own value (`name`, or `value` on collision).
    pub value_field: String,
    /// Raw description of the parent option.
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedCommandSchema {
    pub main_command: ParameterSchema,
    pub sub_commands: IndexMap<String, SubCommandSchema>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error(
        "command '{command}': option '{option}' already defines both 'name' and 'value'; cannot place its own value"
    )]
    Conflict { command: String, option: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required parameter: {0}")]
    Missing(String),
    #[error("parameter '{name}' expects a {expected} value, got {got}")]
    InvalidType {
        name: String,
        expected: &'static str,
        got: String,
    },
}

/* ---- ParameterSchema ---- */

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the name is taken. Returns whether the field was added.
    pub fn insert(&mut self, name: impl Into<String>, spec: ParameterSpec) -> bool {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return false;
        }
        self.fields.insert(name, spec);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ParameterSpec> {
        self.fields.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// JSON Schema object for MCP tool registration.
    pub fn to_json_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.fields {
            properties.insert(
                name.clone(),
                serde_json::json!({
                    "type": spec.kind.as_str(),
                    "description": spec.description,
                }),
            );
            if spec.required {
                required.push(Value::String(name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        schema
    }

    /// Check an argument object against the schema.
    ///
    /// Keeps the caller's key order, drops keys the schema does not know and
    /// leniently coerces primitive values (see [`coerce_value`]). `null`
    /// counts as absent.
    pub fn validate(&self, args: Option<&Map<String, Value>>) -> Result<Map<String, Value>, ValidationError> {
        let mut out = Map::new();
        if let Some(args) = args {
            for (key, value) in args {
                let Some(spec) = self.fields.get(key) else {
                    tracing::debug!(parameter = %key, "dropping unknown parameter");
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                out.insert(key.clone(), coerce_value(key, value, spec)?);
            }
        }

        for (name, spec) in &self.fields {
            if spec.required && !out.contains_key(name) {
                return Err(ValidationError::Missing(name.clone()));
            }
        }
        Ok(out)
    }
}

/// Coerce one argument value to the declared kind.
///
/// Boolean fields accept `true/false`, the strings `true|1|yes|y` /
/// `false|0|no|n` and the numbers 1 / 0. String fields accept strings and
/// stringify numbers; a boolean is passed through untouched only where the
/// value itself is optional (`--job-queue` without a value).
pub fn coerce_value(name: &str, value: &Value, spec: &ParameterSpec) -> Result<Value, ValidationError> {
    let invalid = || ValidationError::InvalidType {
        name: name.to_string(),
        expected: spec.kind.as_str(),
        got: value.to_string(),
    };
    match spec.kind {
        ParameterKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "n" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            Value::Number(n) => match n.as_i64() {
                Some(1) => Ok(Value::Bool(true)),
                Some(0) => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        },
        ParameterKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(_) if spec.optional_value => Ok(value.clone()),
            _ => Err(invalid()),
        },
    }
}

/* ---- Derivation ---- */

/// Type and requiredness of a single option, from its `long` string.
pub fn infer_parameter(option: &CommandOption) -> ParameterSpec {
    let long = option.long.as_str();
    let (kind, required, optional_value) = if long.contains('[') {
        (ParameterKind::String, false, true)
    } else if long.contains('<') {
        // TODO: replace the description sniffing once catalogs carry an explicit "required with" relation.
        let forced = option.description.contains(REQUIRED_WITH_MARKER);
        (ParameterKind::String, option.required != Some(false) || forced, false)
    } else {
        (ParameterKind::Boolean, false, false)
    };
    ParameterSpec {
        kind,
        required,
        optional_value,
        description: option.description.clone(),
    }
}

/// Derive the main-command schema and one sub-command schema per option
/// carrying `subOptions`.
pub fn derive_command_schema(command: &CommandDefinition) -> Result<DerivedCommandSchema, SchemaError> {
    let mut derived = DerivedCommandSchema::default();

    for option in &command.options {
        let name = naming::to_canonical(&option.long);
        match option.sub_options() {
            Some(subs) => {
                if derived.sub_commands.contains_key(&name) {
                    tracing::debug!(command = %command.name, option = %name, "duplicate sub-command skipped");
                    continue;
                }
                let sub = derive_sub_command(command, option, subs)?;
                derived.sub_commands.insert(name, sub);
            }
            None => {
                if !derived.main_command.insert(name.clone(), infer_parameter(option)) {
                    tracing::debug!(command = %command.name, option = %name, "duplicate option skipped");
                }
            }
        }
    }

    Ok(derived)
}

fn derive_sub_command(
    command: &CommandDefinition,
    option: &CommandOption,
    subs: &[CommandOption],
) -> Result<SubCommandSchema, SchemaError> {
    let mut parameters = ParameterSchema::new();
    flatten_options(subs, &mut parameters);

    let value_field = [VALUE_FIELD, VALUE_FIELD_FALLBACK]
        .into_iter()
        .find(|candidate| !parameters.contains(candidate))
        .ok_or_else(|| SchemaError::Conflict {
            command: command.name.clone(),
            option: option.long.clone(),
        })?;

    let own_name = naming::to_canonical(&option.long);
    let mut own = infer_parameter(option);
    own.description = format!("The name of the {} to create/use", naming::humanize(&own_name));
    parameters.insert(value_field, own);

    Ok(SubCommandSchema {
        parameters,
        value_field: value_field.to_string(),
        description: option.description.clone(),
    })
}

fn flatten_options(options: &[CommandOption], into: &mut ParameterSchema) {
    for option in options {
        let name = naming::to_canonical(&option.long);
        into.insert(name, infer_parameter(option));
        if let Some(nested) = option.sub_options() {
            flatten_options(nested, into);
        }
    }
}

/* ---- Tests ---- */
