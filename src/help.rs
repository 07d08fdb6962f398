//! Usage guides for the `add` tools, served by `<prefix>_add_help`.

/// Placeholder replaced by the configured tool prefix.
const PREFIX: &str = "{prefix}";

const GUIDES: &[(&str, &str)] = &[
    (
        "api-extension",
        r#"
API EXTENSION GUIDE ({prefix}_add_api_extension):

Required Parameters:
- name: "plugin-name" (must be existing plugin)
- selectedService: "ServiceName" (must be existing service in the plugin)
- queryName: "customQueryName" OR mutationName: "customMutationName" (at least one required)

Example:
{
  "name": "my-plugin",
  "queryName": "getCustomProducts",
  "selectedService": "ProductService"
}

TIP: Run {prefix}_analyse with task "list_plugins" first to see available plugins."#,
    ),
    (
        "entity",
        r#"
ENTITY GUIDE ({prefix}_add_entity):

Required Parameters:
- name: "EntityClassName" (PascalCase)
- selectedPlugin: "plugin-name" (must be existing plugin)

Optional Parameters:
- customFields: true (adds custom fields support)
- translatable: true (makes entity translatable)

Example:
{
  "name": "CustomProduct",
  "selectedPlugin": "my-plugin",
  "customFields": true
}"#,
    ),
    (
        "service",
        r#"
SERVICE GUIDE ({prefix}_add_service):

Required Parameters:
- name: "ServiceClassName" (PascalCase)
- selectedPlugin: "plugin-name" (must be existing plugin)

Optional Parameters:
- type: "basic" | "entity" (default: basic)
- selectedEntity: "EntityName" (auto-sets type to entity)

Example:
{
  "name": "CustomProductService",
  "selectedPlugin": "my-plugin",
  "type": "entity",
  "selectedEntity": "Product"
}"#,
    ),
    (
        "plugin",
        r#"
PLUGIN GUIDE ({prefix}_add):

Required Parameters:
- plugin: "PluginName" (PascalCase)

Example:
{
  "plugin": "MyAwesomePlugin"
}"#,
    ),
    (
        "job-queue",
        r#"
JOB QUEUE GUIDE ({prefix}_add_job_queue):

Required Parameters:
- value: "plugin-name" (must be existing plugin)
- name: "queue-name" (kebab-case recommended)
- selectedService: "ServiceName" (must be existing service)

Example:
{
  "value": "my-plugin",
  "name": "email-sending-queue",
  "selectedService": "EmailService"
}"#,
    ),
];

const COMMON_MISTAKES: &str = r#"
COMMON MISTAKES TO AVOID:
1. Using non-existent plugin names (run the list_plugins analysis first)
2. Missing required parameter combinations
3. Wrong casing (use PascalCase for class names, kebab-case for plugin names)
4. For API extensions: forgetting selectedService or query/mutation names

DISCOVERY TOOLS:
- {prefix}_analyse (task "list_plugins"): See all available plugins
- {prefix}_add_help: Get specific guidance for operations
"#;

/// Accepted values of the `operation` parameter.
pub fn operations() -> Vec<&'static str> {
    GUIDES.iter().map(|(op, _)| *op).chain(std::iter::once("all")).collect()
}

/// One guide, or every guide plus common mistakes for `None` / `"all"`.
pub fn help_content(operation: Option<&str>, prefix: &str) -> String {
    let text = match operation {
        Some(op) if op != "all" => match GUIDES.iter().find(|(name, _)| *name == op) {
            Some((_, guide)) => guide.to_string(),
            None => return format!("No guide available for operation: {op}"),
        },
        _ => {
            let guides = GUIDES.iter().map(|(_, g)| *g).collect::<Vec<_>>().join("\n\n");
            format!("\nVENDURE ADD TOOL COMPLETE GUIDE:\n{guides}\n{COMMON_MISTAKES}")
        }
    };
    text.replace(PREFIX, prefix)
}
