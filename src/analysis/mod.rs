//! Read-only project analysis behind the `<prefix>_analyse` tool.
//!
//! Every task produces a plain-text report. Failures are reported as text
//! too (`Failed to <task>: <reason>`); callers never see an error value.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use walkdir::WalkDir;

const PLUGIN_DIRS: [&str; 3] = ["src/plugins", "plugins", "src/custom-plugins"];
const PLUGIN_CONFIG_FILES: [&str; 3] = ["src/vendure-config.ts", "vendure-config.ts", "src/index.ts"];
const DB_CONFIG_FILES: [&str; 2] = ["src/vendure-config.ts", "vendure-config.ts"];
const MIGRATION_DIRS: [&str; 2] = ["migrations", "src/migrations"];
const KNOWN_CONFIG_FILES: [&str; 6] = [
    "vendure-config.ts",
    "vendure-config.js",
    "src/vendure-config.ts",
    "src/vendure-config.js",
    "package.json",
    "tsconfig.json",
];
const CORE_PACKAGES: [&str; 5] = [
    "@vendure/core",
    "@vendure/common",
    "@vendure/admin-ui-plugin",
    "@vendure/email-plugin",
    "@vendure/asset-server-plugin",
];
const SUPPORTED_DB_TYPES: [&str; 4] = ["mysql", "mariadb", "postgres", "sqlite"];
const MIGRATIONS_SHOWN: usize = 5;

static PLUGIN_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import.*Plugin.*from.*['"](.*)['"]"#).unwrap());

// `type: 'postgres'` or `type: process.env.DB_TYPE`
static DB_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"type:\s*(?:['"]([^'"]+)['"]|(?:process\.env\.([a-zA-Z0-9_]+)))"#).unwrap()
});

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Project directory does not exist: {}", .0.display())]
    MissingProject(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{}: {source}", .path.display())]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("{0}")]
    Walk(#[from] walkdir::Error),
    #[error("task panicked: {0}")]
    Join(String),
}

#[derive(Debug, Error)]
#[error("Analysis task \"{0}\" not found.")]
pub struct UnknownTask(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisTask {
    ListPlugins,
    AnalyzeProjectStructure,
    CheckVendureInstallation,
    GetDatabaseType,
}

impl AnalysisTask {
    pub const ALL: [AnalysisTask; 4] = [
        AnalysisTask::ListPlugins,
        AnalysisTask::AnalyzeProjectStructure,
        AnalysisTask::CheckVendureInstallation,
        AnalysisTask::GetDatabaseType,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisTask::ListPlugins => "list_plugins",
            AnalysisTask::AnalyzeProjectStructure => "analyze_project_structure",
            AnalysisTask::CheckVendureInstallation => "check_vendure_installation",
            AnalysisTask::GetDatabaseType => "get_database_type",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnalysisTask::ListPlugins => "Lists all discovered plugins in the project.",
            AnalysisTask::AnalyzeProjectStructure => "Scans and analyzes the project folder structure.",
            AnalysisTask::CheckVendureInstallation => {
                "Checks if a Vendure project is correctly installed in the current directory."
            }
            AnalysisTask::GetDatabaseType => "Checks what database the vendure project is using.",
        }
    }

    fn failure_label(&self) -> &'static str {
        match self {
            AnalysisTask::ListPlugins => "analyze project",
            AnalysisTask::AnalyzeProjectStructure => "analyze project structure",
            AnalysisTask::CheckVendureInstallation => "check Vendure installation",
            AnalysisTask::GetDatabaseType => "determine database type",
        }
    }
}

impl fmt::Display for AnalysisTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisTask {
    type Err = UnknownTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTask(s.to_string()))
    }
}

/// Runs `task` on the blocking pool and renders any failure as text.
pub async fn run_task(task: AnalysisTask, project: PathBuf, cli_binary: String) -> String {
    let joined = tokio::task::spawn_blocking(move || run(task, &project, &cli_binary)).await;
    let result = joined.unwrap_or_else(|e| Err(AnalysisError::Join(e.to_string())));
    match result {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(task = task.name(), error = %e, "analysis failed");
            format!("Failed to {}: {e}", task.failure_label())
        }
    }
}

pub fn run(task: AnalysisTask, project: &Path, cli_binary: &str) -> Result<String, AnalysisError> {
    tracing::debug!(task = task.name(), project = %project.display(), "running analysis");
    match task {
        AnalysisTask::ListPlugins => list_plugins(project),
        AnalysisTask::AnalyzeProjectStructure => analyze_project_structure(project),
        AnalysisTask::CheckVendureInstallation => check_vendure_installation(project, cli_binary),
        AnalysisTask::GetDatabaseType => get_database_type(project),
    }
}

fn ensure_project(project: &Path) -> Result<(), AnalysisError> {
    if project.is_dir() {
        Ok(())
    } else {
        Err(AnalysisError::MissingProject(project.to_path_buf()))
    }
}

fn read(path: &Path) -> Result<String, AnalysisError> {
    std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Sorted entries of `dir`, or an empty list when it is missing.
fn sorted_entries(dir: &Path) -> Result<Vec<std::fs::DirEntry>, AnalysisError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let io_err = |source| AnalysisError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

fn first_existing(project: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates.iter().map(|c| project.join(c)).find(|p| p.is_file())
}

fn bullet_list(out: &mut String, items: &[String]) {
    for item in items {
        out.push_str(&format!("  • {item}\n"));
    }
}

fn is_plugin_file(name: &str) -> bool {
    name.ends_with(".plugin.ts") || name.ends_with(".plugin.js")
}

pub fn list_plugins(project: &Path) -> Result<String, AnalysisError> {
    ensure_project(project)?;

    let mut plugins = Vec::new();
    for dir in PLUGIN_DIRS {
        for entry in sorted_entries(&project.join(dir))? {
            if !entry.path().is_dir() {
                continue;
            }
            let files: Vec<String> = sorted_entries(&entry.path())?
                .into_iter()
                .map(|f| f.file_name().to_string_lossy().into_owned())
                .filter(|name| is_plugin_file(name))
                .collect();
            if !files.is_empty() {
                plugins.push(format!(
                    "{} ({})",
                    entry.file_name().to_string_lossy(),
                    files.join(", ")
                ));
            }
        }
    }

    let mut imports = Vec::new();
    if let Some(config) = first_existing(project, &PLUGIN_CONFIG_FILES) {
        let content = read(&config)?;
        imports.extend(PLUGIN_IMPORT.find_iter(&content).map(|m| m.as_str().trim().to_string()));
    }

    let mut out = format!("Vendure Project: {}\n\n", project.display());
    if plugins.is_empty() {
        out.push_str("No custom plugins found in standard directories\n\n");
    } else {
        out.push_str(&format!("Custom Plugins Found ({}):\n", plugins.len()));
        bullet_list(&mut out, &plugins);
        out.push('\n');
    }
    if !imports.is_empty() {
        out.push_str(&format!("Plugin Imports in Config ({}):\n", imports.len()));
        bullet_list(&mut out, &imports);
        out.push('\n');
    }
    out.push_str("Tip: Use `vendure_add` with `plugin` parameter to create new plugins");
    Ok(out)
}

#[derive(Debug, Default)]
struct StructureReport {
    entities: Vec<String>,
    services: Vec<String>,
    plugins: Vec<String>,
    migrations: Vec<String>,
    config_files: Vec<String>,
}

pub fn analyze_project_structure(project: &Path) -> Result<String, AnalysisError> {
    ensure_project(project)?;
    let mut report = StructureReport::default();

    let src = project.join("src");
    if src.is_dir() {
        for entry in WalkDir::new(&src).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            let bucket = if name.ends_with(".entity.ts") || name.ends_with(".entity.js") {
                &mut report.entities
            } else if name.ends_with(".service.ts") || name.ends_with(".service.js") {
                &mut report.services
            } else if is_plugin_file(&name) {
                &mut report.plugins
            } else {
                continue;
            };
            let rel = entry.path().strip_prefix(&src).unwrap_or(entry.path());
            bucket.push(rel.to_string_lossy().into_owned());
        }
    }

    if let Some(dir) = MIGRATION_DIRS.iter().map(|d| project.join(d)).find(|d| d.is_dir()) {
        report.migrations = sorted_entries(&dir)?
            .into_iter()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".ts") || n.ends_with(".js"))
            .collect();
    }

    report.config_files = KNOWN_CONFIG_FILES
        .iter()
        .filter(|f| project.join(f).exists())
        .map(|f| f.to_string())
        .collect();

    let name = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut out = format!("Project Structure Analysis: {name}\nPath: {}\n\n", project.display());

    for (title, items, empty) in [
        ("Entities", &report.entities, "No custom entities found"),
        ("Services", &report.services, "No custom services found"),
        ("Plugins", &report.plugins, "No custom plugins found"),
    ] {
        out.push_str(&format!("{title} ({}):\n", items.len()));
        if items.is_empty() {
            out.push_str(&format!("  {empty}\n"));
        } else {
            bullet_list(&mut out, items);
        }
        out.push('\n');
    }

    out.push_str(&format!("Migrations ({}):\n", report.migrations.len()));
    if report.migrations.is_empty() {
        out.push_str("  No migrations found\n");
    } else {
        let shown = report.migrations.len().min(MIGRATIONS_SHOWN);
        bullet_list(&mut out, &report.migrations[..shown]);
        if report.migrations.len() > MIGRATIONS_SHOWN {
            out.push_str(&format!("  ... and {} more\n", report.migrations.len() - MIGRATIONS_SHOWN));
        }
    }
    out.push('\n');

    out.push_str(&format!("Config Files ({}):\n", report.config_files.len()));
    bullet_list(&mut out, &report.config_files);
    Ok(out)
}

/// dependencies + devDependencies of a package.json.
fn declared_packages(manifest: &Value) -> Map<String, Value> {
    let mut all = Map::new();
    for key in ["dependencies", "devDependencies"] {
        if let Some(deps) = manifest.get(key).and_then(Value::as_object) {
            all.extend(deps.clone());
        }
    }
    all
}

pub fn check_vendure_installation(project: &Path, cli_binary: &str) -> Result<String, AnalysisError> {
    ensure_project(project)?;

    let manifest_path = project.join("package.json");
    if !manifest_path.is_file() {
        return Ok("`package.json` not found. This does not seem to be a valid Node.js project.".into());
    }
    let manifest: Value = serde_json::from_str(&read(&manifest_path)?).map_err(|source| AnalysisError::Json {
        path: manifest_path.clone(),
        source,
    })?;
    let deps = declared_packages(&manifest);

    let missing: Vec<String> = CORE_PACKAGES
        .iter()
        .filter(|p| deps.get(**p).is_none_or(|v| v.is_null()))
        .map(|p| p.to_string())
        .collect();

    let mut out = format!("Vendure Installation Check in {}\n\n", project.display());
    if !missing.is_empty() {
        out.push_str("Status: ❌ Missing core Vendure packages:\n");
        bullet_list(&mut out, &missing);
        out.push_str("\nConsider running `npm install` or `yarn install`.\n");
        return Ok(out);
    }
    out.push_str("Status: ✅ All core Vendure packages seem to be installed.\n\n");

    if project.join("tsconfig.json").is_file() {
        out.push_str("TypeScript: `tsconfig.json` found.\n");
    } else {
        out.push_str("TypeScript: `tsconfig.json` not found. This might not be a TypeScript project.\n");
    }

    let cli = project.join("node_modules").join(".bin").join(cli_binary);
    if cli.exists() {
        out.push_str("Vendure CLI: Found and correctly located.\n");
    } else {
        out.push_str("Vendure CLI: Not found in `node_modules/.bin`. Is `@vendure/cli` installed?\n");
    }
    Ok(out)
}

pub fn get_database_type(project: &Path) -> Result<String, AnalysisError> {
    let Some(config) = first_existing(project, &DB_CONFIG_FILES) else {
        return Ok("Vendure config file not found.".into());
    };
    let content = read(&config)?;
    let Some(caps) = DB_TYPE.captures(&content) else {
        return Ok("Could not determine database type from config file.".into());
    };

    let (db_type, source) = if let Some(literal) = caps.get(1) {
        (literal.as_str().to_string(), "config file")
    } else if let Some(var) = caps.get(2) {
        let var = var.as_str();
        let env_path = project.join(".env");
        if !env_path.is_file() {
            return Ok(format!(
                "Database type is set by environment variable \"{var}\", but .env file was not found."
            ));
        }
        match lookup_env_file(&env_path, var) {
            Some(value) if !value.is_empty() => (value, ".env file"),
            _ => {
                return Ok(format!(
                    "Database type is set by environment variable \"{var}\", but it was not found in the .env file."
                ));
            }
        }
    } else {
        return Ok("Could not determine database type from config file.".into());
    };

    if SUPPORTED_DB_TYPES.contains(&db_type.as_str()) {
        Ok(format!("Database type: {db_type} (from {source})"))
    } else {
        Ok(format!("Unsupported or unknown database type \"{db_type}\" found."))
    }
}

/// Value of `key` in a dotenv file, without touching the process environment.
fn lookup_env_file(path: &Path, key: &str) -> Option<String> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "unreadable .env file");
            return None;
        }
    };
    iter.filter_map(Result::ok)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

/* ---- Tests ---- */
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn task_names_round_trip() {
        for task in AnalysisTask::ALL {
            assert_eq!(task.name().parse::<AnalysisTask>().unwrap(), task);
        }
        let err = "bogus".parse::<AnalysisTask>().unwrap_err();
        assert_eq!(err.to_string(), "Analysis task \"bogus\" not found.");
    }

    #[test]
    fn list_plugins_reports_directories_and_imports() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "src/plugins/reviews/reviews.plugin.ts", "");
        touch(root, "src/plugins/reviews/reviews.service.ts", "");
        touch(root, "src/plugins/empty/readme.md", "");
        touch(root, "plugins/legacy/legacy.plugin.js", "");
        touch(
            root,
            "src/vendure-config.ts",
            "import { DefaultJobQueuePlugin } from '@vendure/core';\nimport { ReviewsPlugin } from './plugins/reviews/reviews.plugin';\nimport path from 'path';\n",
        );

        let report = list_plugins(root).unwrap();
        assert!(report.contains("Custom Plugins Found (2):"));
        assert!(report.contains("  • reviews (reviews.plugin.ts)\n"));
        assert!(report.contains("  • legacy (legacy.plugin.js)\n"));
        assert!(!report.contains("empty"));
        assert!(report.contains("Plugin Imports in Config (2):"));
        assert!(!report.contains("import path"));
        assert!(report.ends_with("to create new plugins"));
    }

    #[test]
    fn list_plugins_on_bare_project() {
        let dir = tempfile::tempdir().unwrap();
        let report = list_plugins(dir.path()).unwrap();
        assert!(report.contains("No custom plugins found in standard directories"));
        assert!(!report.contains("Plugin Imports"));
    }

    #[test]
    fn structure_analysis_truncates_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "src/plugins/shop/entities/review.entity.ts", "");
        touch(root, "src/plugins/shop/shop.service.ts", "");
        touch(root, "src/plugins/shop/shop.plugin.ts", "");
        touch(root, "package.json", "{}");
        for i in 0..7 {
            touch(root, &format!("src/migrations/{i:03}-init.ts"), "");
        }
        touch(root, "src/migrations/notes.md", "");

        let report = analyze_project_structure(root).unwrap();
        let sep = std::path::MAIN_SEPARATOR;
        assert!(report.contains(&format!("  • plugins{sep}shop{sep}entities{sep}review.entity.ts")));
        assert!(report.contains("Services (1):"));
        assert!(report.contains("Plugins (1):"));
        assert!(report.contains("Migrations (7):"));
        assert!(report.contains("  • 004-init.ts\n"));
        assert!(!report.contains("005-init.ts"));
        assert!(report.contains("  ... and 2 more\n"));
        assert!(report.contains("Config Files (1):\n  • package.json\n"));
    }

    #[test]
    fn structure_analysis_of_missing_project_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyze_project_structure(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().starts_with("Project directory does not exist"));
    }

    #[test]
    fn installation_check_lists_missing_packages() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            dir.path(),
            "package.json",
            r#"{"dependencies":{"@vendure/core":"3.0.0","@vendure/common":"3.0.0"}}"#,
        );
        let report = check_vendure_installation(dir.path(), "vendure").unwrap();
        assert!(report.contains("Missing core Vendure packages"));
        assert!(report.contains("  • @vendure/email-plugin\n"));
        assert!(!report.contains("  • @vendure/core\n"));
    }

    #[test]
    fn installation_check_on_complete_project() {
        let dir = tempfile::tempdir().unwrap();
        let deps = CORE_PACKAGES
            .iter()
            .map(|p| format!("\"{p}\":\"3.0.0\""))
            .collect::<Vec<_>>()
            .join(",");
        touch(dir.path(), "package.json", &format!(r#"{{"devDependencies":{{{deps}}}}}"#));
        touch(dir.path(), "tsconfig.json", "{}");
        touch(dir.path(), "node_modules/.bin/vendure", "");

        let report = check_vendure_installation(dir.path(), "vendure").unwrap();
        assert!(report.contains("All core Vendure packages seem to be installed"));
        assert!(report.contains("`tsconfig.json` found."));
        assert!(report.contains("Vendure CLI: Found"));
    }

    #[test]
    fn installation_check_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let report = check_vendure_installation(dir.path(), "vendure").unwrap();
        assert!(report.starts_with("`package.json` not found."));
    }

    #[test]
    fn database_type_from_literal() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/vendure-config.ts", "dbConnectionOptions: {\n  type: 'postgres',\n}");
        assert_eq!(
            get_database_type(dir.path()).unwrap(),
            "Database type: postgres (from config file)"
        );
    }

    #[test]
    fn database_type_from_env_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "vendure-config.ts", "type: process.env.DB_TYPE as any,");
        assert!(get_database_type(dir.path()).unwrap().contains(".env file was not found"));

        touch(dir.path(), ".env", "OTHER=1\n");
        assert!(get_database_type(dir.path()).unwrap().contains("not found in the .env file"));

        touch(dir.path(), ".env", "DB_TYPE=mysql\n");
        assert_eq!(
            get_database_type(dir.path()).unwrap(),
            "Database type: mysql (from .env file)"
        );
    }

    #[test]
    fn database_type_unsupported_or_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(get_database_type(dir.path()).unwrap(), "Vendure config file not found.");

        touch(dir.path(), "vendure-config.ts", "type: \"oracle\"");
        assert_eq!(
            get_database_type(dir.path()).unwrap(),
            "Unsupported or unknown database type \"oracle\" found."
        );

        touch(dir.path(), "vendure-config.ts", "export const config = {};");
        assert_eq!(
            get_database_type(dir.path()).unwrap(),
            "Could not determine database type from config file."
        );
    }

    #[tokio::test]
    async fn run_task_renders_failures_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let text = run_task(AnalysisTask::ListPlugins, missing.clone(), "vendure".into()).await;
        assert_eq!(
            text,
            format!("Failed to analyze project: Project directory does not exist: {}", missing.display())
        );
    }
}
