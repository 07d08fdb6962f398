//! The project the adapter operates on.
//!
//! Built once in `main` and handed to everything that needs the project
//! location; tests build their own.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Package whose presence marks a directory as a Vendure project.
const CORE_PACKAGE: &str = "@vendure/core";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    project_path: PathBuf,
}

impl ProjectContext {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
        }
    }

    /// Resolve `raw` against the current directory.
    pub fn resolve(raw: &Path) -> Result<Self> {
        let absolute = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            std::env::current_dir()
                .context("failed to read current directory")?
                .join(raw)
        };
        Ok(Self::new(absolute))
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Check that the directory holds a `package.json` depending on `@vendure/core`.
    pub fn validate(&self) -> Result<()> {
        let package_json = self.project_path.join("package.json");
        let check = || -> Result<()> {
            let raw = std::fs::read_to_string(&package_json)
                .with_context(|| format!("cannot read {}", package_json.display()))?;
            let manifest: serde_json::Value =
                serde_json::from_str(&raw).context("package.json is not valid JSON")?;
            let declared = ["dependencies", "devDependencies"].iter().any(|section| {
                manifest
                    .get(section)
                    .and_then(|deps| deps.get(CORE_PACKAGE))
                    .is_some()
            });
            if !declared {
                bail!("the directory does not appear to be a Vendure project");
            }
            Ok(())
        };
        check().with_context(|| {
            format!(
                "Invalid project path: {}. Ensure it is a valid Vendure project directory",
                self.project_path.display()
            )
        })
    }
}
