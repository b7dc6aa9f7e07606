//! Command-backed handlers declared by TOML manifests.
//!
//! A manifest looks like:
//!
//! ```toml
//! name = "brew"
//! directives = ["brew", "cask"]
//! command = "./brew.sh"
//! dry-run = true
//! ```
//!
//! The command runs through the shell in the manifest's directory and
//! receives `{"directive", "data", "dry_run", "base_directory"}` as JSON on
//! stdin. Exit status zero means success.
use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Plugin, PluginLoader};
use crate::config::Payload;
use crate::dispatch::Context;
use crate::error::PluginError;
use crate::exec::ShellIo;
use crate::logging::Log;

/// On-disk manifest format.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Manifest {
    name: String,
    directives: Vec<String>,
    command: String,
    #[serde(default)]
    dry_run: bool,
}

/// A handler that delegates to an external command.
#[derive(Debug)]
pub struct ExternalPlugin {
    manifest: Manifest,
    dir: PathBuf,
    log: Arc<dyn Log>,
}

impl Plugin for ExternalPlugin {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn can_handle(&self, directive: &str) -> bool {
        self.manifest.directives.iter().any(|d| d == directive)
    }

    fn supports_dry_run(&self) -> bool {
        self.manifest.dry_run
    }

    fn handle(&self, directive: &str, data: &Payload, ctx: &Context) -> Result<bool> {
        let input = serde_json::json!({
            "directive": directive,
            "data": data,
            "dry_run": ctx.dry_run(),
            "base_directory": ctx.base_directory(true),
        });
        let io = ShellIo {
            stdin: false,
            stdout: true,
            stderr: true,
            input: Some(input.to_string()),
        };
        self.log.debug(&format!(
            "Running plugin {} for action {directive}",
            self.manifest.name
        ));
        let result = ctx.executor().shell(&self.manifest.command, &self.dir, &io)?;
        if !result.success {
            let code = result
                .code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            self.log.warn(&format!(
                "Plugin {} failed for action {directive} (exit {code})",
                self.manifest.name
            ));
        }
        Ok(result.success)
    }
}

/// Production [`PluginLoader`]: reads `*.toml` manifests.
#[derive(Debug)]
pub struct ManifestLoader {
    log: Arc<dyn Log>,
}

impl ManifestLoader {
    /// Create a loader whose plugins log through `log`.
    #[must_use]
    pub const fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }

    fn load_manifest(&self, path: &Path) -> Result<ExternalPlugin, PluginError> {
        let content = std::fs::read_to_string(path).map_err(|source| PluginError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest = toml::from_str(&content).map_err(|e| PluginError::Manifest {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        if manifest.directives.is_empty() {
            return Err(PluginError::Manifest {
                path: path.to_path_buf(),
                message: "no directives declared".to_string(),
            });
        }
        let dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(ExternalPlugin {
            manifest,
            dir,
            log: Arc::clone(&self.log),
        })
    }

    /// Every `*.toml` file directly in `dir`, sorted by name.
    fn manifests_in(dir: &Path) -> Result<Vec<PathBuf>, PluginError> {
        let entries = std::fs::read_dir(dir).map_err(|source| PluginError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut found: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        found.sort();
        Ok(found)
    }
}

impl PluginLoader for ManifestLoader {
    fn load(&self, path: &Path) -> Result<Vec<Arc<dyn Plugin>>> {
        if !path.exists() {
            return Err(PluginError::NotFound(path.to_path_buf()).into());
        }
        let files = if path.is_dir() {
            Self::manifests_in(path)?
        } else {
            vec![path.to_path_buf()]
        };
        let mut plugins: Vec<Arc<dyn Plugin>> = Vec::with_capacity(files.len());
        for file in files {
            let plugin = self.load_manifest(&file)?;
            self.log.debug(&format!(
                "Registered plugin {} from {}",
                plugin.manifest.name,
                file.display()
            ));
            plugins.push(Arc::new(plugin));
        }
        Ok(plugins)
    }
}
