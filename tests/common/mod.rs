// Shared helpers for integration tests.
//
// Provides a temporary dotfiles repository next to a temporary home
// directory, and a dispatcher wired to a recording log, so each integration
// test can run configs end to end without touching the real home.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dotlink::config::{self, Task};
use dotlink::dispatch::{Context, Dispatcher, RunOptions};
use dotlink::exec::SystemExecutor;
use dotlink::logging::{Log, MemoryLog};
use dotlink::plugins::{builtin_plugins, external::ManifestLoader};

/// A dotfiles repository and a home directory inside one
/// [`tempfile::TempDir`], deleted on drop.
pub struct TestDotfiles {
    /// Keeps the directory alive.
    pub root: tempfile::TempDir,
    /// The base directory (`<root>/dotfiles`).
    pub base: PathBuf,
    /// The home directory used for `~` expansion (`<root>/home`).
    pub home: PathBuf,
}

impl TestDotfiles {
    /// Create empty `dotfiles/` and `home/` directories.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        // Canonical so recorded link targets compare equal on macOS /var.
        let real = fs::canonicalize(root.path()).expect("canonicalize temp dir");
        let base = real.join("dotfiles");
        let home = real.join("home");
        fs::create_dir_all(&base).expect("create base dir");
        fs::create_dir_all(&home).expect("create home dir");
        Self { root, base, home }
    }

    /// Write `content` to `rel` under the base directory.
    pub fn file(&self, rel: &str, content: &str) -> &Self {
        let path = self.base.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, content).expect("write file");
        self
    }

    /// Parse a YAML config.
    pub fn tasks(&self, yaml: &str) -> Vec<Task> {
        config::parse_str(yaml, false, "install.conf.yaml").expect("parse config")
    }

    /// A dispatcher with the built-in handlers and a fresh recording log.
    pub fn dispatcher(&self, options: RunOptions) -> (Dispatcher, Arc<MemoryLog>) {
        let memory = Arc::new(MemoryLog::new());
        let log: Arc<dyn Log> = memory.clone();
        let ctx = Context::new(
            self.base.clone(),
            self.home.clone(),
            options,
            Arc::new(SystemExecutor),
        )
        .with_plugins(builtin_plugins(&log));
        let loader = ManifestLoader::new(Arc::clone(&log));
        (Dispatcher::new(ctx, Box::new(loader), log), memory)
    }

    /// Run `yaml` once with `options`.
    pub fn run_with(&self, yaml: &str, options: RunOptions) -> (bool, Arc<MemoryLog>) {
        let tasks = self.tasks(yaml);
        let (mut dispatcher, log) = self.dispatcher(options);
        (dispatcher.dispatch(&tasks), log)
    }

    /// Run `yaml` once with default options.
    pub fn run(&self, yaml: &str) -> (bool, Arc<MemoryLog>) {
        self.run_with(yaml, RunOptions::default())
    }

    /// Path below the home directory.
    pub fn home_path(&self, rel: &str) -> PathBuf {
        self.home.join(rel)
    }

    /// Describe every entry under the temp root: `link -> <target>`,
    /// `dir`, or `file <content>`.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let top = self.base.parent().expect("base has a parent").to_path_buf();
        walk(&top, &top, &mut out);
        out
    }
}

fn walk(top: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").path())
        .collect();
    entries.sort();
    for path in entries {
        let key = path
            .strip_prefix(top)
            .expect("below top")
            .display()
            .to_string();
        let meta = fs::symlink_metadata(&path).expect("metadata");
        if meta.file_type().is_symlink() {
            let target = fs::read_link(&path).expect("read link");
            out.insert(key, format!("link -> {}", target.display()));
        } else if meta.is_dir() {
            out.insert(key, "dir".to_string());
            walk(top, &path, out);
        } else {
            let content = fs::read_to_string(&path).unwrap_or_default();
            out.insert(key, format!("file {content}"));
        }
    }
}
