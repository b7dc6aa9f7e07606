//! Filesystem decisions and mutations for a single link.
//!
//! [`Linker::apply`] walks the create-parent, delete and link steps for one
//! [`LinkOperation`]. In dry-run mode every mutation is replaced by a log
//! line while the decision path stays identical.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::config::link::LinkType;
use crate::logging::Log;
use crate::paths;

/// One concrete link to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOperation {
    /// Link path as shown in messages (e.g. `~/.vimrc`).
    pub link_name: String,
    /// Absolute link path.
    pub link_path: PathBuf,
    /// Target as shown in messages (e.g. `vimrc`).
    pub target_name: String,
    /// Absolute target path.
    pub target_path: PathBuf,
    /// Symbolic or hard link.
    pub link_type: LinkType,
    /// Record the target relative to the link's directory.
    pub relative: bool,
    /// Remove an existing non-link at the link path.
    pub force: bool,
    /// Replace a symlink pointing elsewhere.
    pub relink: bool,
    /// Create the link's parent directory.
    pub create: bool,
    /// Link even if the target is missing.
    pub ignore_missing: bool,
}

impl LinkOperation {
    /// The path the link should record: relative to the link's parent
    /// directory, or the absolute target.
    #[must_use]
    pub fn desired_target(&self) -> PathBuf {
        if self.relative {
            let parent = self.link_path.parent().unwrap_or_else(|| Path::new("/"));
            paths::relative_to(&self.target_path, &paths::normalize(parent))
        } else {
            self.target_path.clone()
        }
    }
}

/// `true` if something (possibly a dangling symlink) exists at `path`.
fn lexists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Whether `a` and `b` resolve to the same file.
fn same_real_path(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Whether `a` and `b` are hard links to the same inode.
#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt as _;
    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(x), Ok(y)) => x.dev() == y.dev() && x.ino() == y.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_inode(a: &Path, b: &Path) -> bool {
    same_real_path(a, b)
}

/// Remove whatever is at `path`; directories are removed recursively.
fn remove_path(path: &Path) -> Result<()> {
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("reading metadata: {}", path.display()))?;
    if meta.file_type().is_symlink() {
        #[cfg(windows)]
        if std::fs::metadata(path).is_ok_and(|m| m.is_dir()) {
            return std::fs::remove_dir(path)
                .with_context(|| format!("removing link: {}", path.display()));
        }
        std::fs::remove_file(path).with_context(|| format!("removing link: {}", path.display()))
    } else if meta.is_dir() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("removing directory: {}", path.display()))
    } else {
        std::fs::remove_file(path).with_context(|| format!("removing file: {}", path.display()))
    }
}

/// Create a symbolic link at `link` recording `recorded`.
///
/// `target` is the absolute target, used on Windows to pick a file or
/// directory link.
fn create_symlink(recorded: &Path, target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let _ = target;
        std::os::unix::fs::symlink(recorded, link).with_context(|| {
            format!(
                "creating symlink {} -> {}",
                link.display(),
                recorded.display()
            )
        })
    }

    #[cfg(windows)]
    {
        let result = if target.is_dir() {
            std::os::windows::fs::symlink_dir(recorded, link)
        } else {
            std::os::windows::fs::symlink_file(recorded, link)
        };
        result.with_context(|| {
            format!(
                "creating symlink {} -> {}",
                link.display(),
                recorded.display()
            )
        })
    }
}

/// Applies [`LinkOperation`]s, logging every decision.
#[derive(Debug)]
pub struct Linker<'a> {
    log: &'a dyn Log,
    dry_run: bool,
}

impl<'a> Linker<'a> {
    /// Create a linker that reports through `log`.
    #[must_use]
    pub const fn new(log: &'a dyn Log, dry_run: bool) -> Self {
        Self { log, dry_run }
    }

    /// Reconcile one link. Returns `false` if the link is not in the
    /// desired state afterwards (or, in dry-run, would not be).
    #[must_use]
    pub fn apply(&self, op: &LinkOperation) -> bool {
        if op.create && !self.create_parent(&op.link_path) {
            return false;
        }

        let mut removed = false;
        if op.force || op.relink {
            match self.delete(op) {
                Some(r) => removed = r,
                None => return false,
            }
        }
        self.link(op, removed)
    }

    /// Ensure the parent directory of `link_path` exists (or, in dry-run,
    /// report that it would be created).
    pub(crate) fn create_parent(&self, link_path: &Path) -> bool {
        let Some(parent) = link_path.parent() else {
            return true;
        };
        if parent.exists() {
            return true;
        }
        if self.dry_run {
            self.log
                .dry_run(&format!("Would create directory {}", parent.display()));
            return true;
        }
        self.log
            .lowinfo(&format!("Creating directory {}", parent.display()));
        match std::fs::create_dir_all(parent) {
            Ok(()) => true,
            Err(e) => {
                self.log.debug(&format!("{e}"));
                self.log
                    .warn(&format!("Failed to create directory {}", parent.display()));
                false
            }
        }
    }

    /// Delete step. `Some(removed)` on success, `None` on failure.
    fn delete(&self, op: &LinkOperation) -> Option<bool> {
        let path = &op.link_path;
        if !lexists(path) {
            return Some(false);
        }

        let warranted = if is_symlink(path) {
            std::fs::read_link(path).is_ok_and(|recorded| recorded != op.desired_target())
        } else {
            if same_real_path(path, &op.target_path) {
                self.log.warn(&format!(
                    "{} appears to be the same file as {}.",
                    op.link_name, op.target_name
                ));
                return None;
            }
            op.force
                && !(op.link_type == LinkType::Hardlink && same_inode(path, &op.target_path))
        };
        if !warranted {
            return Some(false);
        }

        if self.dry_run {
            self.log.dry_run(&format!("Would remove {}", op.link_name));
            return Some(true);
        }
        match remove_path(path) {
            Ok(()) => {
                self.log.lowinfo(&format!("Removing {}", op.link_name));
                Some(true)
            }
            Err(e) => {
                self.log.debug(&format!("{e:#}"));
                self.log.warn(&format!("Failed to remove {}", op.link_name));
                None
            }
        }
    }

    fn link(&self, op: &LinkOperation, removed: bool) -> bool {
        let path = &op.link_path;
        let present = lexists(path) && !removed;
        let target_exists = op.target_path.exists();
        let desired = op.desired_target();

        if !present && (target_exists || op.ignore_missing) {
            return self.create_link(op, &desired);
        }

        if !target_exists && !op.ignore_missing {
            if is_symlink(path) {
                self.log.warn(&format!(
                    "Nonexistent target {} -> {}",
                    op.link_name, op.target_name
                ));
            } else {
                self.log.warn(&format!(
                    "Nonexistent target for {} : {}",
                    op.link_name, op.target_name
                ));
            }
            return false;
        }

        if is_symlink(path) {
            if op.link_type == LinkType::Hardlink {
                self.log.warn(&format!(
                    "{} already exists but is a symbolic link, not a hard link",
                    op.link_name
                ));
                return false;
            }
            let recorded = match std::fs::read_link(path) {
                Ok(r) => r,
                Err(e) => {
                    self.log.warn(&format!("Failed to read link {}: {e}", op.link_name));
                    return false;
                }
            };
            if recorded == desired {
                self.log.lowinfo(&format!(
                    "Link exists {} -> {}",
                    op.link_name, op.target_name
                ));
                return true;
            }
            if path.exists() {
                self.log.warn(&format!(
                    "Incorrect link {} -> {}",
                    op.link_name,
                    recorded.display()
                ));
            } else {
                self.log.warn(&format!(
                    "Invalid link {} -> {}",
                    op.link_name,
                    recorded.display()
                ));
            }
            return false;
        }

        if op.link_type == LinkType::Hardlink {
            if same_inode(path, &op.target_path) {
                self.log.lowinfo(&format!(
                    "Link exists {} -> {}",
                    op.link_name, op.target_name
                ));
                return true;
            }
            self.log.warn(&format!(
                "Incorrect hard link {} -> {}",
                op.link_name, op.target_name
            ));
            return false;
        }

        self.log.warn(&format!(
            "{} already exists but is a regular file or directory",
            op.link_name
        ));
        false
    }

    fn create_link(&self, op: &LinkOperation, desired: &Path) -> bool {
        if self.dry_run {
            self.log.dry_run(&format!(
                "Would create {} {} -> {}",
                op.link_type, op.link_name, op.target_name
            ));
            return true;
        }
        let result = match op.link_type {
            LinkType::Symlink => create_symlink(desired, &op.target_path, &op.link_path),
            LinkType::Hardlink => std::fs::hard_link(&op.target_path, &op.link_path)
                .with_context(|| format!("creating hard link {}", op.link_path.display())),
        };
        match result {
            Ok(()) => {
                self.log.lowinfo(&format!(
                    "Creating {} {} -> {}",
                    op.link_type, op.link_name, op.target_name
                ));
                true
            }
            Err(e) => {
                self.log.debug(&format!("{e:#}"));
                self.log.warn(&format!(
                    "Linking failed {} -> {}",
                    op.link_name, op.target_name
                ));
                false
            }
        }
    }
}
