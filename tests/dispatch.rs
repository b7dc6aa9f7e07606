#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing
)]
//! Integration tests for directive dispatch: routing, filtering, fail-fast
//! and external manifest plugins.

mod common;

use common::TestDotfiles;
use dotlink::dispatch::RunOptions;
use dotlink::logging::MemoryLog;

/// One `name: status (message)` line per recorded directive.
fn statuses(log: &MemoryLog) -> String {
    log.directives()
        .into_iter()
        .map(|d| match d.message {
            Some(msg) => format!("{}: {:?} ({msg})", d.name, d.status),
            None => format!("{}: {:?}", d.name, d.status),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const CONFIG: &str = "\
- defaults:
    shell:
      quiet: true
- create:
    - made
- brew:
    - git
- shell:
    - 'true'
";

#[test]
fn unhandled_directive_fails_run_but_others_still_run() {
    let t = TestDotfiles::new();
    let (ok, log) = t.run(CONFIG);
    assert!(!ok);
    assert!(t.base.join("made").is_dir());
    assert!(log.contains("Action brew not handled"));
    insta::assert_snapshot!(statuses(&log), @r"
    defaults: Ok
    create: Ok
    brew: Failed
    shell: Ok
    ");
}

#[test]
fn exit_on_failure_stops_at_first_failure() {
    let t = TestDotfiles::new();
    let (ok, log) = t.run_with(
        CONFIG,
        RunOptions {
            exit_on_failure: true,
            ..RunOptions::default()
        },
    );
    assert!(!ok);
    insta::assert_snapshot!(statuses(&log), @r"
    defaults: Ok
    create: Ok
    brew: Failed
    ");
}

#[test]
fn except_filters_directives() {
    let t = TestDotfiles::new();
    let (ok, log) = t.run_with(
        CONFIG,
        RunOptions {
            except: vec!["brew".into(), "create".into()],
            ..RunOptions::default()
        },
    );
    assert!(ok);
    assert!(!t.base.join("made").exists());
    insta::assert_snapshot!(statuses(&log), @r"
    defaults: Ok
    create: Skipped (filtered)
    brew: Skipped (filtered)
    shell: Ok
    ");
}

#[test]
fn dry_run_marks_directives() {
    let t = TestDotfiles::new();
    let (ok, log) = t.run_with(
        "- create: [made]\n",
        RunOptions {
            dry_run: true,
            ..RunOptions::default()
        },
    );
    assert!(ok);
    assert!(!t.base.join("made").exists());
    insta::assert_snapshot!(statuses(&log), @"create: DryRun");
}

#[test]
fn malformed_payload_fails_only_its_directive() {
    let t = TestDotfiles::new();
    let (ok, log) = t.run("- link: [not, a, mapping]\n- create: [made]\n");
    assert!(!ok);
    assert!(t.base.join("made").is_dir());
    assert!(log.contains("An error was encountered while executing action link"));
    assert!(log.contains("Invalid link payload"));
}

#[cfg(unix)]
mod external {
    use super::*;
    use std::fs;

    fn with_plugin(t: &TestDotfiles, manifest: &str) {
        t.file("plugins/brew.toml", manifest);
    }

    #[test]
    fn plugins_directive_registers_manifest_handlers() {
        let t = TestDotfiles::new();
        with_plugin(
            &t,
            "name = \"brew\"\ndirectives = [\"brew\"]\ncommand = \"cat > ../brew.json\"\n",
        );
        let (ok, log) = t.run("- plugins: [plugins]\n- brew: [git, ripgrep]\n");
        assert!(ok, "{:?}", log.messages());
        let sent: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(t.base.join("brew.json")).unwrap()).unwrap();
        assert_eq!(sent["directive"], "brew");
        assert_eq!(sent["data"], serde_json::json!(["git", "ripgrep"]));
        assert_eq!(sent["dry_run"], false);
        assert_eq!(
            sent["base_directory"],
            serde_json::json!(t.base.display().to_string())
        );
    }

    #[test]
    fn dry_run_unaware_plugin_is_skipped() {
        let t = TestDotfiles::new();
        with_plugin(
            &t,
            "name = \"brew\"\ndirectives = [\"brew\"]\ncommand = \"touch ../ran\"\n",
        );
        let (ok, log) = t.run_with(
            "- plugins: [plugins/brew.toml]\n- brew: [git]\n",
            RunOptions {
                dry_run: true,
                ..RunOptions::default()
            },
        );
        assert!(ok);
        assert!(!t.base.join("ran").exists());
        assert!(log.contains("Skipping dry-run-unaware plugin brew for action brew"));
    }

    #[test]
    fn missing_plugin_path_is_reported() {
        let t = TestDotfiles::new();
        let (ok, log) = t.run("- plugins: [nope.toml]\n");
        assert!(!ok);
        assert!(log.contains(&format!(
            "Failed to load plugin {}",
            t.base.join("nope.toml").display()
        )));
    }
}
