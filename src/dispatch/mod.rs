//! Directive dispatch: routes each directive of each task to every handler
//! that claims it.
pub mod context;

pub use context::{Context, DirectiveDefaults, RunOptions};

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Payload, Task, defaults};
use crate::logging::{DirectiveStatus, Log};
use crate::paths;
use crate::plugins::PluginLoader;

/// Meta-directive that replaces the directive defaults.
const DEFAULTS: &str = "defaults";
/// Meta-directive that loads external handlers.
const PLUGINS: &str = "plugins";

/// Result of processing one directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ok,
    Failed,
    /// A failure that must stop the run under `--exit-on-failure`
    /// before any further handler runs.
    Abort,
}

impl Outcome {
    const fn from_bool(ok: bool) -> Self {
        if ok { Self::Ok } else { Self::Failed }
    }
}

/// Runs an ordered task list against the handler registry.
#[derive(Debug)]
pub struct Dispatcher {
    context: Context,
    loader: Box<dyn PluginLoader>,
    log: Arc<dyn Log>,
}

impl Dispatcher {
    /// Create a dispatcher owning `context`.
    #[must_use]
    pub fn new(context: Context, loader: Box<dyn PluginLoader>, log: Arc<dyn Log>) -> Self {
        Self {
            context,
            loader,
            log,
        }
    }

    /// The run context, including the current defaults and registry.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Load handlers from `paths` (already absolute) into the registry.
    ///
    /// Returns `false` if any path failed to load. Under
    /// `--exit-on-failure` loading stops at the first failure.
    pub fn load_plugins(&mut self, paths: &[PathBuf]) -> bool {
        let mut success = true;
        for path in paths {
            match self.loader.load(path) {
                Ok(plugins) => {
                    self.log.debug(&format!(
                        "Loaded {} plugin(s) from {}",
                        plugins.len(),
                        path.display()
                    ));
                    self.context.register_plugins(plugins);
                }
                Err(e) => {
                    self.log
                        .error(&format!("Failed to load plugin {}: {e:#}", path.display()));
                    success = false;
                    if self.context.options().exit_on_failure {
                        return false;
                    }
                }
            }
        }
        success
    }

    /// Process every directive of every task, in order.
    ///
    /// Returns `true` iff no directive failed and none was left unhandled.
    pub fn dispatch(&mut self, tasks: &[Task]) -> bool {
        let exit_on_failure = self.context.options().exit_on_failure;
        let mut success = true;

        for task in tasks {
            for directive in &task.directives {
                let name = directive.name.as_str();
                if name != DEFAULTS && self.context.options().filters_out(name) {
                    self.log.debug(&format!("Skipping action {name}"));
                    self.log
                        .record_directive(name, DirectiveStatus::Skipped, Some("filtered"));
                    continue;
                }

                let outcome = match name {
                    DEFAULTS => self.apply_defaults(&directive.data),
                    PLUGINS => self.register_from_payload(&directive.data),
                    _ => self.route(name, &directive.data),
                };

                let status = match outcome {
                    Outcome::Ok if self.context.dry_run() => DirectiveStatus::DryRun,
                    Outcome::Ok => DirectiveStatus::Ok,
                    Outcome::Failed | Outcome::Abort => DirectiveStatus::Failed,
                };
                self.log.record_directive(name, status, None);

                match outcome {
                    Outcome::Ok => {}
                    Outcome::Abort => return false,
                    Outcome::Failed => {
                        success = false;
                        if exit_on_failure {
                            return false;
                        }
                    }
                }
            }
        }
        success
    }

    /// Log a handler error and its cause chain.
    fn report_error(&self, name: &str, err: &anyhow::Error) {
        self.log.error(&format!(
            "An error was encountered while executing action {name}"
        ));
        self.log.error(&format!("{err:#}"));
    }

    /// Replace the defaults, then let any handler that claims `defaults`
    /// see the payload too.
    fn apply_defaults(&mut self, data: &Payload) -> Outcome {
        match defaults::parse(data) {
            Ok(map) => self.context.set_defaults(map),
            Err(e) => {
                self.report_error(DEFAULTS, &anyhow::Error::new(e));
                return Outcome::Failed;
            }
        }
        let claimed = self
            .context
            .plugins()
            .iter()
            .any(|p| p.can_handle(DEFAULTS));
        if claimed {
            self.route(DEFAULTS, data)
        } else {
            Outcome::Ok
        }
    }

    /// Handle a `plugins` directive: a list of paths relative to the base
    /// directory.
    fn register_from_payload(&mut self, data: &Payload) -> Outcome {
        let Value::Array(items) = data else {
            self.report_error(
                PLUGINS,
                &anyhow::anyhow!("expected a list of plugin paths"),
            );
            return Outcome::Failed;
        };
        let base = self.context.base_directory(false);
        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            let Value::String(raw) = item else {
                self.report_error(PLUGINS, &anyhow::anyhow!("plugin paths must be strings"));
                return Outcome::Failed;
            };
            resolved.push(paths::absolutize(
                &paths::expand(raw, self.context.home()),
                &base,
            ));
        }
        let ok = self.load_plugins(&resolved);
        if !ok && self.context.options().exit_on_failure {
            Outcome::Abort
        } else {
            Outcome::from_bool(ok)
        }
    }

    /// Invoke every handler claiming `name` and AND their results.
    fn route(&self, name: &str, data: &Payload) -> Outcome {
        let dry_run = self.context.dry_run();
        let exit_on_failure = self.context.options().exit_on_failure;
        let mut handled = false;
        let mut success = true;

        for plugin in self.context.plugins() {
            if !plugin.can_handle(name) {
                continue;
            }
            handled = true;
            if dry_run && !plugin.supports_dry_run() {
                self.log.info(&format!(
                    "Skipping dry-run-unaware plugin {} for action {name}",
                    plugin.name()
                ));
                continue;
            }
            match plugin.handle(name, data, &self.context) {
                Ok(ok) => success &= ok,
                Err(e) => {
                    self.report_error(name, &e);
                    if exit_on_failure {
                        return Outcome::Abort;
                    }
                    success = false;
                }
            }
        }

        if !handled && name != DEFAULTS {
            self.log.error(&format!("Action {name} not handled"));
            return Outcome::Failed;
        }
        Outcome::from_bool(success)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{Directive, parse_str};
    use crate::exec::SystemExecutor;
    use crate::logging::{Level, MemoryLog};
    use crate::plugins::Plugin;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Mutex;

    mockall::mock! {
        #[derive(Debug)]
        Loader {}
        impl PluginLoader for Loader {
            fn load(&self, path: &Path) -> anyhow::Result<Vec<Arc<dyn Plugin>>>;
        }
    }

    /// Handler that records calls and returns a canned result.
    #[derive(Debug)]
    struct Recorder {
        name: &'static str,
        claims: &'static [&'static str],
        dry_run: bool,
        result: Result<bool, &'static str>,
        calls: Mutex<Vec<(String, Payload)>>,
        seen_defaults: Mutex<Vec<DirectiveDefaults>>,
    }

    impl Recorder {
        fn new(name: &'static str, claims: &'static [&'static str]) -> Arc<Self> {
            Self::with(name, claims, true, Ok(true))
        }

        fn with(
            name: &'static str,
            claims: &'static [&'static str],
            dry_run: bool,
            result: Result<bool, &'static str>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                claims,
                dry_run,
                result,
                calls: Mutex::new(Vec::new()),
                seen_defaults: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(n, _)| n.clone())
                .collect()
        }
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn can_handle(&self, directive: &str) -> bool {
            self.claims.contains(&directive)
        }

        fn supports_dry_run(&self) -> bool {
            self.dry_run
        }

        fn handle(&self, directive: &str, data: &Payload, ctx: &Context) -> anyhow::Result<bool> {
            self.calls
                .lock()
                .unwrap()
                .push((directive.to_string(), data.clone()));
            self.seen_defaults.lock().unwrap().push(ctx.defaults());
            self.result.map_err(|m| anyhow::anyhow!(m))
        }
    }

    fn dispatcher(
        options: RunOptions,
        plugins: Vec<Arc<dyn Plugin>>,
        loader: MockLoader,
    ) -> (Dispatcher, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::new());
        let ctx = Context::new(
            PathBuf::from("/dotfiles"),
            PathBuf::from("/home/user"),
            options,
            Arc::new(SystemExecutor),
        )
        .with_plugins(plugins);
        (Dispatcher::new(ctx, Box::new(loader), log.clone()), log)
    }

    fn tasks(yaml: &str) -> Vec<Task> {
        parse_str(yaml, false, "test.yaml").unwrap()
    }

    #[test]
    fn every_claiming_handler_runs_and_results_are_anded() {
        let a = Recorder::new("a", &["link"]);
        let b = Recorder::with("b", &["link"], true, Ok(false));
        let (mut d, log) = dispatcher(
            RunOptions::default(),
            vec![a.clone(), b.clone()],
            MockLoader::new(),
        );
        assert!(!d.dispatch(&tasks("- link: {}\n")));
        assert_eq!(a.calls(), vec!["link"]);
        assert_eq!(b.calls(), vec!["link"]);
        assert_eq!(log.directives()[0].status, DirectiveStatus::Failed);
    }

    #[test]
    fn directives_run_in_task_then_key_order() {
        let r = Recorder::new("r", &["shell", "link", "create"]);
        let (mut d, _log) = dispatcher(RunOptions::default(), vec![r.clone()], MockLoader::new());
        assert!(d.dispatch(&tasks("- shell: []\n  link: {}\n- create: []\n")));
        assert_eq!(r.calls(), vec!["shell", "link", "create"]);
    }

    #[test]
    fn unclaimed_directive_fails_but_continues() {
        let r = Recorder::new("r", &["link"]);
        let (mut d, log) = dispatcher(RunOptions::default(), vec![r.clone()], MockLoader::new());
        assert!(!d.dispatch(&tasks("- brew: [git]\n- link: {}\n")));
        assert_eq!(r.calls(), vec!["link"]);
        assert_eq!(log.at(Level::Error), vec!["Action brew not handled"]);
    }

    #[test]
    fn unclaimed_directive_aborts_under_exit_on_failure() {
        let r = Recorder::new("r", &["link"]);
        let options = RunOptions {
            exit_on_failure: true,
            ..RunOptions::default()
        };
        let (mut d, _log) = dispatcher(options, vec![r.clone()], MockLoader::new());
        assert!(!d.dispatch(&tasks("- brew: [git]\n- link: {}\n")));
        assert!(r.calls().is_empty());
    }

    #[test]
    fn handler_error_is_logged_with_cause() {
        let bad = Recorder::with("bad", &["link"], true, Err("disk on fire"));
        let (mut d, log) = dispatcher(RunOptions::default(), vec![bad], MockLoader::new());
        assert!(!d.dispatch(&tasks("- link: {}\n")));
        assert_eq!(
            log.at(Level::Error),
            vec![
                "An error was encountered while executing action link",
                "disk on fire"
            ]
        );
    }

    #[test]
    fn handler_error_aborts_remaining_handlers_under_exit_on_failure() {
        let bad = Recorder::with("bad", &["link"], true, Err("boom"));
        let after = Recorder::new("after", &["link", "shell"]);
        let options = RunOptions {
            exit_on_failure: true,
            ..RunOptions::default()
        };
        let (mut d, _log) = dispatcher(options, vec![bad, after.clone()], MockLoader::new());
        assert!(!d.dispatch(&tasks("- link: {}\n- shell: []\n")));
        assert!(after.calls().is_empty());
    }

    #[test]
    fn dry_run_skips_unaware_handlers() {
        let aware = Recorder::new("aware", &["link"]);
        let unaware = Recorder::with("unaware", &["link", "brew"], false, Ok(false));
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };
        let (mut d, log) = dispatcher(
            options,
            vec![aware.clone(), unaware.clone()],
            MockLoader::new(),
        );
        assert!(d.dispatch(&tasks("- link: {}\n- brew: []\n")));
        assert_eq!(aware.calls(), vec!["link"]);
        assert!(unaware.calls().is_empty());
        assert!(log.contains("Skipping dry-run-unaware plugin unaware for action brew"));
        assert_eq!(log.directives()[0].status, DirectiveStatus::DryRun);
    }

    #[test]
    fn only_and_except_filter_but_never_defaults() {
        let r = Recorder::new("r", &["link", "shell"]);
        let options = RunOptions {
            only: vec!["link".into()],
            ..RunOptions::default()
        };
        let (mut d, log) = dispatcher(options, vec![r.clone()], MockLoader::new());
        assert!(d.dispatch(&tasks(
            "- defaults:\n    link: {relink: true}\n- shell: [x]\n- link: {}\n"
        )));
        assert_eq!(r.calls(), vec!["link"]);
        assert!(d.context().defaults().get("link").is_some());
        assert!(log.contains("Skipping action shell"));
        let statuses: Vec<_> = log.directives().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                DirectiveStatus::Ok,
                DirectiveStatus::Skipped,
                DirectiveStatus::Ok
            ]
        );
    }

    #[test]
    fn defaults_are_replaced_between_directives() {
        let r = Recorder::new("r", &["link"]);
        let (mut d, _log) = dispatcher(RunOptions::default(), vec![r.clone()], MockLoader::new());
        assert!(d.dispatch(&tasks(
            "- defaults:\n    link: {force: true}\n- link: {}\n- defaults:\n    link: {relink: true}\n- link: {}\n"
        )));
        let seen = r.seen_defaults.lock().unwrap();
        assert_eq!(seen[0].get("link").unwrap(), &json!({"force": true}));
        assert_eq!(seen[1].get("link").unwrap(), &json!({"relink": true}));
    }

    #[test]
    fn malformed_defaults_fail_the_directive() {
        let (mut d, log) = dispatcher(RunOptions::default(), Vec::new(), MockLoader::new());
        assert!(!d.dispatch(&tasks("- defaults: [link]\n")));
        assert!(log.contains("An error was encountered while executing action defaults"));
    }

    #[test]
    fn defaults_may_also_be_claimed() {
        let r = Recorder::new("r", &["defaults"]);
        let (mut d, _log) = dispatcher(RunOptions::default(), vec![r.clone()], MockLoader::new());
        assert!(d.dispatch(&tasks("- defaults: {}\n")));
        assert_eq!(r.calls(), vec!["defaults"]);
    }

    #[test]
    fn plugins_directive_registers_from_base_directory() {
        let brew = Recorder::new("brew", &["brew"]);
        let registered: Arc<dyn Plugin> = brew.clone();
        let mut loader = MockLoader::new();
        loader
            .expect_load()
            .withf(|p| p.to_path_buf() == PathBuf::from("/dotfiles/plugins/brew.toml"))
            .times(1)
            .returning(move |_| Ok(vec![Arc::clone(&registered)]));

        let (mut d, _log) = dispatcher(RunOptions::default(), Vec::new(), loader);
        assert!(d.dispatch(&tasks("- plugins: [plugins/brew.toml]\n- brew: [git]\n")));
        assert_eq!(brew.calls(), vec!["brew"]);
        assert_eq!(d.context().plugins().len(), 1);
    }

    #[test]
    fn plugin_load_failure_marks_run_failed_and_continues() {
        let r = Recorder::new("r", &["link"]);
        let mut loader = MockLoader::new();
        loader
            .expect_load()
            .returning(|p| Err(anyhow::anyhow!("no such file {}", p.display())));
        let (mut d, log) = dispatcher(RunOptions::default(), vec![r.clone()], loader);
        assert!(!d.dispatch(&tasks("- plugins: [missing]\n- link: {}\n")));
        assert_eq!(r.calls(), vec!["link"]);
        assert!(log.contains("Failed to load plugin /dotfiles/missing"));
    }

    #[test]
    fn plugin_load_failure_aborts_under_exit_on_failure() {
        let r = Recorder::new("r", &["link"]);
        let mut loader = MockLoader::new();
        loader
            .expect_load()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("broken")));
        let options = RunOptions {
            exit_on_failure: true,
            ..RunOptions::default()
        };
        let (mut d, _log) = dispatcher(options, vec![r.clone()], loader);
        assert!(!d.dispatch(&tasks("- plugins: [a, b]\n- link: {}\n")));
        assert!(r.calls().is_empty());
    }

    #[test]
    fn load_plugins_appends_to_registry() {
        let mut loader = MockLoader::new();
        loader
            .expect_load()
            .returning(|_| Ok(vec![Recorder::new("ext", &["ext"]) as Arc<dyn Plugin>]));
        let (mut d, _log) = dispatcher(
            RunOptions::default(),
            vec![Recorder::new("base", &["link"])],
            loader,
        );
        assert!(d.load_plugins(&[PathBuf::from("/a"), PathBuf::from("/b")]));
        let names: Vec<_> = d
            .context()
            .plugins()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["base", "ext", "ext"]);
    }

    #[test]
    fn empty_task_list_succeeds() {
        let (mut d, log) = dispatcher(RunOptions::default(), Vec::new(), MockLoader::new());
        assert!(d.dispatch(&[]));
        assert!(d.dispatch(&[Task {
            directives: Vec::<Directive>::new()
        }]));
        assert!(log.messages().is_empty());
    }
}
