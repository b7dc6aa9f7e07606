//! Tracing subscriber setup: console formatter, verbosity filter, file layer.
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use super::logger::{DRY_RUN_TARGET, LOWINFO_TARGET};
use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Console verbosity selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-Q`: warnings and errors only.
    SuperQuiet,
    /// `-q`: directive summaries, warnings and errors.
    Quiet,
    /// Default: per-item progress and up.
    #[default]
    Normal,
    /// `-v`: everything, including debug output.
    Verbose,
}

impl Verbosity {
    /// Lowest message rank that reaches the console.
    const fn min_rank(self) -> u8 {
        match self {
            Self::Verbose => 0,
            Self::Normal => 1,
            Self::Quiet => 2,
            Self::SuperQuiet => 3,
        }
    }
}

/// Rank an event on the `debug < lowinfo < info < warn < error` scale.
fn rank(level: tracing::Level, target: &str) -> u8 {
    match (level, target) {
        (tracing::Level::ERROR, _) => 4,
        (tracing::Level::WARN, _) => 3,
        (tracing::Level::INFO, LOWINFO_TARGET | DRY_RUN_TARGET) => 1,
        (tracing::Level::INFO, _) => 2,
        _ => 0,
    }
}

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// A [`tracing_subscriber::Layer`] that appends all events to the persistent
/// log file with timestamps and ANSI codes stripped.
///
/// Always captures events at `DEBUG` level and above regardless of the
/// console verbosity setting.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open (or create) the run log, write a run header, and return a new
    /// `FileLayer` ready to receive events.
    ///
    /// Returns `None` if the cache directory cannot be created or the file
    /// cannot be opened.
    pub(super) fn new() -> Option<Self> {
        let path = log_file_path()?;
        let version =
            option_env!("DOTLINK_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "==========================================\n\
             dotlink {version} {}\n\
             ==========================================\n",
            format_utc_datetime(),
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = strip_ansi(&extractor.message);
        let ts = format_utc_time();

        let line = match (level, target) {
            (tracing::Level::INFO, DRY_RUN_TARGET) => format!("[{ts}]     [dry run] {msg}"),
            (tracing::Level::ERROR, _) => format!("[{ts}]     [error] {msg}"),
            (tracing::Level::WARN, _) => format!("[{ts}]     [warn] {msg}"),
            (tracing::Level::DEBUG, _) => format!("[{ts}]     [debug] {msg}"),
            _ => format!("[{ts}]     {msg}"),
        };

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits dotlink-style
/// console output.
struct DotlinkFormatter {
    color: bool,
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for DotlinkFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);

        let line = match level {
            tracing::Level::ERROR => format!("\x1b[31m{}\x1b[0m", extractor.message),
            tracing::Level::WARN => format!("\x1b[35m{}\x1b[0m", extractor.message),
            tracing::Level::INFO if target == DRY_RUN_TARGET => {
                format!("\x1b[33m[dry run]\x1b[0m {}", extractor.message)
            }
            tracing::Level::INFO if target == LOWINFO_TARGET => {
                format!("\x1b[34m{}\x1b[0m", extractor.message)
            }
            tracing::Level::INFO => format!("\x1b[32m{}\x1b[0m", extractor.message),
            _ => format!("\x1b[33m{}\x1b[0m", extractor.message),
        };

        if self.color {
            writeln!(writer, "{line}")
        } else {
            writeln!(writer, "{}", strip_ansi(&line))
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Sets up a console layer filtered by `verbosity` (warnings and errors go
/// to stderr, everything else to stdout) and a file layer that writes all
/// events, including `debug`, to `$XDG_CACHE_HOME/dotlink/run.log`.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(verbosity: Verbosity, color: bool) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(DotlinkFormatter { color })
        .with_writer(make_writer)
        .with_filter(tracing_subscriber::filter::filter_fn(move |metadata| {
            rank(*metadata.level(), metadata.target()) >= verbosity.min_rank()
        }));

    let file_layer = FileLayer::new().map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
