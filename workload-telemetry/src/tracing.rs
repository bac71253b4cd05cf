use std::io::Error;
use std::io::Write;
use std::sync::OnceLock;
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    panic::PanicHookInfo,
    sync::Once,
};
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, InitError},
};
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Registry, fmt, layer::SubscriberExt};
use workload_config::Environment;

/// JSON field name for data plane identification in logs.
const DATA_PLANE_KEY_IN_LOG: &str = "data_plane";
/// JSON field name for workspace identification in logs.
const WORKSPACE_KEY_IN_LOG: &str = "workspace_id";

/// Errors that can occur during tracing initialization.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to build rolling file appender: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error("an io error occurred: {0}")]
    Io(#[from] Error),
}

/// Log flusher handle for ensuring logs are written before shutdown.
///
/// Deployed environments return a [`WorkerGuard`] that must be kept alive until
/// the process exits, otherwise buffered log lines are lost.
#[must_use]
pub enum LogFlusher {
    Flusher(WorkerGuard),
    NullFlusher,
}

static INIT_TEST_TRACING: Once = Once::new();

/// Initializes tracing for test environments.
///
/// Call once at the beginning of tests. Set `ENABLE_TRACING=1` to view tracing output:
/// ```bash
/// ENABLE_TRACING=1 cargo test test_name
/// ```
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            // Without an explicit environment we would default to prod and log to files.
            Environment::Dev.set();
            let _log_flusher =
                init_tracing("test").expect("Failed to initialize tracing for tests");
        }
    });
}

static DATA_PLANE: OnceLock<String> = OnceLock::new();
static WORKSPACE_ID: OnceLock<String> = OnceLock::new();

/// Sets the data plane name injected into every JSON log entry.
pub fn set_global_data_plane(data_plane: String) {
    let _ = DATA_PLANE.set(data_plane);
}

/// Returns the data plane name, if set.
pub fn get_global_data_plane() -> Option<&'static str> {
    DATA_PLANE.get().map(|s| s.as_str())
}

/// Sets the workspace id injected into every JSON log entry.
///
/// The launcher handles a single request per process, so the first value wins.
pub fn set_global_workspace_id(workspace_id: String) {
    let _ = WORKSPACE_ID.set(workspace_id);
}

/// Returns the workspace id, if set.
pub fn get_global_workspace_id() -> Option<&'static str> {
    WORKSPACE_ID.get().map(|s| s.as_str())
}

/// Adds each `(key, value)` to a JSON object log line unless the key is already present.
///
/// Returns `None` when the line is not a JSON object or nothing was added. A
/// trailing newline is preserved.
fn inject_fields(line: &str, fields: &[(&str, Option<&str>)]) -> Option<String> {
    let serde_json::Value::Object(mut map) = serde_json::from_str::<serde_json::Value>(line).ok()?
    else {
        return None;
    };

    let mut modified = false;
    for (key, value) in fields {
        if let Some(value) = value
            && !map.contains_key(*key)
        {
            map.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
            modified = true;
        }
    }

    if !modified {
        return None;
    }

    let serialized = serde_json::to_string(&map).ok()?;
    if line.ends_with('\n') {
        Some(format!("{serialized}\n"))
    } else {
        Some(serialized)
    }
}

/// Writer wrapper that injects the global data plane and workspace fields into JSON log entries.
struct FieldInjectingWriter<W> {
    inner: W,
}

impl<W> FieldInjectingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W> Write for FieldInjectingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let fields = [
            (DATA_PLANE_KEY_IN_LOG, get_global_data_plane()),
            (WORKSPACE_KEY_IN_LOG, get_global_workspace_id()),
        ];

        if let Ok(line) = std::str::from_utf8(buf)
            && let Some(output) = inject_fields(line, &fields)
        {
            // Report the original length so callers don't retry the tail.
            self.inner.write_all(output.as_bytes())?;
            return Ok(buf.len());
        }

        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Initializes tracing for the application.
///
/// Deployed environments log JSON to rotating files, development logs to the console.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    init_tracing_with_top_level_fields(app_name, None, None)
}

/// Initializes tracing with optional top-level fields.
///
/// Like [`init_tracing`] but the data plane name and workspace id are added to
/// each JSON log entry.
pub fn init_tracing_with_top_level_fields(
    app_name: &str,
    data_plane: Option<String>,
    workspace_id: Option<String>,
) -> Result<LogFlusher, TracingError> {
    if let Some(data_plane) = data_plane {
        set_global_data_plane(data_plane);
    }

    if let Some(workspace_id) = workspace_id {
        set_global_workspace_id(workspace_id);
    }

    // Route records from crates using `log` (e.g. the kube client stack) into tracing.
    LogTracer::init()?;

    let is_prod = Environment::load()?.is_prod();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if is_prod {
        configure_prod_tracing(filter, app_name)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    Ok(log_flusher)
}

fn configure_prod_tracing(filter: EnvFilter, app_name: &str) -> Result<LogFlusher, TracingError> {
    let file_appender = rolling::Builder::new()
        .filename_prefix(app_name)
        .filename_suffix("log")
        .rotation(rolling::Rotation::DAILY)
        .max_log_files(5)
        .build("logs")?;

    let (file_appender, guard) = tracing_appender::non_blocking(file_appender);

    let format = fmt::format()
        .with_level(true)
        .with_ansi(false)
        .with_target(false);

    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(format)
            .with_writer(move || FieldInjectingWriter::new(file_appender.make_writer()))
            .json()
            .with_current_span(true)
            .with_span_list(true),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::Flusher(guard))
}

fn configure_dev_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let format = fmt::format()
        .with_level(true)
        .with_ansi(true)
        .pretty()
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    // Stdout is reserved for rendered manifests.
    let subscriber = FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Replaces the default panic hook so panics reach the log files, then
/// delegates to the previous hook.
fn set_tracing_panic_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        panic_hook(info);
        prev_hook(info);
    }));
}

fn panic_hook(panic_info: &PanicHookInfo) {
    let backtrace = Backtrace::capture();
    let (backtrace, note) = match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace), None),
        BacktraceStatus::Disabled => (
            None,
            Some("run with RUST_BACKTRACE=1 to display backtraces"),
        ),
        BacktraceStatus::Unsupported => {
            (None, Some("backtraces are not supported on this platform"))
        }
        _ => (None, Some("backtrace status is unknown")),
    };

    let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    };

    let location = panic_info.location().map(|location| location.to_string());

    tracing::error!(
        panic.payload = payload,
        payload.location = location,
        panic.backtrace = backtrace.map(tracing::field::display),
        panic.note = note,
        "a panic occurred",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_missing_fields_and_keeps_newline() {
        let line = "{\"level\":\"INFO\",\"message\":\"pod built\"}\n";
        let output = inject_fields(
            line,
            &[("data_plane", Some("eu-1")), ("workspace_id", None)],
        )
        .unwrap();

        assert!(output.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(value["data_plane"], "eu-1");
        assert!(value.get("workspace_id").is_none());
        assert_eq!(value["message"], "pod built");
    }

    #[test]
    fn existing_fields_are_not_overwritten() {
        let line = r#"{"data_plane":"us-1"}"#;
        assert_eq!(inject_fields(line, &[("data_plane", Some("eu-1"))]), None);
    }

    #[test]
    fn non_json_lines_pass_through() {
        assert_eq!(inject_fields("plain text", &[("data_plane", Some("eu-1"))]), None);
        assert_eq!(inject_fields("[1,2]", &[("data_plane", Some("eu-1"))]), None);
    }

    #[test]
    fn writer_injects_fields_into_buffer() {
        set_global_data_plane("test-plane".to_string());

        let mut writer = FieldInjectingWriter::new(Vec::new());
        let line = b"{\"message\":\"hello\"}\n";
        let written = writer.write(line).unwrap();

        assert_eq!(written, line.len());
        let value: serde_json::Value =
            serde_json::from_slice(writer.inner.trim_ascii_end()).unwrap();
        assert_eq!(value["data_plane"], get_global_data_plane().unwrap());
    }
}
