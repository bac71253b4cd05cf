//! Shell entrypoints of the replication pod containers.
//!
//! Containers of a replication pod coordinate through files on shared volumes:
//!
//! - the orchestrator sidecar touches a termination marker in every connector
//!   volume when it exits, whatever its exit status;
//! - each connector runs in the background next to a watchdog that kills it once
//!   the marker shows up, then records the connector's exit code in a file and
//!   exits with that same code.
//!
//! The marker is create-once and never removed. The exit code file is written
//! exactly once, after the connector process has terminated. A connector killed
//! by the watchdog records whatever status the shell reports for the killed
//! process (usually `128 + SIGTERM`), indistinguishable from a connector that
//! exited with that code on its own.

use workload_config::shared::ScriptConventions;

/// Interval at which the watchdog checks for the termination marker.
pub const WATCHDOG_POLL_INTERVAL_SECS: u64 = 10;

/// Exit code of a connector container whose entrypoint variable is unset.
pub const ENTRYPOINT_UNSET_EXIT_CODE: i32 = 127;

/// Generates container entrypoint scripts from the shared [`ScriptConventions`].
///
/// Generation is pure text templating. Operation names and arguments are
/// interpolated verbatim and must come from trusted, internally built strings.
#[derive(Debug, Clone, Default)]
pub struct EntrypointScripts {
    conventions: ScriptConventions,
}

impl EntrypointScripts {
    pub fn new(conventions: ScriptConventions) -> Self {
        Self { conventions }
    }

    pub fn conventions(&self) -> &ScriptConventions {
        &self.conventions
    }

    /// Script running the sidecar binary and signalling its exit.
    ///
    /// A trap creates the termination marker in each of `marker_dirs` on any
    /// exit of the sidecar, so connectors sharing those directories always
    /// learn that the sidecar stopped. The script exits with the sidecar's status.
    /// Without marker dirs there is nobody to signal and no trap is installed.
    pub fn sidecar_script(&self, marker_dirs: &[&str]) -> String {
        let binary = &self.conventions.sidecar_binary;
        if marker_dirs.is_empty() {
            return format!("{binary}\n");
        }

        let marker = &self.conventions.termination_marker_filename;
        let marker_paths = marker_dirs
            .iter()
            .map(|dir| single_quote(&format!("{dir}/{marker}")))
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            r#"trap "touch {marker_paths}" EXIT
{binary}
"#
        )
    }

    /// Script supervising a connector operation.
    ///
    /// Runs `$<entrypoint> <operation> <config_args>` in the background with its
    /// combined output redirected to the job output file. The connector is
    /// `exec`ed in place of its subshell, so the recorded pid is the connector
    /// itself. The script stops it once the termination marker appears (checked
    /// every [`WATCHDOG_POLL_INTERVAL_SECS`]), writes its exit code to the exit
    /// code file and exits with it. Exits with
    /// [`ENTRYPOINT_UNSET_EXIT_CODE`] before starting anything when the
    /// entrypoint variable is unset.
    pub fn connector_operation_script(&self, operation: &str, config_args: &str) -> String {
        let conventions = &self.conventions;
        let entrypoint = &conventions.entrypoint_env_var;
        let job_output = conventions.config_file(&conventions.job_output_filename);
        let exit_code_file = conventions.config_file(&conventions.exit_code_filename);
        let marker = conventions.config_file(&conventions.termination_marker_filename);

        format!(
            r#"if [ -z "${entrypoint}" ]; then
  echo "Entrypoint was not set! {entrypoint} must be set in the container."
  exit {unset_code}
else
  echo "Using {entrypoint}: ${entrypoint}"
fi

# run the connector in the background and keep its pid
(eval "exec ${entrypoint} {operation} {config_args}" > {job_output} 2>&1) &
CHILD_PID=$!

# stop the connector once the termination marker shows up
(while kill -0 $CHILD_PID 2>/dev/null; do if [ -f {marker} ]; then kill $CHILD_PID; exit 0; fi; sleep {poll}; done) &

wait $CHILD_PID
EXIT_CODE=$?

# hand the exit code over to the sidecar
echo $EXIT_CODE > {exit_code_file}

exit $EXIT_CODE
"#,
            unset_code = ENTRYPOINT_UNSET_EXIT_CODE,
            poll = WATCHDOG_POLL_INTERVAL_SECS,
        )
    }

    /// Source `read` operation with the staged config, catalog and state.
    pub fn source_read_script(&self) -> String {
        let args = format!(
            "{} {} {}",
            self.config_arg(),
            self.catalog_arg(),
            self.state_arg()
        );
        self.connector_operation_script("read", &args)
    }

    /// Destination `write` operation with the staged config and catalog.
    pub fn destination_write_script(&self) -> String {
        let args = format!("{} {}", self.config_arg(), self.catalog_arg());
        self.connector_operation_script("write", &args)
    }

    /// Connection `check` operation.
    pub fn check_script(&self) -> String {
        self.connector_operation_script("check", &self.config_arg())
    }

    /// Schema `discover` operation.
    pub fn discover_script(&self) -> String {
        self.connector_operation_script("discover", &self.config_arg())
    }

    /// Connector `spec` operation, which takes no arguments.
    pub fn spec_script(&self) -> String {
        self.connector_operation_script("spec", "")
    }

    fn config_arg(&self) -> String {
        format!(
            "--config {}",
            self.conventions
                .config_file(&self.conventions.connector_config_filename)
        )
    }

    fn catalog_arg(&self) -> String {
        format!(
            "--catalog {}",
            self.conventions.config_file(&self.conventions.catalog_filename)
        )
    }

    fn state_arg(&self) -> String {
        format!(
            "--state {}",
            self.conventions
                .config_file(&self.conventions.input_state_filename)
        )
    }
}

/// Wraps `value` in single quotes for the shell.
fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
