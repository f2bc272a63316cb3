//! Output formatting for CLI results and failures.

use std::io::{self, IsTerminal};

use labelprint_session::{PaperState, PrinterStatus, SessionError};
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Human-readable text.
    Pretty,
    /// Machine-readable JSON.
    Json,
}

impl Format {
    /// Explicit choice, or pretty for terminals and JSON for pipes.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

/// Print a serializable value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Human-readable status block.
pub(crate) fn render_status(name: Option<&str>, status: &PrinterStatus, extended: Option<&[u8]>) {
    if let Some(name) = name {
        println!("printer:     {name}");
    }
    println!("connected:   {}", yes_no(status.connected));
    if status.paper_state == PaperState::Disconnected {
        return;
    }
    println!("ready:       {}", yes_no(status.ready));
    println!("paper:       {}", status.paper_state);
    println!("paper out:   {}", yes_no(status.paper_out));
    println!("cover open:  {}", yes_no(status.cover_open));
    if let Some(bytes) = extended {
        let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
        println!("raw status:  {}", hex.join(" "));
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Stable error code for the JSON failure envelope.
pub(crate) fn error_code(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SessionError>())
        .map_or_else(
            || "command_failed".to_string(),
            |session| format!("{}_error", session.category()),
        )
}

/// Report a failed command in the requested format.
pub(crate) fn render_error(err: &anyhow::Error, format: Format) {
    match format {
        Format::Json => {
            let out = serde_json::json!({
                "success": false,
                "error": error_code(err),
                "message": format!("{err:#}"),
            });
            match serde_json::to_string_pretty(&out) {
                Ok(json) => println!("{json}"),
                Err(_) => eprintln!("error: {err:#}"),
            }
        }
        Format::Pretty => eprintln!("error: {err:#}"),
    }
}
