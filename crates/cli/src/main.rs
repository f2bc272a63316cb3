mod output;

use std::fs;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use labelprint_session::{
    Alignment, BarcodeDims, BarcodeOp, ConnectionTarget, DEFAULT_PORT, FontSize, Position,
    PrinterSession, RasterPageOp, SessionConfig, Symbology, TextOp,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::output::{Format, print_json, render_error, render_status};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "labelprint",
    version,
    about = "Discover, query, and print to networked label printers"
)]
struct Cli {
    /// Output mode: "pretty" for terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    /// Log more (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Hex-dump every byte exchanged with the printer (needs -vv).
    #[arg(long, global = true)]
    trace_io: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Scan the local network for printers.
    Discover {
        /// Scan duration in milliseconds.
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },

    /// Connect and report printer status.
    Status {
        #[command(flatten)]
        conn: ConnectArgs,
        /// Also read the 4-byte extended status.
        #[arg(long)]
        extended: bool,
    },

    /// Print a line of text.
    Text {
        #[command(flatten)]
        conn: ConnectArgs,
        /// Text to print.
        text: String,
        /// Font size: small, normal, large, xlarge.
        #[arg(long, default_value = "normal")]
        font: String,
        /// Alignment: left, center, right.
        #[arg(long, default_value = "left")]
        align: String,
        /// Bold text.
        #[arg(long)]
        bold: bool,
        #[command(flatten)]
        pos: PositionArgs,
    },

    /// Print a 1D barcode.
    Barcode {
        #[command(flatten)]
        conn: ConnectArgs,
        /// Data to encode.
        data: String,
        /// Symbology (CODE128, CODE39, EAN13, UPC_A, ...).
        #[arg(long = "type", default_value = "CODE128")]
        symbology: String,
        /// Narrow bar width in dots.
        #[arg(long, default_value_t = 2)]
        width: u32,
        /// Bar height in dots.
        #[arg(long, default_value_t = 100)]
        height: u32,
        /// Print the human-readable line.
        #[arg(long)]
        hri: bool,
        #[command(flatten)]
        pos: PositionArgs,
    },

    /// Print one page of an image file.
    Raster {
        #[command(flatten)]
        conn: ConnectArgs,
        /// Image file to print.
        file: String,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Target width in dots (0 keeps the source width).
        #[arg(long, default_value_t = 0)]
        width: u32,
        /// Threshold instead of dithering.
        #[arg(long)]
        no_dither: bool,
        /// Send uncompressed bitmap rows.
        #[arg(long)]
        no_compress: bool,
        /// Brightness level (0-100).
        #[arg(long, default_value_t = 1)]
        level: u32,
        #[command(flatten)]
        pos: PositionArgs,
    },
}

/// Where the printer is.
#[derive(Args, Debug)]
struct ConnectArgs {
    /// Printer IP address, hostname, or (with --serial) device path.
    #[arg(long, short = 'p', env = "LABELPRINT_PRINTER")]
    printer: String,
    /// TCP port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Treat --printer as a serial device path.
    #[arg(long)]
    serial: bool,
    /// Connect timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
    /// Read timeout in milliseconds.
    #[arg(long)]
    read_timeout_ms: Option<u64>,
}

impl ConnectArgs {
    fn target(&self) -> ConnectionTarget {
        let target = if self.serial {
            ConnectionTarget::serial(self.printer.as_str())
        } else {
            ConnectionTarget::network(self.printer.as_str()).with_port(self.port)
        };
        target.with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

/// Dot position on the label.
#[derive(Args, Debug)]
struct PositionArgs {
    /// Horizontal position in dots.
    #[arg(long, short = 'x', default_value_t = 0)]
    x: u32,
    /// Vertical position in dots.
    #[arg(long, short = 'y', default_value_t = 0)]
    y: u32,
}

impl From<&PositionArgs> for Position {
    fn from(pos: &PositionArgs) -> Self {
        Position::new(pos.x, pos.y)
    }
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let format = Format::resolve_or_detect(cli.output.as_deref());

    if let Err(err) = run(cli, format) {
        render_error(&err, format);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, format: Format) -> Result<()> {
    let trace_io = cli.trace_io;
    match cli.cmd {
        Cmd::Discover { timeout_ms } => cmd_discover(timeout_ms, trace_io, format),
        Cmd::Status { conn, extended } => cmd_status(&conn, extended, trace_io, format),
        Cmd::Text {
            conn,
            text,
            font,
            align,
            bold,
            pos,
        } => {
            let mut op = TextOp::new(text);
            op.font = FontSize::from_name(&font);
            op.align = Alignment::from_name(&align);
            op.bold = bold;
            op.position = (&pos).into();
            with_session(&conn, trace_io, format, "text", |session| {
                session.print_text(op)
            })
        }
        Cmd::Barcode {
            conn,
            data,
            symbology,
            width,
            height,
            hri,
            pos,
        } => {
            let mut op = BarcodeOp::new(data);
            op.symbology = Symbology::from_name(&symbology);
            op.dims = BarcodeDims {
                narrow: width,
                height,
            };
            op.human_readable = hri;
            op.position = (&pos).into();
            with_session(&conn, trace_io, format, "barcode", |session| {
                session.print_barcode(op)
            })
        }
        Cmd::Raster {
            conn,
            file,
            page,
            width,
            no_dither,
            no_compress,
            level,
            pos,
        } => {
            let source = fs::read(&file).with_context(|| format!("failed to read '{file}'"))?;
            let mut op = RasterPageOp::new(source);
            op.page = page;
            op.width = width;
            op.dither = !no_dither;
            op.compress = !no_compress;
            op.level = level;
            op.position = (&pos).into();
            with_session(&conn, trace_io, format, "raster page", |session| {
                session.print_raster_page(op)
            })
        }
    }
}

// ── Commands ────────────────────────────────────────────────────────────

fn session_config(read_timeout_ms: Option<u64>, trace_io: bool) -> SessionConfig {
    let mut config = SessionConfig::default();
    if let Some(ms) = read_timeout_ms {
        config.timeouts.read = Duration::from_millis(ms);
    }
    config.trace_io = trace_io;
    config
}

fn connect(conn: &ConnectArgs, trace_io: bool) -> Result<(PrinterSession, String)> {
    let mut session = PrinterSession::hardware(session_config(conn.read_timeout_ms, trace_io));
    let target = conn.target();
    let name = session
        .connect(&target)
        .with_context(|| format!("failed to connect to {target}"))?;
    debug!(printer = %name, %target, "connected");
    Ok((session, name.as_str().to_string()))
}

fn with_session<F>(
    conn: &ConnectArgs,
    trace_io: bool,
    format: Format,
    what: &str,
    print: F,
) -> Result<()>
where
    F: FnOnce(&mut PrinterSession) -> Result<(), labelprint_session::SessionError>,
{
    let (mut session, name) = connect(conn, trace_io)?;
    print(&mut session).with_context(|| format!("failed to print {what}"))?;
    session.disconnect().context("failed to disconnect")?;

    match format {
        Format::Json => print_json(&serde_json::json!({
            "success": true,
            "printer": name,
        }))?,
        Format::Pretty => println!("printed {what} on {name}"),
    }
    Ok(())
}

fn cmd_status(conn: &ConnectArgs, extended: bool, trace_io: bool, format: Format) -> Result<()> {
    let (mut session, name) = connect(conn, trace_io)?;
    let status = session.get_status().context("failed to read status")?;
    let raw = if extended {
        Some(
            session
                .raw_status(true)
                .context("failed to read extended status")?,
        )
    } else {
        None
    };
    session.disconnect().context("failed to disconnect")?;

    match format {
        Format::Json => print_json(&serde_json::json!({
            "printer": name,
            "status": status,
            "extended": raw,
        }))?,
        Format::Pretty => render_status(Some(name.as_str()), &status, raw.as_deref()),
    }
    Ok(())
}

fn cmd_discover(timeout_ms: u64, trace_io: bool, format: Format) -> Result<()> {
    let mut session = PrinterSession::hardware(session_config(None, trace_io));
    let outcome = session
        .discover_network_printers(Some(Duration::from_millis(timeout_ms)))
        .context("failed to start discovery")?
        .wait();

    match format {
        Format::Json => print_json(&serde_json::json!({
            "success": true,
            "devices": outcome.devices(),
            "timedOut": outcome.timed_out(),
        }))?,
        Format::Pretty => {
            if outcome.devices().is_empty() {
                println!("no printers found");
            }
            for device in outcome.devices() {
                println!("{device}");
            }
        }
    }
    Ok(())
}
