use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser as ClapParser};

use formwire::{
    MultipartReader, ParserConfig, ReaderConfig, format_debug, format_headers_only, format_json,
    parse_boundary,
};

/// formwire CLI — streaming multipart/form-data parser.
///
/// Reads a raw multipart body from a file, --raw string, or stdin and
/// outputs the parsed parts in the chosen format. The boundary comes
/// from --boundary, or is extracted from a --content-type header value.
///
/// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted
/// so you can pass a full body as a single shell argument.
#[derive(ClapParser)]
#[command(name = "formwire-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a file containing a raw multipart body.
    /// Reads from stdin when neither FILE nor --raw is given.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Raw multipart body string (escape sequences \r \n \t \\ are
    /// expanded).
    #[arg(long)]
    raw: Option<String>,

    /// The multipart boundary, without the leading dashes.
    #[arg(short, long)]
    boundary: Option<String>,

    /// A Content-Type header value to extract the boundary from
    /// (e.g. 'multipart/form-data; boundary=X').
    #[arg(short, long, conflicts_with = "boundary")]
    content_type: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "json", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,

    /// Reject preamble junk and a missing final CRLF.
    #[arg(long)]
    strict: bool,

    /// Charset for header values and text fields.
    #[arg(long, default_value = "utf-8")]
    charset: String,

    /// Maximum number of segments allowed.
    #[arg(long, default_value = "128")]
    max_segments: usize,

    /// Per-part memory threshold before spilling to a temp file.
    #[arg(long, default_value = "262144")]
    memfile_limit: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable debug output
    Debug,
    /// Part headers only
    Headers,
}

fn main() {
    let cli = Cli::parse();

    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if cli.file.is_none() && cli.raw.is_none() && std::io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let boundary = match resolve_boundary(&cli) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let Some(charset) = encoding_rs::Encoding::for_label(cli.charset.as_bytes()) else {
        eprintln!("Error: unknown charset '{}'", cli.charset);
        process::exit(1);
    };

    let data = match read_input(&cli) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    if data.is_empty() {
        eprintln!("Error: empty input");
        process::exit(1);
    }

    let config = ReaderConfig {
        parser: ParserConfig {
            charset,
            strict: cli.strict,
            max_segments: cli.max_segments,
            ..ParserConfig::default()
        },
        memfile_limit: cli.memfile_limit,
        ..ReaderConfig::default()
    };

    let reader = match MultipartReader::with_config(data.as_slice(), &boundary, config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let parts = match reader.into_parts() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Parse error: {e} (HTTP {})", e.status());
            process::exit(2);
        }
    };

    let output = match cli.format {
        OutputFormat::Json => format_json(&parts, cli.pretty),
        OutputFormat::Debug => format_debug(&parts),
        OutputFormat::Headers => format_headers_only(&parts),
    };

    print!("{output}");
}

/// Pick the boundary from --boundary or --content-type.
fn resolve_boundary(cli: &Cli) -> Result<Vec<u8>, String> {
    if let Some(boundary) = &cli.boundary {
        return Ok(boundary.as_bytes().to_vec());
    }
    if let Some(content_type) = &cli.content_type {
        return parse_boundary(content_type).map_err(|e| e.to_string());
    }
    Err("a boundary is required: pass --boundary or --content-type".into())
}

/// Read the raw body from --raw, a file, or stdin.
fn read_input(cli: &Cli) -> Result<Vec<u8>, std::io::Error> {
    if let Some(raw) = &cli.raw {
        return Ok(unescape(raw).into_bytes());
    }
    match &cli.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
///
/// Any other `\X` sequence is kept as-is (both the backslash and `X`).
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
