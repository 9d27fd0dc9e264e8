//! PLY CLI - Tool for inspecting and converting PLY files.

use std::env;
use std::io::{self, Write};
use std::process;

use plyfile::format::parse_format_keyword;
use plyfile::prelude::*;
use tracing_subscriber::EnvFilter;

/// Verbosity level
const LOG_QUIET: u8 = 0;
const LOG_INFO: u8 = 1;
const LOG_DEBUG: u8 = 2;
const LOG_TRACE: u8 = 3;

fn init_logging(level: u8) {
    let default = match level {
        LOG_QUIET => "error",
        LOG_INFO => "info",
        LOG_DEBUG => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over the flags when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = LOG_INFO;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = LOG_DEBUG,
            "-vv" | "--trace" => level = LOG_TRACE,
            "-q" | "--quiet" => level = LOG_QUIET,
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "info" | "i" => {
            require_args(&filtered_args, 2, "ply-cli info <file.ply>");
            cmd_info(filtered_args[1])
        }
        "dump" | "d" => {
            require_args(&filtered_args, 2, "ply-cli dump <file.ply>");
            cmd_dump(filtered_args[1])
        }
        "convert" | "c" => {
            require_args(&filtered_args, 4, "ply-cli convert <in.ply> <out.ply> <encoding>");
            cmd_convert(filtered_args[1], filtered_args[2], filtered_args[3])
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        // A bare .ply path is the same as 'info'
        path if path.ends_with(".ply") => cmd_info(path),
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn require_args(args: &[&str], count: usize, usage: &str) {
    if args.len() < count {
        eprintln!("Error: missing arguments");
        eprintln!("Usage: {}", usage);
        process::exit(1);
    }
}

fn print_help() {
    println!("ply-cli - PLY file toolkit");
    println!();
    println!("USAGE:");
    println!("    ply-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <file>                   Show header metadata and element layout");
    println!("    d, dump    <file>                   Print the file as ASCII PLY");
    println!("    c, convert <in> <out> <encoding>    Rewrite with another body encoding");
    println!("    h, help                             Show this help");
    println!();
    println!("ENCODINGS:");
    println!("    ascii, binary_little_endian, binary_big_endian");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!();
    println!("EXAMPLES:");
    println!("    ply-cli info bunny.ply");
    println!("    ply-cli dump cube.ply | head -20");
    println!("    ply-cli convert scan.ply scan_le.ply binary_little_endian");
    println!();
    println!("NOTES:");
    println!("    - Passing a .ply file directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the verbosity flags");
}

fn open(path: &str) -> Result<Document> {
    tracing::info!("Opening {}", path);
    let mut doc = Document::new();
    doc.read_path(path)?;
    Ok(doc)
}

fn cmd_info(path: &str) -> Result<()> {
    let doc = open(path)?;

    println!("File: {}", path);
    for comment in doc.comments() {
        println!("Comment: {}", comment);
    }
    for info in doc.obj_info() {
        println!("Info: {}", info);
    }
    println!();

    println!("Elements:");
    for element in doc.elements() {
        println!("  {} ({} rows)", element.name(), element.rows());
        for property in element.properties() {
            let type_name = property
                .list_type()
                .and_then(|key| doc.types().lookup(key).map(|d| d.name().to_string()))
                .unwrap_or_else(|_| "?".to_string());
            match property.read_index_width() {
                Some(index) => println!(
                    "    {:<20} list<{}> (count {})",
                    property.name(),
                    type_name,
                    index.type_name()
                ),
                None => println!("    {:<20} {}", property.name(), type_name),
            }
        }
    }
    println!();
    println!("Total elements: {}", doc.num_elements());
    Ok(())
}

fn cmd_dump(path: &str) -> Result<()> {
    let doc = open(path)?;
    let text = doc.to_text()?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn cmd_convert(input: &str, output: &str, encoding: &str) -> Result<()> {
    let Some((format, endian)) = parse_format_keyword(encoding) else {
        eprintln!("Unknown encoding '{}'", encoding);
        eprintln!("Expected one of: ascii, binary_little_endian, binary_big_endian");
        process::exit(1);
    };

    let doc = open(input)?;
    tracing::debug!("Read {} elements from {}", doc.num_elements(), input);
    doc.write_path(output, format, endian)?;
    tracing::info!("Wrote {} ({})", output, encoding);
    Ok(())
}
