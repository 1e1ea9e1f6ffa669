// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wavedoc::dump::{DumpOptions, ValueDump};
use wavedoc::simple::{
    parse_primary, parse_vcd_signals_only, parse_vcd_with_options, read_vcd_with_observer,
};
use wavedoc::{Document, ParseOptions, VcdSource};

#[derive(Parser, Debug)]
#[command(name = "wavedoc")]
#[command(author = "Kevin Laeufer <laeufer@cornell.edu>")]
#[command(version)]
#[command(about = "Converts a VCD file into a JSON document for waveform viewers.", long_about = None)]
struct Args {
    #[arg(value_name = "VCDFILE", index = 1)]
    filename: PathBuf,
    #[arg(long, help = "write the document to <name>_parsed.json next to the input")]
    export: bool,
    #[arg(long, help = "only list the declared signals")]
    signals_only: bool,
    #[arg(
        long = "signal",
        value_name = "NAME",
        help = "only load this signal, can be repeated"
    )]
    signals: Vec<String>,
    #[arg(long, help = "print every value change while parsing")]
    deltas: bool,
    #[arg(long, help = "print a table of all values while parsing")]
    dumps: bool,
    #[arg(long, help = "do not retry with the vcd crate if parsing fails")]
    primary_only: bool,
}

fn main() -> wavedoc::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let filter = if args.signals.is_empty() {
        None
    } else {
        Some(args.signals.clone())
    };

    if args.signals_only {
        let data = parse_vcd_signals_only(&args.filename, filter.as_deref())?;
        for record in data.iter() {
            println!(
                "{} {} {} {}",
                record.id(),
                record.var_type(),
                record.width(),
                record.references().join(" ")
            );
        }
        return Ok(());
    }

    let source = VcdSource::path(&args.filename);
    let options = ParseOptions {
        signal_filter: filter.clone(),
        ..Default::default()
    };

    if args.deltas || args.dumps {
        let dump_options = DumpOptions {
            deltas: args.deltas,
            dumps: args.dumps,
            signals: filter,
            ..Default::default()
        };
        let mut dump = ValueDump::new(std::io::stdout().lock(), dump_options);
        // the values are already printed, the records are not needed afterwards
        let options = ParseOptions {
            store_changes: false,
            ..options
        };
        read_vcd_with_observer(&source, &options, &mut dump)?;
        return Ok(());
    }

    let doc = if args.primary_only {
        parse_primary(&source, &options)?
    } else {
        parse_vcd_with_options(&source, &options)?
    };

    if args.export {
        let out = export_path(&args.filename);
        std::fs::write(&out, doc.to_json()?)?;
        info!("wrote {}", out.display());
    } else {
        print_document(&doc)?;
    }
    Ok(())
}

fn print_document(doc: &Document) -> wavedoc::Result<()> {
    println!("{}", doc.to_json_pretty()?);
    Ok(())
}

/// `dir/name.vcd` -> `dir/name_parsed.json`
fn export_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}_parsed.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_path() {
        assert_eq!(
            export_path(Path::new("inputs/clock.vcd")),
            PathBuf::from("inputs/clock_parsed.json")
        );
        assert_eq!(
            export_path(Path::new("trace")),
            PathBuf::from("trace_parsed.json")
        );
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from([
            "wavedoc", "a.vcd", "--signal", "top.clk", "--signal", "top.en", "--dumps",
        ]);
        assert_eq!(args.filename, PathBuf::from("a.vcd"));
        assert_eq!(args.signals, ["top.clk", "top.en"]);
        assert!(args.dumps);
        assert!(!args.export && !args.deltas && !args.primary_only);
    }
}
