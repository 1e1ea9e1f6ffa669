// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Entry points for turning a VCD into a `Document`. Tries our own parser first and
// falls back to the `vcd` crate if that fails.

use crate::vcd::ChangeObserver;
use crate::{
    fallback, vcd, Document, Normalize, ParseOptions, Result, Strategy, VcdData, VcdSource,
    WavedocError,
};
use tracing::{info, instrument, warn};

/// Parse a VCD with the default options.
pub fn parse_vcd(source: &VcdSource) -> Result<Document> {
    parse_vcd_with_options(source, &ParseOptions::default())
}

/// Parse a VCD with the primary parser and, if that fails, with the fallback parser.
/// If both fail, the error message of the fallback is returned.
#[instrument(skip_all, fields(source = %describe(source)))]
pub fn parse_vcd_with_options(source: &VcdSource, options: &ParseOptions) -> Result<Document> {
    let primary = match load_with(Strategy::Primary, || parse_primary(source, options)) {
        Ok(doc) => return Ok(doc),
        Err(e) => e,
    };
    warn!(error = %primary, "primary parser failed, trying fallback");
    let ignored = unsupported_by_fallback(options);
    if !ignored.is_empty() {
        warn!(
            options = ?ignored,
            "the fallback parser does not support these options, they are ignored"
        );
    }
    load_with(Strategy::Fallback, || parse_fallback(source)).map_err(|fallback| {
        WavedocError::FallbackExhausted {
            primary: primary.to_string(),
            fallback: fallback.to_string(),
        }
    })
}

/// Parses and normalizes with our own line based parser only.
pub fn parse_primary(source: &VcdSource, options: &ParseOptions) -> Result<Document> {
    normalized(|| read_vcd(source, options))
}

/// Parses and normalizes with the `vcd` crate only. Parse options do not apply.
pub fn parse_fallback(source: &VcdSource) -> Result<Document> {
    normalized(|| match source {
        VcdSource::Path(path) => Ok(fallback::read_from_file(path)?),
        VcdSource::Content(content) => Ok(fallback::read_from_str(content)?),
    })
}

/// Reads only the declarations of a VCD file. Value changes are never parsed.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn parse_vcd_signals_only<P: AsRef<std::path::Path>>(
    path: P,
    filter: Option<&[String]>,
) -> Result<VcdData> {
    let options = ParseOptions {
        signals_only: true,
        signal_filter: filter.map(|f| f.to_vec()),
        store_changes: false,
    };
    Ok(vcd::read_from_file(path, &options)?)
}

/// Runs the primary parser and returns the raw signal records.
pub fn read_vcd(source: &VcdSource, options: &ParseOptions) -> Result<VcdData> {
    read_vcd_with_observer(source, options, &mut ())
}

pub fn read_vcd_with_observer(
    source: &VcdSource,
    options: &ParseOptions,
    observer: &mut impl ChangeObserver,
) -> Result<VcdData> {
    let data = match source {
        VcdSource::Path(path) => vcd::read_from_file_with_observer(path, options, observer)?,
        VcdSource::Content(content) => {
            vcd::read_from_str_with_observer(content, options, observer)?
        }
    };
    Ok(data)
}

/// Both parsers produce something that implements `Normalize`, which is all we need.
#[inline]
fn normalized<N: Normalize>(load: impl FnOnce() -> Result<N>) -> Result<Document> {
    Ok(load()?.normalize())
}

fn load_with(strategy: Strategy, load: impl FnOnce() -> Result<Document>) -> Result<Document> {
    info!("parsing with the {strategy} parser");
    let doc = load()?;
    info!(signals = doc.leaves().count(), now = doc.now, "{strategy} parser succeeded");
    Ok(doc)
}

/// Names of the options that are set, but that `parse_fallback` cannot honor.
fn unsupported_by_fallback(options: &ParseOptions) -> Vec<&'static str> {
    let mut out = Vec::new();
    if options.signals_only {
        out.push("signals_only");
    }
    if options.signal_filter.is_some() {
        out.push("signal_filter");
    }
    if !options.store_changes {
        out.push("store_changes");
    }
    out
}

fn describe(source: &VcdSource) -> String {
    match source {
        VcdSource::Path(path) => path.display().to_string(),
        VcdSource::Content(content) => format!("<{} bytes of content>", content.len()),
    }
}
