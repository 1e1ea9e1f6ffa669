// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Line based VCD parser. Produces one signal record per identifier code.

use crate::signals::{Change, SignalRecord, SignalRef, Time};
use crate::ParseOptions;
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::Index;
use tracing::{debug, instrument, trace};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum VcdParseError {
    #[error("[vcd] line {0}: `$upscope` without a matching `$scope`")]
    VcdScopeUnderflow(usize),
    #[error("[vcd] scopes are still open at the end of the input: {0}")]
    VcdUnclosedScopes(String),
    #[error("[vcd] line {0}: failed to parse time marker: `{1}`")]
    VcdTimeParsing(usize, String),
    #[error("[vcd] line {0}: failed to parse length: `{1}` for variable `{2}`")]
    VcdVarLengthParsing(usize, String, String),
    #[error("[vcd] line {0}: unexpected number of tokens for command {1}: {2}")]
    VcdUnexpectedNumberOfTokens(usize, String, String),
    #[error("[vcd] line {0}: expected a value followed by an id, not `{1}`")]
    VcdValueChange(usize, String),
    #[error("[vcd] too many signals")]
    VcdTooManySignals,
    #[error("failed to decode string")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("I/O operation failed")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VcdParseError>;

/// Receives value changes while the body of a VCD is parsed.
/// Only changes of declared signals are reported.
pub trait ChangeObserver {
    /// Called when `$enddefinitions` is reached, all declarations are known at this point.
    fn definitions_done(&mut self, _data: &VcdData) -> Result<()> {
        Ok(())
    }
    /// Called for every time marker, before `new` becomes the current time.
    fn time_change(&mut self, _old: Time, _new: Time, _data: &VcdData) -> Result<()> {
        Ok(())
    }
    fn value_change(
        &mut self,
        _signal: SignalRef,
        _time: Time,
        _value: &str,
        _data: &VcdData,
    ) -> Result<()> {
        Ok(())
    }
    /// Called once the whole input has been consumed.
    fn finish(&mut self, _time: Time, _data: &VcdData) -> Result<()> {
        Ok(())
    }
}

impl ChangeObserver for () {}

/// Result of parsing a VCD: an arena of signal records plus the tables to find them.
#[derive(Debug, Clone, Default)]
pub struct VcdData {
    signals: Vec<SignalRecord>,
    id_lookup: FxHashMap<String, SignalRef>,
    reference_lookup: FxHashMap<String, SignalRef>,
    /// every registered reference, including aliases, in declaration order
    signal_names: Vec<String>,
    end_time: Time,
}

impl VcdData {
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Iterates over all records in the order in which their id was first declared.
    pub fn iter(&self) -> std::slice::Iter<'_, SignalRecord> {
        self.signals.iter()
    }

    pub fn signal_refs(&self) -> impl Iterator<Item = SignalRef> + '_ {
        (0..self.signals.len()).flat_map(SignalRef::from_index)
    }

    pub fn get(&self, signal: SignalRef) -> Option<&SignalRecord> {
        self.signals.get(signal.index())
    }

    /// Looks up a record by identifier code.
    pub fn lookup_id(&self, id: &str) -> Option<&SignalRecord> {
        self.id_lookup.get(id).map(|s| &self[*s])
    }

    /// Looks up a record by any of its full reference names.
    pub fn lookup_reference(&self, reference: &str) -> Option<&SignalRecord> {
        self.lookup_reference_ref(reference).map(|s| &self[s])
    }

    pub fn lookup_reference_ref(&self, reference: &str) -> Option<SignalRef> {
        self.reference_lookup.get(reference).cloned()
    }

    pub fn signal_names(&self) -> &[String] {
        &self.signal_names
    }

    /// Value of the last time marker in the file. This can be later than the last change.
    pub fn end_time(&self) -> Time {
        self.end_time
    }

    pub fn into_signals(self) -> Vec<SignalRecord> {
        self.signals
    }

    fn add_var(&mut self, id: &str, var_type: &str, width: &str, reference: String) -> Result<()> {
        let signal = match self.id_lookup.get(id) {
            Some(signal) => *signal,
            None => {
                let signal = SignalRef::from_index(self.signals.len())
                    .ok_or(VcdParseError::VcdTooManySignals)?;
                self.signals.push(SignalRecord::new(
                    id.to_string(),
                    var_type.to_string(),
                    width.to_string(),
                ));
                self.id_lookup.insert(id.to_string(), signal);
                signal
            }
        };
        self.signals[signal.index()]
            .references
            .push(reference.clone());
        self.reference_lookup.insert(reference.clone(), signal);
        self.signal_names.push(reference);
        Ok(())
    }
}

impl Index<SignalRef> for VcdData {
    type Output = SignalRecord;

    fn index(&self, index: SignalRef) -> &Self::Output {
        &self.signals[index.index()]
    }
}

pub fn read_from_file<P: AsRef<std::path::Path>>(
    filename: P,
    options: &ParseOptions,
) -> Result<VcdData> {
    read_from_file_with_observer(filename, options, &mut ())
}

pub fn read_from_file_with_observer<P: AsRef<std::path::Path>>(
    filename: P,
    options: &ParseOptions,
    out: &mut impl ChangeObserver,
) -> Result<VcdData> {
    let input_file = std::fs::File::open(filename)?;
    // empty files cannot be mapped
    if input_file.metadata()?.len() == 0 {
        return read_from_str_with_observer("", options, out);
    }
    let mmap = unsafe { memmap2::Mmap::map(&input_file)? };
    let input = std::str::from_utf8(&mmap[..])?;
    read_from_str_with_observer(input, options, out)
}

pub fn read_from_str(input: &str, options: &ParseOptions) -> Result<VcdData> {
    read_from_str_with_observer(input, options, &mut ())
}

#[instrument(level = "debug", skip_all, fields(len = input.len()))]
pub fn read_from_str_with_observer(
    input: &str,
    options: &ParseOptions,
    out: &mut impl ChangeObserver,
) -> Result<VcdData> {
    let filter: Option<FxHashSet<&str>> = options
        .signal_filter
        .as_ref()
        .map(|names| names.iter().map(|n| n.as_str()).collect());
    let store_changes = options.store_changes && !options.signals_only;

    let mut data = VcdData::default();
    let mut scope_stack: Vec<String> = Vec::new();
    let mut time: Time = 0;
    let mut in_text_block = false;

    for (ii, raw_line) in input.lines().enumerate() {
        let line_no = ii + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        // the text of `$comment`, `$date`, `$version` and `$timescale` may span several lines
        if in_text_block {
            if find_tokens(line).contains(&VCD_END) {
                in_text_block = false;
            }
            continue;
        }

        match line.as_bytes()[0] {
            b'b' | b'B' | b'r' | b'R' => {
                let tokens = find_tokens(&line[1..]);
                if tokens.len() != 2 {
                    return Err(VcdParseError::VcdValueChange(line_no, line.to_string()));
                }
                value_change(&mut data, tokens[1], tokens[0], time, store_changes, out)?;
            }
            b'0' | b'1' | b'x' | b'X' | b'z' | b'Z' => {
                let (value, id) = line.split_at(1);
                value_change(&mut data, id.trim(), value, time, store_changes, out)?;
            }
            b'#' => {
                let new_time = parse_time(&line[1..])
                    .ok_or_else(|| VcdParseError::VcdTimeParsing(line_no, line.to_string()))?;
                out.time_change(time, new_time, &data)?;
                time = new_time;
                data.end_time = new_time;
            }
            _ => {
                let tokens = find_tokens(line);
                match find_command(&tokens) {
                    Some((VcdCmd::EndDefinitions, _)) => {
                        out.definitions_done(&data)?;
                        if options.signals_only {
                            break;
                        }
                    }
                    Some((VcdCmd::Scope, pos)) => {
                        let name = tokens[pos + 1..]
                            .get(1)
                            .filter(|name| **name != VCD_END)
                            .ok_or_else(|| unexpected_n_tokens(line_no, "scope", &tokens))?;
                        scope_stack.push(name.to_string());
                    }
                    Some((VcdCmd::UpScope, _)) => {
                        scope_stack
                            .pop()
                            .ok_or(VcdParseError::VcdScopeUnderflow(line_no))?;
                    }
                    Some((VcdCmd::Var, pos)) => {
                        let fields = strip_end_token(&tokens[pos + 1..]);
                        if fields.len() < 4 {
                            return Err(unexpected_n_tokens(line_no, "variable", &tokens));
                        }
                        let (var_type, width, id) = (fields[0], fields[1], fields[2]);
                        // names like `data [7:0]` are split over several tokens
                        let name = fields[3..].concat();
                        if width.parse::<u32>().is_err() {
                            return Err(VcdParseError::VcdVarLengthParsing(
                                line_no,
                                width.to_string(),
                                name,
                            ));
                        }
                        let reference = full_reference(&scope_stack, &name);
                        let selected = filter
                            .as_ref()
                            .map(|f| f.contains(reference.as_str()))
                            .unwrap_or(true);
                        if selected {
                            data.add_var(id, var_type, width, reference)?;
                        }
                    }
                    Some((VcdCmd::TextBlock, pos)) => {
                        in_text_block = pos == 0 && !tokens.contains(&VCD_END);
                    }
                    // Also covers `$dumpvars`, `$dumpon` etc. Values written on the same
                    // line as such a command (`$dumpvars 1! $end`) are dropped, only
                    // changes on lines of their own are recorded.
                    None => {}
                }
            }
        }
    }

    if !scope_stack.is_empty() {
        return Err(VcdParseError::VcdUnclosedScopes(scope_stack.join(".")));
    }
    out.finish(time, &data)?;
    debug!(
        signals = data.len(),
        references = data.signal_names.len(),
        end_time = data.end_time,
        "parsed VCD"
    );
    Ok(data)
}

#[inline]
fn value_change(
    data: &mut VcdData,
    id: &str,
    value: &str,
    time: Time,
    store_changes: bool,
    out: &mut impl ChangeObserver,
) -> Result<()> {
    let signal = match data.id_lookup.get(id) {
        Some(signal) => *signal,
        None => {
            trace!(id, time, "ignoring value change of undeclared id");
            return Ok(());
        }
    };
    out.value_change(signal, time, value, data)?;
    if store_changes {
        data.signals[signal.index()].changes.push(Change {
            time,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Joins the open scopes and the variable name with `.`.
fn full_reference(scope_stack: &[String], name: &str) -> String {
    if scope_stack.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope_stack.join("."), name)
    }
}

/// Time markers are integers, but some generators (e.g. Migen) emit `#10.0`.
fn parse_time(value: &str) -> Option<Time> {
    let value = value.trim();
    match value.parse::<u64>() {
        Ok(time) => Some(time),
        Err(_) => {
            let float = value.parse::<f64>().ok()?;
            // `u64::MAX as f64` rounds up to 2^64, which does not fit
            if float.fract() == 0.0 && float >= 0.0 && float < u64::MAX as f64 {
                Some(float as u64)
            } else {
                None
            }
        }
    }
}

const VCD_END: &str = "$end";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum VcdCmd {
    EndDefinitions,
    Scope,
    UpScope,
    Var,
    /// `$comment`, `$date`, `$version` or `$timescale`
    TextBlock,
}

const VCD_COMMANDS: [(&str, VcdCmd); 8] = [
    ("$enddefinitions", VcdCmd::EndDefinitions),
    ("$scope", VcdCmd::Scope),
    ("$upscope", VcdCmd::UpScope),
    ("$var", VcdCmd::Var),
    ("$comment", VcdCmd::TextBlock),
    ("$date", VcdCmd::TextBlock),
    ("$version", VcdCmd::TextBlock),
    ("$timescale", VcdCmd::TextBlock),
];

/// Finds the first known command on a line and returns its token position.
fn find_command(tokens: &[&str]) -> Option<(VcdCmd, usize)> {
    VCD_COMMANDS.iter().find_map(|(name, cmd)| {
        tokens
            .iter()
            .position(|t| t == name)
            .map(|pos| (*cmd, pos))
    })
}

#[inline]
fn find_tokens(line: &str) -> Vec<&str> {
    line.split_ascii_whitespace().collect()
}

#[inline]
fn strip_end_token<'a, 'b>(mut tokens: &'b [&'a str]) -> &'b [&'a str] {
    while tokens.last() == Some(&VCD_END) {
        tokens = &tokens[..tokens.len() - 1];
    }
    tokens
}

#[inline]
fn unexpected_n_tokens(line_no: usize, cmd: &str, tokens: &[&str]) -> VcdParseError {
    VcdParseError::VcdUnexpectedNumberOfTokens(line_no, cmd.to_string(), tokens.join(", "))
}
