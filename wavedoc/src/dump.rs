// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Prints values while a VCD is being parsed, either as a list of changes or as a table.

use crate::signals::{SignalRef, Time};
use crate::vcd::{ChangeObserver, Result, VcdData};
use rustc_hash::FxHashMap;
use std::io::Write;

#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Print `<time> <value> <name>` for every change.
    pub deltas: bool,
    /// Print a table with one column per signal and one row per time step.
    pub dumps: bool,
    /// Only print a table row if at least one signal changed during the time step.
    pub dumps_deltas: bool,
    /// Columns of the table, in order. Defaults to all signals sorted by name.
    pub signals: Option<Vec<String>>,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            deltas: false,
            dumps: false,
            dumps_deltas: true,
            signals: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Column {
    signal: SignalRef,
    width: usize,
}

/// A [`ChangeObserver`] that writes the values it sees to `out`.
pub struct ValueDump<W: Write> {
    out: W,
    options: DumpOptions,
    columns: Vec<Column>,
    /// latest value of every signal, only tracked for tables
    current: FxHashMap<SignalRef, String>,
    changed: bool,
}

impl<W: Write> ValueDump<W> {
    pub fn new(out: W, options: DumpOptions) -> Self {
        Self {
            out,
            options,
            columns: Vec::new(),
            current: FxHashMap::default(),
            changed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_row(&mut self, time: Time) -> Result<()> {
        if !self.options.dumps || (self.options.dumps_deltas && !self.changed) {
            return Ok(());
        }
        write!(self.out, "{time}")?;
        for column in self.columns.iter() {
            let value = self
                .current
                .get(&column.signal)
                .map(|v| to_hex(v))
                .unwrap_or_else(|| "x".to_string());
            write!(self.out, " {:>width$}", value, width = column.width)?;
        }
        writeln!(self.out)?;
        Ok(())
    }
}

impl<W: Write> ChangeObserver for ValueDump<W> {
    fn definitions_done(&mut self, data: &VcdData) -> Result<()> {
        if !self.options.dumps {
            return Ok(());
        }
        for signal in data.signal_refs() {
            self.current.insert(signal, "x".to_string());
        }

        let names = match &self.options.signals {
            Some(names) => names.clone(),
            None => {
                let mut names: Vec<String> = data
                    .iter()
                    .flat_map(|s| s.first_reference())
                    .map(|s| s.to_string())
                    .collect();
                names.sort();
                names
            }
        };

        writeln!(self.out, "0 time")?;
        let mut indices = Vec::with_capacity(names.len());
        for (ii, name) in names.iter().enumerate() {
            let index = ii + 1;
            writeln!(self.out, "{index} {name}")?;
            if let Some(signal) = data.lookup_reference_ref(name) {
                let hex_digits = (data[signal].bit_width() / 4) as usize;
                let width = std::cmp::max(hex_digits, index.to_string().len());
                self.columns.push(Column { signal, width });
                indices.push(index);
            }
        }
        writeln!(self.out)?;
        write!(self.out, "0 ")?;
        for (index, column) in indices.iter().zip(self.columns.iter()) {
            write!(self.out, "{:>width$} ", index, width = column.width)?;
        }
        writeln!(self.out)?;
        let total: usize = self.columns.iter().map(|c| c.width).sum();
        writeln!(self.out, "{}", "=".repeat(total + self.columns.len() + 1))?;
        Ok(())
    }

    fn time_change(&mut self, old: Time, _new: Time, _data: &VcdData) -> Result<()> {
        self.write_row(old)?;
        self.changed = false;
        Ok(())
    }

    fn value_change(
        &mut self,
        signal: SignalRef,
        time: Time,
        value: &str,
        data: &VcdData,
    ) -> Result<()> {
        self.changed = true;
        if self.options.deltas {
            let name = data[signal].first_reference().unwrap_or_default();
            writeln!(self.out, "{} {} {}", time, to_hex(value), name)?;
        }
        if self.options.dumps {
            self.current.insert(signal, value.to_string());
        }
        Ok(())
    }

    fn finish(&mut self, time: Time, _data: &VcdData) -> Result<()> {
        self.write_row(time)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Converts a binary value into lower case hex.
/// Values that are not purely binary are represented by their first non-binary character.
pub fn to_hex(value: &str) -> String {
    if let Some(c) = value.chars().find(|c| !matches!(c, '0' | '1')) {
        return c.to_string();
    }
    let bits = value.as_bytes();
    // the first nibble may be incomplete
    let first_len = match bits.len() % 4 {
        0 => 4,
        n => n,
    };
    let mut out = String::with_capacity(bits.len() / 4 + 1);
    let mut start = 0;
    let mut end = std::cmp::min(first_len, bits.len());
    while start < bits.len() {
        let nibble = bits[start..end]
            .iter()
            .fold(0u32, |acc, b| (acc << 1) | (*b - b'0') as u32);
        if !(out.is_empty() && nibble == 0) {
            out.push(std::char::from_digit(nibble, 16).unwrap_or('?'));
        }
        start = end;
        end += 4;
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcd::read_from_str_with_observer;
    use crate::ParseOptions;

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex("0"), "0");
        assert_eq!(to_hex("1"), "1");
        assert_eq!(to_hex("1010"), "a");
        assert_eq!(to_hex("11111"), "1f");
        assert_eq!(to_hex("00000001"), "1");
        assert_eq!(to_hex("0000"), "0");
        assert_eq!(to_hex("10x1"), "x");
        assert_eq!(to_hex("z"), "z");
        assert_eq!(to_hex("1.5"), ".");
        assert_eq!(to_hex(""), "0");
        let wide = "1".repeat(130);
        assert_eq!(to_hex(&wide), format!("3{}", "f".repeat(32)));
    }

    const INPUT: &str = "$scope module top $end
$var wire 1 ! clk $end
$var wire 8 \" data $end
$upscope $end
$enddefinitions $end
#0
0!
b00000000 \"
#5
1!
#7
#10
b11111111 \"
";

    fn dump(options: DumpOptions) -> String {
        let mut dump = ValueDump::new(Vec::new(), options);
        read_from_str_with_observer(INPUT, &ParseOptions::default(), &mut dump).unwrap();
        String::from_utf8(dump.into_inner()).unwrap()
    }

    #[test]
    fn test_deltas() {
        let out = dump(DumpOptions {
            deltas: true,
            ..Default::default()
        });
        let expected = "0 0 top.clk\n0 0 top.data\n5 1 top.clk\n10 ff top.data\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_dumps_table() {
        let out = dump(DumpOptions {
            dumps: true,
            ..Default::default()
        });
        let expected = "0 time\n1 top.clk\n2 top.data\n\n0 1  2 \n======\n0 0  0\n5 1  0\n10 1 ff\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_dumps_every_step() {
        let out = dump(DumpOptions {
            dumps: true,
            dumps_deltas: false,
            signals: Some(vec!["top.data".to_string()]),
            ..Default::default()
        });
        let expected = "0 time\n1 top.data\n\n0  1 \n====\n0  x\n0  0\n5  0\n7  0\n10 ff\n";
        assert_eq!(out, expected);
    }
}
