// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use std::num::NonZeroU32;

pub type Time = u64;

/// Index of a signal record inside of [`crate::VcdData`].
/// Every identifier code in a VCD maps to exactly one `SignalRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalRef(NonZeroU32);

impl SignalRef {
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        let value = u32::try_from(index).ok()?.checked_add(1)?;
        NonZeroU32::new(value).map(Self)
    }

    #[inline]
    pub fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub time: Time,
    pub value: String,
}

/// Everything we know about one identifier code: its declaration(s) and its value changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRecord {
    pub(crate) id: String,
    /// Full names of all variables that share this id, in declaration order.
    pub(crate) references: Vec<String>,
    pub(crate) var_type: String,
    pub(crate) width: String,
    pub(crate) changes: Vec<Change>,
}

impl SignalRecord {
    pub(crate) fn new(id: String, var_type: String, width: String) -> Self {
        Self {
            id,
            references: Vec::new(),
            var_type,
            width,
            changes: Vec::new(),
        }
    }

    /// The identifier code used in the value change section.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// The reference that is used to place the signal in a document.
    pub fn first_reference(&self) -> Option<&str> {
        self.references.first().map(|r| r.as_str())
    }

    /// Variable kind exactly as declared, e.g. `wire` or `reg`.
    pub fn var_type(&self) -> &str {
        &self.var_type
    }

    /// Bit width as it appears in the `$var` declaration.
    pub fn width(&self) -> &str {
        &self.width
    }

    /// The width as a number. The parser validates the width, so this is only `0`
    /// for records that were constructed by hand.
    pub fn bit_width(&self) -> u32 {
        self.width.parse().unwrap_or(0)
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn last_change_time(&self) -> Option<Time> {
        self.changes.last().map(|c| c.time)
    }
}
