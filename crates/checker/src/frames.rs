//! Frame bookkeeping
//!
//! One analyzed function activation ("frame") accumulates a row of return
//! sites until its outcome is decided, at which point the row flushes as a
//! single trace line. Rows, sites, counter snapshots, and status all live
//! in keyed program-state tables so that a path branch clones in constant
//! time and siblings never see each other's appends.
//!
//! Keys are the host-reported stack depth, or (depth, index) for the
//! ordered sites within one frame. Records carry a monotonic per-path tick
//! so that otherwise-identical records stay distinguishable.

use crate::symvals::CurrentSymbolValue;
use retrace_core::{CheckerContext, ProgramState, SVal, StateMap, StateSlot, SymbolId};
use std::fmt::Write as _;

/// One row per stack depth: how many sites were appended, and whether the
/// frame has already been flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackRow {
    pub entries: u32,
    pub printed: bool,
}

/// Counter snapshot taken when a frame saw its first event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRecord {
    pub count: u64,
    pub depth: u32,
}

/// Per-depth emission status: `seen` flips when an interesting callee is
/// first observed, `printed` when the frame commits to a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleStatus {
    pub printed: bool,
    pub seen: bool,
    pub depth: u32,
}

/// Record of one interesting call's return, pending flush.
///
/// When the value was exactly known at PostCall the text is frozen here;
/// otherwise the symbol identity is kept and the live description is
/// fetched from the symbol table at flush time.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSite {
    tick: u64,
    callee: String,
    location: String,
    depth: u32,
    length_at_entry: u64,
    fixed: bool,
    fixed_text: String,
    value_symbol: Option<SymbolId>,
}

impl ReturnSite {
    pub fn new(
        tick: u64,
        callee: String,
        location: String,
        depth: u32,
        length_at_entry: u64,
        val: &CurrentSymbolValue,
        ctx: &CheckerContext<'_>,
    ) -> Self {
        let fixed = val.is_known();
        let mut fixed_text = String::new();
        let mut value_symbol = None;
        if fixed {
            val.print(&mut fixed_text, ctx);
        } else {
            value_symbol = val.symbolic_value().and_then(SVal::as_symbol);
        }
        ReturnSite {
            tick,
            callee,
            location,
            depth,
            length_at_entry,
            fixed,
            fixed_text,
            value_symbol,
        }
    }

    pub fn length_at_entry(&self) -> u64 {
        self.length_at_entry
    }

    pub fn value_symbol(&self) -> Option<SymbolId> {
        self.value_symbol
    }

    /// Append `[#N@]callee location;value`, where `N` is the counted units
    /// since the previous anchor and the `#N@` prefix is omitted for the
    /// first entry of a frame.
    pub fn print(
        &self,
        out: &mut String,
        base: u64,
        first: bool,
        live: Option<&CurrentSymbolValue>,
        ctx: &CheckerContext<'_>,
    ) {
        if !first {
            let _ = write!(out, "#{}@", self.length_at_entry.saturating_sub(base));
        }
        out.push_str(&self.callee);
        out.push(' ');
        out.push_str(&self.location);
        out.push(';');
        if self.fixed {
            out.push_str(&self.fixed_text);
        } else if let Some(live) = live {
            live.print(out, ctx);
        }
    }
}

/// depth -> row of appended sites
pub(crate) enum StackRows {}
impl StateMap for StackRows {
    type Key = u32;
    type Value = StackRow;
}

/// (depth, index) -> recorded return site
pub(crate) enum ReturnSites {}
impl StateMap for ReturnSites {
    type Key = (u32, u32);
    type Value = ReturnSite;
}

/// depth -> counter snapshot at frame entry
pub(crate) enum LengthStack {}
impl StateMap for LengthStack {
    type Key = u32;
    type Value = LengthRecord;
}

/// depth -> (printed, seen) status
pub(crate) enum SimpleStack {}
impl StateMap for SimpleStack {
    type Key = u32;
    type Value = SimpleStatus;
}

/// Counted units (calls or statements) in the currently running frame.
pub(crate) enum TopCount {}
impl StateSlot for TopCount {
    type Value = u64;
}

/// Whether the current frame's entry snapshot has been taken.
pub(crate) enum StartedCaller {}
impl StateSlot for StartedCaller {
    type Value = bool;
}

/// Monotonic per-path record uniquifier.
pub(crate) enum TickSlot {}
impl StateSlot for TickSlot {
    type Value = u64;
}

/// Allocate the next record tick on this path.
pub(crate) fn take_tick(state: &ProgramState) -> (u64, ProgramState) {
    let tick = state.slot::<TickSlot>();
    (tick, state.set_slot::<TickSlot>(tick + 1))
}
