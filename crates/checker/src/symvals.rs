//! Symbol value table
//!
//! A recorded return value may still be symbolic when its frame flushes, in
//! which case it must be rendered under whatever constraints the path has
//! accumulated by then. Worse, the host garbage-collects constraints for
//! dead symbols, so DeadSymbols is the last chance to render such a value;
//! the snapshot taken there is frozen and later observations never see
//! further refinement.
//!
//! Table membership is refcounted: each unflushed return site referring to
//! a symbol holds one reference, and the entry leaves the table when the
//! last reference is released at flush. The refcount exists for membership,
//! not memory - without it, long-dead symbols would leak into later
//! DeadSymbols sweeps.

use crate::frames::take_tick;
use crate::printer::print_value;
use retrace_core::{CheckerContext, ProgramState, SVal, StateMap, SymbolId, TypeTag};

/// Last-known printable description of one symbol.
///
/// `known` latches: it starts false for a live symbolic value and flips to
/// true exactly once, either at construction (fixed or dying value) or at
/// DeadSymbols finalization. Once true, `text` is authoritative and the
/// value handle is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSymbolValue {
    tick: u64,
    tag: TypeTag,
    known: bool,
    text: String,
    value: Option<SVal>,
}

impl CurrentSymbolValue {
    /// Capture `value`: render immediately when it is fixed or about to
    /// die, otherwise keep the handle for late resolution.
    pub fn capture(
        tick: u64,
        tag: TypeTag,
        value: &SVal,
        ctx: &CheckerContext<'_>,
        alive: bool,
    ) -> Self {
        if !value.is_fixed() && alive {
            CurrentSymbolValue {
                tick,
                tag,
                known: false,
                text: String::new(),
                value: Some(value.clone()),
            }
        } else {
            let mut text = String::new();
            print_value(&mut text, value, tag, ctx);
            CurrentSymbolValue {
                tick,
                tag,
                known: true,
                text,
                value: None,
            }
        }
    }

    pub fn is_known(&self) -> bool {
        self.known
    }

    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    /// The live value handle; present exactly when `known` is false.
    pub fn symbolic_value(&self) -> Option<&SVal> {
        self.value.as_ref()
    }

    /// Append the printable form: the frozen text when known, a fresh
    /// render under the current constraints otherwise.
    pub fn print(&self, out: &mut String, ctx: &CheckerContext<'_>) {
        if self.known {
            out.push_str(&self.text);
        } else if let Some(value) = &self.value {
            print_value(out, value, self.tag, ctx);
        }
    }
}

/// symbol -> last-known printable description
pub(crate) enum SymbolValues {}
impl StateMap for SymbolValues {
    type Key = SymbolId;
    type Value = CurrentSymbolValue;
}

/// symbol -> number of unflushed return sites referring to it
pub(crate) enum SymbolRefCounts {}
impl StateMap for SymbolRefCounts {
    type Key = SymbolId;
    type Value = u32;
}

/// Take a reference on the symbol behind `val`, installing the table entry
/// on the first reference. Fully-known values need no tracking.
pub(crate) fn acquire(state: &ProgramState, val: &CurrentSymbolValue) -> ProgramState {
    if val.is_known() {
        return state.clone();
    }
    let Some(sym) = val.symbolic_value().and_then(SVal::as_symbol) else {
        return state.clone();
    };
    match state.get::<SymbolRefCounts>(&sym) {
        None => state
            .set::<SymbolRefCounts>(sym, 1)
            .set::<SymbolValues>(sym, val.clone()),
        Some(&n) => state.set::<SymbolRefCounts>(sym, n + 1),
    }
}

/// Drop one reference; the last reference removes both table entries.
pub(crate) fn release(state: &ProgramState, sym: SymbolId) -> ProgramState {
    match state.get::<SymbolRefCounts>(&sym) {
        Some(&n) if n > 1 => state.set::<SymbolRefCounts>(sym, n - 1),
        Some(_) => state
            .remove::<SymbolRefCounts>(&sym)
            .remove::<SymbolValues>(&sym),
        None => state.clone(),
    }
}

/// Replace `sym`'s entry with a frozen render under the current
/// constraints. Returns `None` when the symbol is untracked or already
/// finalized; finalization never runs twice.
pub(crate) fn finalize(
    state: &ProgramState,
    sym: SymbolId,
    ctx: &CheckerContext<'_>,
) -> Option<ProgramState> {
    let old = state.get::<SymbolValues>(&sym)?;
    if old.is_known() {
        return None;
    }
    let value = old.symbolic_value()?.clone();
    let tag = old.type_tag();
    let (tick, state) = take_tick(state);
    let snapshot = CurrentSymbolValue::capture(tick, tag, &value, ctx, false);
    Some(state.set::<SymbolValues>(sym, snapshot))
}
