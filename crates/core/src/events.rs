//! Host events and the checker callback surface
//!
//! The host owns path exploration; checkers see it as a stream of events,
//! each carrying a `CheckerContext` snapshot of the current path. A handler
//! returns `Some(state)` to hand the host a new continuation for this path,
//! or `None` when nothing changed.

use crate::constraints::ConstraintQuery;
use crate::state::ProgramState;
use crate::types::TypeTag;
use crate::value::{SVal, SymbolId};
use std::collections::BTreeSet;
use std::fmt;

/// A source location, printed as `path:line:col`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl SourceLoc {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        SourceLoc {
            file: file.into(),
            line,
            col,
        }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// One call observed by the host, delivered at PreCall and PostCall.
#[derive(Debug, Clone)]
pub struct CallEvent {
    /// Callee name, if the host resolved one. Indirect calls without a
    /// resolvable callee carry `None` and are invisible to checkers.
    pub callee: Option<String>,
    /// Argument values with their declared types, in call order.
    pub args: Vec<(SVal, TypeTag)>,
    /// Declared result type of the callee.
    pub result_type: TypeTag,
    /// The call's return value. Meaningful at PostCall; conjured symbols
    /// stay symbolic until the path constrains them.
    pub return_value: SVal,
    /// Location of the call's origin expression, if known.
    pub location: Option<SourceLoc>,
}

impl CallEvent {
    /// Printable call-site location; empty when the origin is unknown.
    pub fn location_string(&self) -> String {
        self.location
            .as_ref()
            .map(SourceLoc::to_string)
            .unwrap_or_default()
    }
}

/// A `return` statement about to execute.
#[derive(Debug, Clone)]
pub struct ReturnEvent {
    /// Value of the return expression; `None` for a bare `return`.
    pub value: Option<SVal>,
    /// The returning function's declared return type.
    pub return_type: TypeTag,
    /// Location of the return expression, or of the `return` keyword when
    /// the statement is bare.
    pub location: SourceLoc,
}

/// The set of symbols whose constraints are about to be garbage-collected.
#[derive(Debug, Clone, Default)]
pub struct SymbolReaper {
    dead: BTreeSet<SymbolId>,
}

impl SymbolReaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dead(&mut self, sym: SymbolId) {
        self.dead.insert(sym);
    }

    pub fn dead(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.dead.iter().copied()
    }

    pub fn is_dead(&self, sym: SymbolId) -> bool {
        self.dead.contains(&sym)
    }
}

/// Snapshot of the current path handed to every callback.
pub struct CheckerContext<'a> {
    state: &'a ProgramState,
    constraints: &'a dyn ConstraintQuery,
    stack_depth: u32,
    function: &'a str,
}

impl<'a> CheckerContext<'a> {
    /// `stack_depth` is the distance from the outermost function under
    /// analysis; the outermost frame reports depth 1.
    pub fn new(
        state: &'a ProgramState,
        constraints: &'a dyn ConstraintQuery,
        stack_depth: u32,
        function: &'a str,
    ) -> Self {
        CheckerContext {
            state,
            constraints,
            stack_depth,
            function,
        }
    }

    pub fn state(&self) -> &ProgramState {
        self.state
    }

    pub fn constraints(&self) -> &dyn ConstraintQuery {
        self.constraints
    }

    pub fn stack_depth(&self) -> u32 {
        self.stack_depth
    }

    /// Name of the function whose frame is currently on top.
    pub fn function(&self) -> &str {
        self.function
    }
}

/// The callback surface a path-sensitive checker exposes to the host.
///
/// Every handler is optional; the default observes and changes nothing.
/// `pre_stmt` only fires when the host was asked to report statements.
pub trait PathChecker {
    fn pre_call(&self, _call: &CallEvent, _ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        None
    }

    fn post_call(&self, _call: &CallEvent, _ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        None
    }

    fn pre_stmt(&self, _ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        None
    }

    fn pre_return(&self, _ret: &ReturnEvent, _ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        None
    }

    fn dead_symbols(&self, _reaper: &SymbolReaper, _ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        None
    }

    fn end_function(&self, _ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = SourceLoc::new("src/io.c", 42, 7);
        assert_eq!(loc.to_string(), "src/io.c:42:7");
    }

    #[test]
    fn test_missing_call_location_is_empty() {
        let call = CallEvent {
            callee: Some("f".into()),
            args: Vec::new(),
            result_type: TypeTag::Int,
            return_value: SVal::Unknown,
            location: None,
        };
        assert_eq!(call.location_string(), "");
    }

    #[test]
    fn test_reaper() {
        let mut reaper = SymbolReaper::new();
        reaper.mark_dead(SymbolId(2));
        reaper.mark_dead(SymbolId(1));
        assert!(reaper.is_dead(SymbolId(1)));
        assert!(!reaper.is_dead(SymbolId(3)));
        let dead: Vec<_> = reaper.dead().collect();
        assert_eq!(dead, vec![SymbolId(1), SymbolId(2)]);
    }
}
