//! Event handlers
//!
//! The checker is stateless between events: everything per-path lives in
//! the host's `ProgramState` tables declared in `frames` and `symvals`.
//! PreCall opens the frame, watches for exit functions, and reserves a row
//! slot for interesting callees; PostCall fills the slot with the observed
//! return value; DeadSymbols freezes values whose constraints are about to
//! disappear; PreReturn and EndFunction flush the frame. The flush is the
//! single emitter and runs at most once per frame - a `printed` latch makes
//! the second of PreReturn/EndFunction a no-op.
//!
//! Segment lengths count completed calls (or, with the `stmt-count`
//! feature, statements). A call is counted when it returns, so a call that
//! terminates the program is never counted and every printed segment
//! length stays positive.

use crate::config::FunctionSets;
use crate::frames::{
    LengthRecord, LengthStack, ReturnSite, ReturnSites, SimpleStack, SimpleStatus, StackRow,
    StackRows, StartedCaller, TopCount, take_tick,
};
use crate::output::TraceLog;
use crate::printer::{VOID_TEXT, value_text};
use crate::symvals::{self, CurrentSymbolValue, SymbolValues};
use retrace_core::{
    CallEvent, CheckerContext, PathChecker, ProgramState, ReturnEvent, SVal, SymbolReaper, TypeTag,
};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Location stamped on frames that end without a return site.
const END_LOC: &str = "function_end:0:0";
/// Synthesized outcome for argument-less exit calls.
const EXIT_DUMMY: &str = "I&abort_return:=-1";
/// Suffix marking termination by exit call.
const EXIT_MARKER: &str = "$";

/// Build-time counting mode: statements when the `stmt-count` feature is
/// on, completed calls otherwise.
const COUNT_STATEMENTS: bool = cfg!(feature = "stmt-count");

/// The trace-mining checker.
///
/// Holds only process-wide state: the configured function sets (read-only
/// after construction) and the append-only trace log.
pub struct Checker {
    sets: FunctionSets,
    log: Arc<TraceLog>,
}

impl Checker {
    pub fn new(sets: FunctionSets, log: Arc<TraceLog>) -> Self {
        Checker { sets, log }
    }

    /// Standard startup sequence: load the function list from the
    /// working directory, open the randomized log file (redirecting
    /// stderr into it), and emit the startup banner.
    ///
    /// Config diagnostics go to whatever stderr is at load time, before
    /// the redirect, so a missing file is reported on the console.
    pub fn from_working_dir() -> Result<Self, String> {
        let sets = match FunctionSets::load(Path::new(crate::config::CONFIG_FILE)) {
            Ok(sets) => {
                eprintln!("Success:");
                eprintln!("{} normal functions added", sets.interesting_count());
                eprintln!("{} exit functions added", sets.exit_count());
                eprintln!();
                sets
            }
            Err(e) => {
                let cwd = std::env::current_dir().unwrap_or_default();
                eprintln!(
                    "Failed to load {}/{}",
                    cwd.display(),
                    crate::config::CONFIG_FILE
                );
                eprintln!();
                warn!(error = %e, "config load failed; tracking all typed returns");
                FunctionSets::new()
            }
        };
        let (log, path) = TraceLog::open_randomized()?;
        log.banner();
        debug!(file = %path.display(), "checker initialized");
        Ok(Checker::new(sets, Arc::new(log)))
    }

    pub fn function_sets(&self) -> &FunctionSets {
        &self.sets
    }

    /// Whether `callee`'s return should be recorded in the current frame.
    fn care_function(&self, callee: &str, call: &CallEvent) -> bool {
        self.sets.is_interesting(callee) && call.result_type.is_tracked()
    }

    /// Take the frame's entry snapshot if it has not been taken yet.
    /// Idempotent: a started frame passes through unchanged.
    fn caller_start(
        &self,
        ctx: &CheckerContext<'_>,
        state: &ProgramState,
        count: u64,
    ) -> Option<ProgramState> {
        if state.slot::<StartedCaller>() {
            return None;
        }
        let depth = ctx.stack_depth();
        let state = state.set::<LengthStack>(depth, LengthRecord { count, depth });
        Some(state.set_slot::<StartedCaller>(true))
    }

    /// Flush the current frame: render its return sites in append order,
    /// release their symbol references, append the frame's own outcome,
    /// and emit one framed line. Runs at most once per frame; a second
    /// invocation sees the `printed` row and changes nothing.
    fn caller_end(
        &self,
        ret_text: &str,
        ctx: &CheckerContext<'_>,
        loc: &str,
        state: Option<&ProgramState>,
        exit: bool,
    ) -> Option<ProgramState> {
        let mut state = state.cloned().unwrap_or_else(|| ctx.state().clone());
        let depth = ctx.stack_depth();
        let top = state.slot::<TopCount>();
        let mut changed_status = false;

        let status = state.get::<SimpleStack>(&depth).copied();
        if let Some(status) = status
            && !status.printed
            && status.seen
        {
            state = state.set::<SimpleStack>(
                depth,
                SimpleStatus {
                    printed: true,
                    seen: true,
                    depth,
                },
            );
            changed_status = true;
        }

        let row = state.get::<StackRows>(&depth).copied();
        let n_sites = match row {
            Some(row) if !row.printed => row.entries,
            _ => return changed_status.then_some(state),
        };
        debug_assert!(
            matches!(row, Some(row) if !row.printed),
            "flush reached with printed frame"
        );

        let mut base = match state.get::<LengthStack>(&depth) {
            Some(rec) => rec.count,
            None if depth == 1 => 0,
            None => return changed_status.then_some(state),
        };

        let mut body = String::new();
        let mut first = true;
        for index in 0..n_sites {
            let key = (depth, index);
            let Some(site) = state.get::<ReturnSites>(&key).cloned() else {
                // Reserved slot that never saw its PostCall (the callee
                // terminated the program); nothing to render.
                continue;
            };
            let live = site
                .value_symbol()
                .and_then(|sym| state.get::<SymbolValues>(&sym))
                .cloned();
            site.print(&mut body, base, first, live.as_ref(), ctx);
            first = false;
            state = state.remove::<ReturnSites>(&key);
            base = site.length_at_entry();
            if let Some(sym) = site.value_symbol()
                && live.is_some()
            {
                state = symvals::release(&state, sym);
            }
        }

        state = state.set::<StackRows>(
            depth,
            StackRow {
                entries: 0,
                printed: true,
            },
        );

        let _ = write!(
            body,
            "#{}@{} {};{}",
            top.saturating_sub(base),
            ctx.function(),
            loc,
            ret_text
        );
        if exit {
            body.push_str(EXIT_MARKER);
        }
        self.log.line(&body);
        Some(state)
    }

    /// Render a typed outcome and flush. Untracked return types (void
    /// included) collapse to the bare void token.
    fn caller_end_typed(
        &self,
        value: &SVal,
        tag: TypeTag,
        ctx: &CheckerContext<'_>,
        loc: &str,
        state: Option<&ProgramState>,
        exit: bool,
    ) -> Option<ProgramState> {
        let text = if tag.is_tracked() {
            value_text(value, tag, ctx)
        } else {
            VOID_TEXT.to_string()
        };
        self.caller_end(&text, ctx, loc, state, exit)
    }

    /// If `callee` terminates the program, flush the current frame now,
    /// marked as an exit. The outcome is the first argument's value, or a
    /// synthesized `-1` for argument-less terminators like `abort`.
    fn check_exit(
        &self,
        call: &CallEvent,
        ctx: &CheckerContext<'_>,
        state: &ProgramState,
        callee: &str,
        loc: &str,
    ) -> Option<ProgramState> {
        if !self.sets.is_exit(callee) {
            return None;
        }
        debug!(callee, depth = ctx.stack_depth(), "exit call");
        match call.args.first() {
            None => self.caller_end(EXIT_DUMMY, ctx, loc, Some(state), true),
            Some((value, tag)) => self.caller_end_typed(value, *tag, ctx, loc, Some(state), true),
        }
    }

    /// Reserve a row slot for an interesting callee. The slot index is the
    /// row's previous entry count; PostCall fills it.
    fn check_callee(
        &self,
        call: &CallEvent,
        ctx: &CheckerContext<'_>,
        state: &ProgramState,
        callee: &str,
    ) -> Option<ProgramState> {
        if !self.care_function(callee, call) {
            return None;
        }
        let depth = ctx.stack_depth();
        let row = state.get::<StackRows>(&depth).copied();
        match row {
            Some(row) if row.printed => None,
            row => {
                let entries = row.map_or(0, |row| row.entries);
                Some(state.set::<StackRows>(
                    depth,
                    StackRow {
                        entries: entries + 1,
                        printed: false,
                    },
                ))
            }
        }
    }
}

impl PathChecker for Checker {
    fn pre_call(&self, call: &CallEvent, ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        let callee = call.callee.as_deref()?;
        let loc = call.location_string();
        let mut state = ctx.state().clone();

        let count = state.slot::<TopCount>();
        if let Some(next) = self.caller_start(ctx, &state, count) {
            state = next;
        }
        if let Some(next) = self.check_exit(call, ctx, &state, callee, &loc) {
            state = next;
        }
        if let Some(next) = self.check_callee(call, ctx, &state, callee) {
            state = next;
        }

        // Whatever happens next belongs to the callee's frame.
        Some(state.set_slot::<StartedCaller>(false))
    }

    fn post_call(&self, call: &CallEvent, ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        let callee = call.callee.as_deref()?;
        let depth = ctx.stack_depth();
        let mut state = ctx.state().clone();
        let mut changed = false;

        // The caller has resumed.
        if !state.slot::<StartedCaller>() {
            state = state.set_slot::<StartedCaller>(true);
            changed = true;
        }

        let top = state.slot::<TopCount>();
        if self.care_function(callee, call) {
            let row = state.get::<StackRows>(&depth).copied();
            if let Some(row) = row
                && !row.printed
                && row.entries > 0
            {
                let index = row.entries - 1;
                let (tick, next) = take_tick(&state);
                state = next;
                let val =
                    CurrentSymbolValue::capture(tick, call.result_type, &call.return_value, ctx, true);
                let (tick, next) = take_tick(&state);
                state = next;
                let site = ReturnSite::new(
                    tick,
                    callee.to_string(),
                    call.location_string(),
                    depth,
                    top,
                    &val,
                    ctx,
                );
                state = state.set::<ReturnSites>((depth, index), site);
                state = symvals::acquire(&state, &val);
                changed = true;
            }

            match state.get::<SimpleStack>(&depth) {
                Some(status) if status.printed || status.seen => {}
                _ => {
                    state = state.set::<SimpleStack>(
                        depth,
                        SimpleStatus {
                            printed: false,
                            seen: true,
                            depth,
                        },
                    );
                    changed = true;
                }
            }
        }

        if !COUNT_STATEMENTS {
            // A call counts once it has completed.
            state = state.set_slot::<TopCount>(top + 1);
            changed = true;
        }

        changed.then_some(state)
    }

    fn pre_stmt(&self, ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        if !COUNT_STATEMENTS {
            return None;
        }
        let state = ctx.state();
        let count = state.slot::<TopCount>();
        let state = self
            .caller_start(ctx, state, count)
            .unwrap_or_else(|| state.clone());
        Some(state.set_slot::<TopCount>(count + 1))
    }

    fn pre_return(&self, ret: &ReturnEvent, ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        let loc = ret.location.to_string();
        match &ret.value {
            Some(value) => self.caller_end_typed(value, ret.return_type, ctx, &loc, None, false),
            None => self.caller_end(VOID_TEXT, ctx, &loc, None, false),
        }
    }

    fn dead_symbols(
        &self,
        reaper: &SymbolReaper,
        ctx: &CheckerContext<'_>,
    ) -> Option<ProgramState> {
        let mut state = ctx.state().clone();
        let mut changed = false;
        for sym in reaper.dead() {
            if let Some(next) = symvals::finalize(&state, sym, ctx) {
                state = next;
                changed = true;
            }
        }
        changed.then_some(state)
    }

    fn end_function(&self, ctx: &CheckerContext<'_>) -> Option<ProgramState> {
        let depth = ctx.stack_depth();
        let mut state = ctx.state().clone();
        let mut changed = false;

        if let Some(next) = self.caller_end(VOID_TEXT, ctx, END_LOC, Some(&state), false) {
            state = next;
            changed = true;
        }

        // Hand the counter back to the parent frame and drop this depth's
        // bookkeeping.
        if let Some(rec) = state.get::<LengthStack>(&depth).copied() {
            state = state.remove::<LengthStack>(&depth);
            state = state.set_slot::<TopCount>(rec.count);
            changed = true;
        }
        if state.get::<StackRows>(&depth).is_some() {
            state = state.remove::<StackRows>(&depth);
            changed = true;
        }
        if state.get::<SimpleStack>(&depth).is_some() {
            state = state.remove::<SimpleStack>(&depth);
            changed = true;
        }

        changed.then_some(state)
    }
}
