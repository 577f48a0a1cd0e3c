//! Host-engine stand-in for scenario tests
//!
//! Plays the part of the symbolic-execution engine: tracks the frame
//! stack, owns a constraint store, fires events at the checker, and
//! collects emitted lines in a shared in-memory sink. `fork` models a
//! branch point: the clone shares the checker and the sink (process-wide
//! state) while program state and constraints diverge per path.

use retrace::{Checker, FunctionSets, TraceLog};
use retrace_core::{
    CallEvent, CheckerContext, IntervalConstraints, PathChecker, ProgramState, ReturnEvent, SVal,
    SourceLoc, SymbolReaper, TypeTag,
};
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }
}

#[derive(Clone)]
pub struct PathHost {
    checker: Arc<Checker>,
    pub buf: SharedBuf,
    pub state: ProgramState,
    pub constraints: IntervalConstraints,
    stack: Vec<String>,
}

impl PathHost {
    pub fn new(sets: FunctionSets) -> Self {
        let buf = SharedBuf::default();
        let log = TraceLog::new(Box::new(buf.clone()));
        PathHost {
            checker: Arc::new(Checker::new(sets, Arc::new(log))),
            buf,
            state: ProgramState::new(),
            constraints: IntervalConstraints::new(),
            stack: Vec::new(),
        }
    }

    /// Branch point: per-path state diverges, process-wide state is shared.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn enter(&mut self, function: &str) {
        self.stack.push(function.to_string());
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }

    fn depth(&self) -> u32 {
        self.stack.len() as u32
    }

    fn current(&self) -> &str {
        self.stack.last().map(String::as_str).unwrap_or("")
    }

    fn apply(&mut self, next: Option<ProgramState>) {
        if let Some(state) = next {
            self.state = state;
        }
    }

    pub fn pre_call(&mut self, call: &CallEvent) {
        let next = {
            let ctx =
                CheckerContext::new(&self.state, &self.constraints, self.depth(), self.current());
            self.checker.pre_call(call, &ctx)
        };
        self.apply(next);
    }

    pub fn post_call(&mut self, call: &CallEvent) {
        let next = {
            let ctx =
                CheckerContext::new(&self.state, &self.constraints, self.depth(), self.current());
            self.checker.post_call(call, &ctx)
        };
        self.apply(next);
    }

    pub fn pre_stmt(&mut self) {
        let next = {
            let ctx =
                CheckerContext::new(&self.state, &self.constraints, self.depth(), self.current());
            self.checker.pre_stmt(&ctx)
        };
        self.apply(next);
    }

    pub fn pre_return(&mut self, ret: &ReturnEvent) {
        let next = {
            let ctx =
                CheckerContext::new(&self.state, &self.constraints, self.depth(), self.current());
            self.checker.pre_return(ret, &ctx)
        };
        self.apply(next);
    }

    pub fn dead_symbols(&mut self, reaper: &SymbolReaper) {
        let next = {
            let ctx =
                CheckerContext::new(&self.state, &self.constraints, self.depth(), self.current());
            self.checker.dead_symbols(reaper, &ctx)
        };
        self.apply(next);
    }

    pub fn end_function(&mut self) {
        let next = {
            let ctx =
                CheckerContext::new(&self.state, &self.constraints, self.depth(), self.current());
            self.checker.end_function(&ctx)
        };
        self.apply(next);
    }

    /// Convenience: a complete uninteresting leaf call (PreCall, empty
    /// callee frame, PostCall).
    pub fn leaf_call(&mut self, call: &CallEvent) {
        self.pre_call(call);
        self.enter(call.callee.as_deref().unwrap_or(""));
        self.end_function();
        self.leave();
        self.post_call(call);
    }
}

pub fn call(callee: &str, result_type: TypeTag, ret: SVal, line: u32) -> CallEvent {
    CallEvent {
        callee: Some(callee.to_string()),
        args: Vec::new(),
        result_type,
        return_value: ret,
        location: Some(SourceLoc::new("input.c", line, 9)),
    }
}

pub fn returning(value: Option<SVal>, return_type: TypeTag, line: u32) -> ReturnEvent {
    ReturnEvent {
        value,
        return_type,
        location: SourceLoc::new("input.c", line, 3),
    }
}
