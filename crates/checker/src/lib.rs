//! Retrace: mining error-handling specifications from path traces
//!
//! A checker plugged into a symbolic-execution host. Along every feasible
//! path the host explores, it reconstructs which configured "interesting"
//! calls each function made and what the function eventually did (returned
//! a value, or terminated the program), then emits one framed text line per
//! frame for downstream specification mining:
//!
//! ```text
//! AutoEPEx: may_fail input.c:10:9;P&s0:=notnull or null #1@f input.c:12:2;I1$
//! ```
//!
//! All per-path state lives in the host's [`retrace_core::ProgramState`];
//! the checker itself holds only the configured function sets and the
//! output log, so host-driven branching and backtracking need no
//! cooperation from this crate.
//!
//! # Modules
//!
//! - `printer`: value rendering (type prefix, symbol identity, ranges)
//! - `symvals`: refcounted table of still-symbolic return values
//! - `frames`: per-depth rows, return sites, counters, status
//! - `checker`: the event handlers and the flush procedure
//! - `config`: the `analyze_func_list.txt` function sets
//! - `output`: framed line emission and the randomized log file

pub mod checker;
pub mod config;
pub mod frames;
pub mod output;
pub mod printer;
pub mod symvals;

pub use checker::Checker;
pub use config::FunctionSets;
pub use output::{PREAMBLE, TraceLog};
