//! Retrace Core: the seam between a symbolic-execution host and its checkers
//!
//! A host engine explores feasible paths through a translation unit and
//! invokes checkers at well-defined events. This crate defines everything a
//! checker sees of the host, and nothing else:
//!
//! - `TypeTag`: how far the trace format classifies a host type
//! - `SVal` / `SymExpr`: the value algebra delivered with call events
//! - `ConstraintQuery`: path-constraint feasibility and printing
//! - `ProgramState`: the per-path, immutable-by-copy typed table store that
//!   the host clones at branches and discards on infeasible paths
//! - `events`: the event payloads and the `PathChecker` callback surface
//!
//! The engine itself (path enumeration, constraint solving, scheduling) is
//! deliberately absent; `IntervalConstraints` is a small reference
//! implementation of `ConstraintQuery` for hosts and test harnesses.

pub mod constraints;
pub mod events;
pub mod state;
pub mod types;
pub mod value;

pub use constraints::{ConstraintQuery, IntervalConstraints};
pub use events::{CallEvent, CheckerContext, PathChecker, ReturnEvent, SourceLoc, SymbolReaper};
pub use state::{ProgramState, StateMap, StateSlot};
pub use types::TypeTag;
pub use value::{BinOp, SVal, SymExpr, SymbolId};
