//! Per-path program state
//!
//! The host clones program state at every branch point, revisits sibling
//! paths in any order, and discards infeasible states wholesale. Checkers
//! therefore never mutate a state in place: every operation returns a new
//! handle, and a clone is a shallow copy of table pointers. Only the table
//! actually written is copied, so branch cost is proportional to the dirty
//! keys of one path, not to the total state size.
//!
//! Checkers register their tables with zero-sized marker types:
//!
//! ```
//! use retrace_core::{ProgramState, StateMap, StateSlot};
//!
//! enum Rows {}
//! impl StateMap for Rows {
//!     type Key = u32;
//!     type Value = (u32, bool);
//! }
//!
//! enum Counter {}
//! impl StateSlot for Counter {
//!     type Value = u64;
//! }
//!
//! let s0 = ProgramState::new();
//! let s1 = s0.set::<Rows>(1, (3, false)).set_slot::<Counter>(7);
//! assert_eq!(s0.get::<Rows>(&1), None);
//! assert_eq!(s1.get::<Rows>(&1), Some(&(3, false)));
//! assert_eq!(s1.slot::<Counter>(), 7);
//! ```

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A keyed table living in the program state. Implemented by zero-sized
/// marker types; the marker's `TypeId` is the registry key.
pub trait StateMap: 'static {
    type Key: Ord + Clone + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;
}

/// A scalar slot living in the program state. Reading an unset slot yields
/// the value type's `Default`.
pub trait StateSlot: 'static {
    type Value: Clone + Default + Send + Sync + 'static;
}

/// Immutable-by-copy typed table store for one path.
#[derive(Clone, Default)]
pub struct ProgramState {
    tables: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ProgramState {
    pub fn new() -> Self {
        Self::default()
    }

    fn table<M: StateMap>(&self) -> Option<&BTreeMap<M::Key, M::Value>> {
        self.tables
            .get(&TypeId::of::<M>())
            .and_then(|t| t.downcast_ref())
    }

    fn with_table<M: StateMap>(&self, map: BTreeMap<M::Key, M::Value>) -> Self {
        let mut tables = self.tables.clone();
        tables.insert(TypeId::of::<M>(), Arc::new(map));
        ProgramState { tables }
    }

    /// Look up one entry of a registered table.
    pub fn get<M: StateMap>(&self, key: &M::Key) -> Option<&M::Value> {
        self.table::<M>()?.get(key)
    }

    /// Derive a state with `key` bound to `value` in `M`'s table.
    #[must_use = "mutations return a new state"]
    pub fn set<M: StateMap>(&self, key: M::Key, value: M::Value) -> Self {
        let mut map = self.table::<M>().cloned().unwrap_or_default();
        map.insert(key, value);
        self.with_table::<M>(map)
    }

    /// Derive a state without `key` in `M`'s table. A miss returns an
    /// equivalent state.
    #[must_use = "mutations return a new state"]
    pub fn remove<M: StateMap>(&self, key: &M::Key) -> Self {
        match self.table::<M>() {
            Some(map) if map.contains_key(key) => {
                let mut map = map.clone();
                map.remove(key);
                self.with_table::<M>(map)
            }
            _ => self.clone(),
        }
    }

    /// All entries of a registered table, in key order.
    pub fn entries<M: StateMap>(&self) -> impl Iterator<Item = (&M::Key, &M::Value)> {
        self.table::<M>().into_iter().flatten()
    }

    /// Read a scalar slot, defaulting when unset.
    pub fn slot<S: StateSlot>(&self) -> S::Value {
        self.tables
            .get(&TypeId::of::<S>())
            .and_then(|t| t.downcast_ref::<S::Value>())
            .cloned()
            .unwrap_or_default()
    }

    /// Derive a state with slot `S` set to `value`.
    #[must_use = "mutations return a new state"]
    pub fn set_slot<S: StateSlot>(&self, value: S::Value) -> Self {
        let mut tables = self.tables.clone();
        tables.insert(TypeId::of::<S>(), Arc::new(value));
        ProgramState { tables }
    }
}

impl fmt::Debug for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramState")
            .field("tables", &self.tables.len())
            .finish()
    }
}
