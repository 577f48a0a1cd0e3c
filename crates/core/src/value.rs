//! Symbolic value algebra
//!
//! Hosts deliver call return values either as exact integers or as symbolic
//! expressions over atomic symbols conjured at the call site. The checker
//! never evaluates expressions; it only needs a deterministic dump form,
//! the leaf symbols in declaration order, and concrete-integer extraction.

use std::fmt;
use std::sync::Arc;

/// Identity of an atomic symbol conjured by the host engine.
///
/// Ids are stable along a path and across its branches, so they double as
/// table keys in per-path state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Operator in a compound symbolic expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn glyph(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }
}

/// A symbolic expression tree.
///
/// Subtrees are shared (`Arc`) because hosts routinely hand the same
/// conjured symbol to many events on one path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymExpr {
    /// An atomic symbol.
    Leaf(SymbolId),
    /// Symbol-with-constant arithmetic, e.g. `(s1 + 4)`.
    SymInt {
        lhs: Arc<SymExpr>,
        op: BinOp,
        rhs: i64,
    },
    /// Symbol-with-symbol arithmetic, e.g. `(s1 - s2)`.
    SymSym {
        lhs: Arc<SymExpr>,
        op: BinOp,
        rhs: Arc<SymExpr>,
    },
}

impl SymExpr {
    /// Leaf symbols in declaration order (left to right).
    pub fn leaves(&self) -> Vec<SymbolId> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<SymbolId>) {
        match self {
            SymExpr::Leaf(id) => out.push(*id),
            SymExpr::SymInt { lhs, .. } => lhs.collect_leaves(out),
            SymExpr::SymSym { lhs, rhs, .. } => {
                lhs.collect_leaves(out);
                rhs.collect_leaves(out);
            }
        }
    }

    /// The first leaf in declaration order. Used as the expression's table
    /// identity: conjured call returns are leaves in practice, and compound
    /// expressions coalesce onto their leading symbol.
    pub fn first_leaf(&self) -> SymbolId {
        match self {
            SymExpr::Leaf(id) => *id,
            SymExpr::SymInt { lhs, .. } => lhs.first_leaf(),
            SymExpr::SymSym { lhs, .. } => lhs.first_leaf(),
        }
    }
}

impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymExpr::Leaf(id) => write!(f, "{id}"),
            SymExpr::SymInt { lhs, op, rhs } => write!(f, "({} {} {})", lhs, op.glyph(), rhs),
            SymExpr::SymSym { lhs, op, rhs } => write!(f, "({} {} {})", lhs, op.glyph(), rhs),
        }
    }
}

/// A value observed on one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SVal {
    /// Garbage or uninitialized; reading it was never defined.
    Undefined,
    /// Defined but with no usable representation.
    Unknown,
    /// Exact integer. Stored wide; extraction clamps to 64 bits.
    ConcreteInt(i128),
    /// Value described by a symbolic expression.
    Symbolic(Arc<SymExpr>),
}

impl SVal {
    /// Wrap a fresh leaf symbol.
    pub fn sym(id: SymbolId) -> Self {
        SVal::Symbolic(Arc::new(SymExpr::Leaf(id)))
    }

    /// The symbolic expression carried by this value, if any.
    pub fn as_sym_expr(&self) -> Option<&SymExpr> {
        match self {
            SVal::Symbolic(expr) => Some(expr),
            _ => None,
        }
    }

    /// Table identity of the value: the first leaf of its expression.
    pub fn as_symbol(&self) -> Option<SymbolId> {
        self.as_sym_expr().map(SymExpr::first_leaf)
    }

    /// Exact integer value, if it fits a 64-bit signed slot.
    ///
    /// Wider concrete values are treated as non-concrete and fall through
    /// to symbolic rendering.
    pub fn concrete_int(&self) -> Option<i64> {
        match self {
            SVal::ConcreteInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Whether the value is exactly known, i.e. carries no symbol.
    pub fn is_fixed(&self) -> bool {
        self.as_sym_expr().is_none()
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, SVal::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u32) -> Arc<SymExpr> {
        Arc::new(SymExpr::Leaf(SymbolId(n)))
    }

    #[test]
    fn test_dump_forms() {
        assert_eq!(SymExpr::Leaf(SymbolId(3)).to_string(), "s3");
        let e = SymExpr::SymInt {
            lhs: leaf(1),
            op: BinOp::Add,
            rhs: 4,
        };
        assert_eq!(e.to_string(), "(s1 + 4)");
        let e2 = SymExpr::SymSym {
            lhs: Arc::new(e),
            op: BinOp::Sub,
            rhs: leaf(2),
        };
        assert_eq!(e2.to_string(), "((s1 + 4) - s2)");
    }

    #[test]
    fn test_leaves_in_declaration_order() {
        let e = SymExpr::SymSym {
            lhs: Arc::new(SymExpr::SymInt {
                lhs: leaf(7),
                op: BinOp::Mul,
                rhs: 2,
            }),
            op: BinOp::Add,
            rhs: leaf(3),
        };
        assert_eq!(e.leaves(), vec![SymbolId(7), SymbolId(3)]);
        assert_eq!(e.first_leaf(), SymbolId(7));
    }

    #[test]
    fn test_concrete_int_width_cap() {
        assert_eq!(SVal::ConcreteInt(42).concrete_int(), Some(42));
        assert_eq!(SVal::ConcreteInt(-1).concrete_int(), Some(-1));
        // Wider than 64 bits: treated as non-concrete.
        assert_eq!(SVal::ConcreteInt(i128::from(i64::MAX) + 1).concrete_int(), None);
        assert_eq!(SVal::ConcreteInt(i128::from(i64::MIN) - 1).concrete_int(), None);
    }

    #[test]
    fn test_fixedness() {
        assert!(SVal::ConcreteInt(0).is_fixed());
        assert!(SVal::Unknown.is_fixed());
        assert!(SVal::Undefined.is_fixed());
        assert!(!SVal::sym(SymbolId(0)).is_fixed());
        assert_eq!(SVal::sym(SymbolId(9)).as_symbol(), Some(SymbolId(9)));
    }
}
