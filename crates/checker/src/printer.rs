//! Value rendering
//!
//! A value prints as a one-character type prefix, an optional symbol
//! identity, and a body. Integers render as a decimal literal when the host
//! can concretize them into 64 bits, otherwise as one constraint dump per
//! leaf symbol. Booleans and pointers render as which of their two
//! polarities the path still allows. The output is deterministic for a
//! given (value, type, constraints) triple.

use retrace_core::{CheckerContext, SVal, TypeTag};
use std::fmt::Write as _;

/// Marker between a symbol and its value or constraints.
const ASSIGN: &str = ":=";
/// Terminator after one leaf's constraint dump.
const INT_ASSIGN_END: &str = "\\";
/// Prefix announcing a symbol identity.
const SYMBOL_PREFIX: &str = "&";
/// Separator when both polarities of a binary value are feasible.
const OR_DELIM: &str = " or ";
/// Rendering of an untracked or void outcome.
pub(crate) const VOID_TEXT: &str = "V";

fn type_prefix(tag: TypeTag) -> Option<char> {
    match tag {
        TypeTag::Int => Some('I'),
        TypeTag::Bool => Some('B'),
        TypeTag::Pointer => Some('P'),
        TypeTag::Void => Some('V'),
        TypeTag::Other => None,
    }
}

fn nonzero_marker(tag: TypeTag) -> &'static str {
    match tag {
        TypeTag::Bool => "true",
        TypeTag::Pointer => "notnull",
        _ => "",
    }
}

fn zero_marker(tag: TypeTag) -> &'static str {
    match tag {
        TypeTag::Bool => "false",
        TypeTag::Pointer => "null",
        _ => "",
    }
}

/// Append the trace token for `value` of type `tag` under the path
/// constraints in `ctx`.
///
/// `Other` values produce no output at all; `Void` produces only the
/// prefix. Callers must not rely on anything being appended.
pub fn print_value(out: &mut String, value: &SVal, tag: TypeTag, ctx: &CheckerContext<'_>) {
    let Some(prefix) = type_prefix(tag) else {
        return;
    };
    out.push(prefix);
    if tag == TypeTag::Void {
        return;
    }

    let expr = value.as_sym_expr();
    if let Some(expr) = expr {
        out.push_str(SYMBOL_PREFIX);
        let _ = write!(out, "{expr}");
        out.push_str(ASSIGN);
    }

    match tag {
        TypeTag::Int => {
            if let Some(v) = value.concrete_int() {
                let _ = write!(out, "{v}");
            } else if let Some(expr) = expr {
                for leaf in expr.leaves() {
                    let _ = write!(out, "{leaf}");
                    out.push_str(ASSIGN);
                    out.push_str(&ctx.constraints().dump_constraints(leaf));
                    out.push_str(INT_ASSIGN_END);
                }
            }
        }
        TypeTag::Bool | TypeTag::Pointer => {
            if value.is_undef() {
                out.push_str(nonzero_marker(tag));
                out.push_str(OR_DELIM);
                out.push_str(zero_marker(tag));
            } else {
                let (nonzero, zero) = ctx.constraints().assume_both(value);
                if nonzero {
                    out.push_str(nonzero_marker(tag));
                }
                if zero {
                    if nonzero {
                        out.push_str(OR_DELIM);
                    }
                    out.push_str(zero_marker(tag));
                }
            }
        }
        // Handled before the match; listed so the variant set stays closed.
        TypeTag::Void | TypeTag::Other => {}
    }
}

/// Render to a fresh string.
pub fn value_text(value: &SVal, tag: TypeTag, ctx: &CheckerContext<'_>) -> String {
    let mut out = String::new();
    print_value(&mut out, value, tag, ctx);
    out
}
