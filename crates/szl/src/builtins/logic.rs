//! Branching and the prefix comparison operators.
//!
//! `==`/`!=` compare canonical string forms, the ordering operators compare
//! numerically, and the boolean operators work on truthiness. Logical xor is
//! spelled `^^`; bare `^` is bitwise and lives in the math package.

use crate::error::{Flow, SzlResult};
use crate::heap::ObjId;
use crate::interp::{ExtExport, Interp};

/// `if cond exp ?else exp?`: `cond` is an already evaluated value; write
/// computed conditions as `[...]`.
fn cmd_if(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    if argv.len() == 4 || (argv.len() == 5 && interp.heap.as_str(argv[3])? != "else") {
        return Err(interp.usage_error(argv[0]));
    }
    if interp.heap.is_true(argv[1])? {
        return interp.run_obj(argv[2]);
    }
    if argv.len() == 5 {
        return interp.run_obj(argv[4]);
    }
    Ok(Flow::Ok)
}

/// `not obj`
fn cmd_not(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let b = interp.heap.is_true(argv[1])?;
    interp.set_last_bool(!b);
    Ok(Flow::Ok)
}

fn cmd_str_eq(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let eq = interp.heap.eq_values(argv[1], argv[2])?;
    interp.set_last_bool(eq);
    Ok(Flow::Ok)
}

fn cmd_str_ne(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let eq = interp.heap.eq_values(argv[1], argv[2])?;
    interp.set_last_bool(!eq);
    Ok(Flow::Ok)
}

fn numeric_operands(interp: &mut Interp, argv: &[ObjId]) -> SzlResult<(f64, f64)> {
    let m = interp.heap.as_float(argv[1])?;
    let n = interp.heap.as_float(argv[2])?;
    Ok((m, n))
}

fn cmd_lt(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let (m, n) = numeric_operands(interp, argv)?;
    interp.set_last_bool(m < n);
    Ok(Flow::Ok)
}

fn cmd_le(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let (m, n) = numeric_operands(interp, argv)?;
    interp.set_last_bool(m <= n);
    Ok(Flow::Ok)
}

fn cmd_gt(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let (m, n) = numeric_operands(interp, argv)?;
    interp.set_last_bool(m > n);
    Ok(Flow::Ok)
}

fn cmd_ge(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let (m, n) = numeric_operands(interp, argv)?;
    interp.set_last_bool(m >= n);
    Ok(Flow::Ok)
}

fn truth_operands(interp: &mut Interp, argv: &[ObjId]) -> SzlResult<(bool, bool)> {
    let a = interp.heap.is_true(argv[1])?;
    let b = interp.heap.is_true(argv[2])?;
    Ok((a, b))
}

fn cmd_and(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let (a, b) = truth_operands(interp, argv)?;
    interp.set_last_bool(a && b);
    Ok(Flow::Ok)
}

fn cmd_or(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let (a, b) = truth_operands(interp, argv)?;
    interp.set_last_bool(a || b);
    Ok(Flow::Ok)
}

fn cmd_xor(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let (a, b) = truth_operands(interp, argv)?;
    interp.set_last_bool(a ^ b);
    Ok(Flow::Ok)
}

macro_rules! binary {
    ($name:literal, $handler:expr) => {
        ExtExport::Proc {
            name: $name,
            min_args: Some(3),
            max_args: Some(3),
            help: Some("m n"),
            handler: $handler,
        }
    };
}

const EXPORTS: &[ExtExport] = &[
    ExtExport::Proc {
        name: "if",
        min_args: Some(3),
        max_args: Some(5),
        help: Some("cond exp ?else exp?"),
        handler: cmd_if,
    },
    ExtExport::Proc {
        name: "not",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("obj"),
        handler: cmd_not,
    },
    binary!("==", cmd_str_eq),
    binary!("!=", cmd_str_ne),
    binary!("<", cmd_lt),
    binary!("<=", cmd_le),
    binary!(">", cmd_gt),
    binary!(">=", cmd_ge),
    binary!("&&", cmd_and),
    binary!("||", cmd_or),
    binary!("^^", cmd_xor),
];

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    interp.register_extension("logic", EXPORTS)
}
