//! Arithmetic and bitwise commands.
//!
//! `+ - *` return an integer when both operands are integers and a float
//! otherwise; `/` and `%` are always floating point. Division and modulo by
//! zero are errors. The bitwise operators work on integers.

use crate::error::{ErrorKind, Flow, SzlError, SzlResult};
use crate::heap::ObjId;
use crate::interp::{ExtExport, Interp};
use crate::value::RepBits;

enum Operands {
    Ints(i64, i64),
    Floats(f64, f64),
}

/// Reads one operand without disturbing cached representations: an integer
/// when one is cached or the string parses as one, a float otherwise.
fn numeric(interp: &mut Interp, id: ObjId) -> SzlResult<Result<i64, f64>> {
    let obj = interp.heap.get(id);
    if obj.has(RepBits::INT) {
        return Ok(Ok(obj.int_rep()));
    }
    if obj.has(RepBits::FLOAT) {
        return Ok(Err(obj.float_rep()));
    }
    if interp.heap.as_int(id).is_ok() {
        return Ok(Ok(interp.heap.get(id).int_rep()));
    }
    Ok(Err(interp.heap.as_float(id)?))
}

fn operands(interp: &mut Interp, argv: &[ObjId]) -> SzlResult<Operands> {
    let m = numeric(interp, argv[1])?;
    let n = numeric(interp, argv[2])?;
    Ok(match (m, n) {
        (Ok(m), Ok(n)) => Operands::Ints(m, n),
        (m, n) => {
            let m = m.map_or_else(|f| f, |i| i as f64);
            let n = n.map_or_else(|f| f, |i| i as f64);
            Operands::Floats(m, n)
        }
    })
}

macro_rules! arith {
    ($fname:ident, $int_op:ident, $op:tt) => {
        fn $fname(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
            match operands(interp, argv)? {
                Operands::Ints(m, n) => interp.set_last_int(m.$int_op(n)),
                Operands::Floats(m, n) => interp.set_last_float(m $op n),
            }
            Ok(Flow::Ok)
        }
    };
}

arith!(cmd_add, wrapping_add, +);
arith!(cmd_sub, wrapping_sub, -);
arith!(cmd_mul, wrapping_mul, *);

fn cmd_div(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let m = interp.heap.as_float(argv[1])?;
    let n = interp.heap.as_float(argv[2])?;
    if n == 0.0 {
        return Err(SzlError::new(ErrorKind::BadValue, "division by 0"));
    }
    interp.set_last_float(m / n);
    Ok(Flow::Ok)
}

fn cmd_mod(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let m = interp.heap.as_float(argv[1])?;
    let n = interp.heap.as_float(argv[2])?;
    if n == 0.0 {
        return Err(SzlError::new(ErrorKind::BadValue, "division by 0"));
    }
    interp.set_last_float(m % n);
    Ok(Flow::Ok)
}

macro_rules! bitwise {
    ($fname:ident, $op:tt) => {
        fn $fname(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
            let m = interp.heap.as_int(argv[1])?;
            let n = interp.heap.as_int(argv[2])?;
            interp.set_last_int(m $op n);
            Ok(Flow::Ok)
        }
    };
}

bitwise!(cmd_bitand, &);
bitwise!(cmd_bitor, |);
bitwise!(cmd_bitxor, ^);

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
    binary!("+", cmd_add),
    binary!("-", cmd_sub),
    binary!("*", cmd_mul),
    binary!("/", cmd_div),
    binary!("%", cmd_mod),
    binary!("&", cmd_bitand),
    binary!("|", cmd_bitor),
    binary!("^", cmd_bitxor),
];

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    interp.register_extension("math", EXPORTS)
}
