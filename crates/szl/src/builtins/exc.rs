//! Error trapping.

use crate::error::{ErrorKind, SzlError, SzlResult};
use crate::heap::ObjId;
use crate::interp::{ExtExport, Interp};

/// `try exp ?except exp? ?finally exp?`: runs `exp`; an error runs the
/// `except` block with the diagnostic bound under `ex`, and a `finally`
/// block always runs last, its outcome replacing the result.
fn cmd_try(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let well_formed = match argv.len() {
        2 => true,
        4 => interp.heap.as_str(argv[2])? == "except",
        6 => {
            interp.heap.as_str(argv[2])? == "except" && interp.heap.as_str(argv[4])? == "finally"
        }
        _ => false,
    };
    if !well_formed {
        return Err(interp.usage_error(argv[0]));
    }

    let mut result = interp.run_obj(argv[1]);
    if let Err(err) = &result {
        if argv.len() >= 4 {
            let diagnostic = interp.heap.new_str(err.message());
            let bound = interp.set_in_current("ex", diagnostic);
            interp.heap.dec_ref(diagnostic);
            bound?;
            result = interp.run_obj(argv[3]);
        }
    }
    if argv.len() == 6 {
        result = interp.run_obj(argv[5]);
    }
    result
}

/// `throw ?msg?`: raises an error carrying `msg` as the diagnostic.
fn cmd_throw(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let message = if argv.len() == 2 {
        interp.heap.as_str(argv[1])?.to_owned()
    } else {
        "error".to_owned()
    };
    Err(SzlError::new(ErrorKind::User, message))
}

const EXPORTS: &[ExtExport] = &[
    ExtExport::Proc {
        name: "try",
        min_args: Some(2),
        max_args: Some(6),
        help: Some("exp ?except exp? ?finally exp?"),
        handler: cmd_try,
    },
    ExtExport::Proc {
        name: "throw",
        min_args: Some(1),
        max_args: Some(2),
        help: Some("?msg?"),
        handler: cmd_throw,
    },
];

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    interp.register_extension("exc", EXPORTS)
}
