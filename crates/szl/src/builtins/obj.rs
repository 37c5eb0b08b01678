//! Generic object commands: variable binding, evaluation, identity.

use crate::error::{Flow, SzlError, SzlResult};
use crate::heap::ObjId;
use crate::interp::{ExtExport, Interp};

/// `set name ?val?`: with a value, binds `name` in the caller's frame and
/// returns the value; without one, returns the current binding.
fn cmd_set(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let name = interp.heap.as_str(argv[1])?.to_owned();
    if argv.len() == 3 {
        interp.set_in_caller(&name, argv[2])?;
        interp.set_last(argv[2]);
    } else {
        let value = interp.get_var(&name)?;
        interp.set_last(value);
    }
    Ok(Flow::Ok)
}

/// `global name val`: binds in the global frame.
fn cmd_global(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let name = interp.heap.as_str(argv[1])?.to_owned();
    interp.set_in_global(&name, argv[2])?;
    interp.set_last(argv[2]);
    Ok(Flow::Ok)
}

/// `export name ?val?`: binds one frame above the caller, making a value
/// visible to the caller's own caller.
fn cmd_export(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let name = interp.heap.as_str(argv[1])?.to_owned();
    let value = if argv.len() == 3 {
        argv[2]
    } else {
        interp.get_var(&name)?
    };
    let target = interp
        .caller_of_current()
        .and_then(|caller| interp.caller_of(caller));
    let Some(target) = target else {
        return Err(SzlError::new(
            crate::error::ErrorKind::BadName,
            "cannot export from global scope",
        ));
    };
    interp.set_in_frame_index(target, &name, value)?;
    interp.set_last(value);
    Ok(Flow::Ok)
}

/// `eval exp`: runs a value as a script.
fn cmd_eval(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    interp.run_obj(argv[1])
}

/// `echo obj`: returns its argument.
fn cmd_echo(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    interp.set_last(argv[1]);
    Ok(Flow::Ok)
}

/// `call stmt`: runs a value as a single statement.
fn cmd_call(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    interp.run_statement(argv[1])
}

/// `is obj obj`: object identity, not value equality.
fn cmd_is(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    interp.set_last_bool(argv[1] == argv[2]);
    Ok(Flow::Ok)
}

/// `hex val`: lowercase hexadecimal form of an integer.
fn cmd_hex(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let value = interp.heap.as_int(argv[1])?;
    interp.set_last_str(&format!("{value:x}"));
    Ok(Flow::Ok)
}

const EXPORTS: &[ExtExport] = &[
    ExtExport::Proc {
        name: "set",
        min_args: Some(2),
        max_args: Some(3),
        help: Some("name ?val?"),
        handler: cmd_set,
    },
    ExtExport::Proc {
        name: "global",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("name val"),
        handler: cmd_global,
    },
    ExtExport::Proc {
        name: "export",
        min_args: Some(2),
        max_args: Some(3),
        help: Some("name ?val?"),
        handler: cmd_export,
    },
    ExtExport::Proc {
        name: "eval",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("exp"),
        handler: cmd_eval,
    },
    ExtExport::Proc {
        name: "echo",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("obj"),
        handler: cmd_echo,
    },
    ExtExport::Proc {
        name: "call",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("stmt"),
        handler: cmd_call,
    },
    ExtExport::Proc {
        name: "is",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("obj obj"),
        handler: cmd_is,
    },
    ExtExport::Proc {
        name: "hex",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("val"),
        handler: cmd_hex,
    },
];

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    interp.register_extension("obj", EXPORTS)
}
