//! User-defined procedures.

use crate::error::{Flow, SzlResult};
use crate::heap::ObjId;
use crate::interp::{ExtExport, Interp};
use crate::value::CmdData;

/// Handler shared by every user-defined procedure. The command's private
/// data is a `[params, body]` list captured at definition time.
fn run_user_proc(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let data = match &interp
        .heap
        .get(argv[0])
        .cmd
        .as_ref()
        .expect("user proc is callable")
        .data
    {
        CmdData::Obj(id) => *id,
        _ => unreachable!("user proc data is a [params, body] list"),
    };
    let parts = interp.heap.as_list_vec(data)?;
    let params = interp.heap.as_list_vec(parts[0])?;
    if argv.len() - 1 != params.len() {
        return Err(interp.usage_error(argv[0]));
    }
    for (&param, &value) in params.iter().zip(&argv[1..]) {
        interp.set_in_current_obj(param, value)?;
    }
    // `return` stops the body; the procedure itself reports plain success.
    match interp.run_obj(parts[1])? {
        Flow::Return => Ok(Flow::Ok),
        flow => Ok(flow),
    }
}

/// `proc name params body`: defines a procedure and binds it globally.
fn cmd_proc(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let name = interp.heap.as_str(argv[1])?.to_owned();
    interp.heap.inc_ref(argv[2]);
    interp.heap.inc_ref(argv[3]);
    let data = interp.heap.new_list(vec![argv[2], argv[3]]);
    let id = interp.register_command(&name, None, None, None, run_user_proc, CmdData::Obj(data))?;
    interp.heap.dec_ref(id);
    Ok(Flow::Ok)
}

/// `return ?obj?`: stops the enclosing procedure.
fn cmd_return(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    if argv.len() == 2 {
        interp.set_last(argv[1]);
    }
    Ok(Flow::Return)
}

const EXPORTS: &[ExtExport] = &[
    ExtExport::Proc {
        name: "proc",
        min_args: Some(4),
        max_args: Some(4),
        help: Some("name params exp"),
        handler: cmd_proc,
    },
    ExtExport::Proc {
        name: "return",
        min_args: Some(1),
        max_args: Some(2),
        help: Some("?obj?"),
        handler: cmd_return,
    },
];

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    interp.register_extension("proc", EXPORTS)
}
