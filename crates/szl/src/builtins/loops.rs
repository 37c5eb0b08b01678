//! Loop and flow-control commands.

use crate::error::{ErrorKind, Flow, SzlError, SzlResult};
use crate::heap::ObjId;
use crate::interp::{ExtExport, Interp};

/// Evaluates a loop condition as an expression and reports its truthiness.
/// A non-`Ok` flow from the condition aborts the loop with that flow.
fn check_condition(interp: &mut Interp, cond: ObjId) -> SzlResult<Result<bool, Flow>> {
    let flow = interp.eval_obj(cond)?;
    if flow != Flow::Ok {
        return Ok(Err(flow));
    }
    let last = interp.last();
    Ok(Ok(interp.heap.is_true(last)?))
}

fn run_loop_body(interp: &mut Interp, body: ObjId) -> SzlResult<Option<Flow>> {
    match interp.run_obj(body)? {
        Flow::Ok | Flow::Continue => Ok(None),
        Flow::Break => Ok(Some(Flow::Ok)),
        flow => Ok(Some(flow)),
    }
}

/// `while cond exp`: evaluates `cond` before each iteration.
fn cmd_while(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    loop {
        match check_condition(interp, argv[1])? {
            Err(flow) => return Ok(flow),
            Ok(false) => return Ok(Flow::Ok),
            Ok(true) => {}
        }
        if let Some(flow) = run_loop_body(interp, argv[2])? {
            return Ok(flow);
        }
    }
}

/// `do exp while cond`: runs the body once before checking the condition.
fn cmd_do(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    if interp.heap.as_str(argv[2])? != "while" {
        return Err(interp.usage_error(argv[0]));
    }
    loop {
        if let Some(flow) = run_loop_body(interp, argv[1])? {
            return Ok(flow);
        }
        match check_condition(interp, argv[3])? {
            Err(flow) => return Ok(flow),
            Ok(false) => return Ok(Flow::Ok),
            Ok(true) => {}
        }
    }
}

fn cmd_break(_interp: &mut Interp, _argv: &[ObjId]) -> SzlResult {
    Ok(Flow::Break)
}

fn cmd_continue(_interp: &mut Interp, _argv: &[ObjId]) -> SzlResult {
    Ok(Flow::Continue)
}

/// `exit ?obj?`: stops the whole script; the optional value becomes the
/// process-level exit value.
fn cmd_exit(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    if argv.len() == 2 {
        interp.set_last(argv[1]);
    }
    Ok(Flow::Exit)
}

/// Shared body of `for` and `map`: binds `names` to consecutive chunks of
/// `list` and runs the body, collecting results when `keep` is set.
fn run_map(interp: &mut Interp, argv: &[ObjId], keep: bool) -> SzlResult {
    let names = interp.heap.as_list_vec(argv[1])?;
    if names.is_empty() {
        return Err(interp.usage_error(argv[0]));
    }
    let values = interp.heap.as_list_vec(argv[2])?;
    if values.len() % names.len() != 0 {
        return Err(SzlError::new(ErrorKind::BadValue, "bad number of values"));
    }
    let collected = if keep {
        Some(interp.heap.new_list(Vec::new()))
    } else {
        None
    };
    let finish = |interp: &mut Interp, flow: SzlResult| -> SzlResult {
        if let Some(list) = collected {
            match &flow {
                Ok(Flow::Ok) => interp.set_last_owned(list),
                _ => interp.heap.dec_ref(list),
            }
        }
        flow
    };
    for chunk in values.chunks(names.len()) {
        for (&name, &value) in names.iter().zip(chunk) {
            if let Err(err) = interp.set_in_current_obj(name, value) {
                return finish(interp, Err(err));
            }
        }
        match interp.run_obj(argv[3]) {
            Ok(Flow::Ok) => {
                if let Some(list) = collected {
                    let last = interp.last();
                    if let Err(err) = interp.heap.list_append(list, last) {
                        return finish(interp, Err(err));
                    }
                }
            }
            Ok(Flow::Continue) => {}
            Ok(Flow::Break) => break,
            other => return finish(interp, other),
        }
    }
    finish(interp, Ok(Flow::Ok))
}

/// `for names list exp`: iterates without collecting.
fn cmd_for(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    run_map(interp, argv, false)
}

/// `map names list exp`: iterates and returns the list of body results.
fn cmd_map(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    run_map(interp, argv, true)
}

/// `range ?start? end`: the list of integers in `[start, end)`.
fn cmd_range(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let end = interp.heap.as_int(argv[argv.len() - 1])?;
    let start = if argv.len() == 3 {
        interp.heap.as_int(argv[1])?
    } else {
        0
    };
    if start >= end {
        return Err(SzlError::new(
            ErrorKind::BadValue,
            format!("bad range: {start} >= {end}"),
        ));
    }
    let list = interp.heap.new_list(Vec::new());
    for i in start..end {
        let item = interp.new_int(i);
        let appended = interp.heap.list_append(list, item);
        interp.heap.dec_ref(item);
        if let Err(err) = appended {
            interp.heap.dec_ref(list);
            return Err(err);
        }
    }
    interp.set_last_owned(list);
    Ok(Flow::Ok)
}

const EXPORTS: &[ExtExport] = &[
    ExtExport::Proc {
        name: "while",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("cond exp"),
        handler: cmd_while,
    },
    ExtExport::Proc {
        name: "do",
        min_args: Some(4),
        max_args: Some(4),
        help: Some("exp while cond"),
        handler: cmd_do,
    },
    ExtExport::Proc {
        name: "break",
        min_args: Some(1),
        max_args: Some(1),
        help: None,
        handler: cmd_break,
    },
    ExtExport::Proc {
        name: "continue",
        min_args: Some(1),
        max_args: Some(1),
        help: None,
        handler: cmd_continue,
    },
    ExtExport::Proc {
        name: "exit",
        min_args: Some(1),
        max_args: Some(2),
        help: Some("?obj?"),
        handler: cmd_exit,
    },
    ExtExport::Proc {
        name: "for",
        min_args: Some(4),
        max_args: Some(4),
        help: Some("names list exp"),
        handler: cmd_for,
    },
    ExtExport::Proc {
        name: "map",
        min_args: Some(4),
        max_args: Some(4),
        help: Some("names list exp"),
        handler: cmd_map,
    },
    ExtExport::Proc {
        name: "range",
        min_args: Some(2),
        max_args: Some(3),
        help: Some("?start? end"),
        handler: cmd_range,
    },
];

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    interp.register_extension("loop", EXPORTS)
}
