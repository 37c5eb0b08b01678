//! List commands.

use crate::error::{Flow, SzlError, SzlResult};
use crate::heap::ObjId;
use crate::interp::{ExtExport, Interp};

/// `list.new ?item?...`: a fresh list of the arguments.
fn cmd_new(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let items: Vec<ObjId> = argv[1..].to_vec();
    for &item in &items {
        interp.heap.inc_ref(item);
    }
    let list = interp.heap.new_list(items);
    interp.set_last_owned(list);
    Ok(Flow::Ok)
}

/// `list.len list`
fn cmd_len(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let len = interp.heap.as_list(argv[1])?.len();
    interp.set_last_int(len as i64);
    Ok(Flow::Ok)
}

/// `list.append list item`: appends in place.
fn cmd_append(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    interp.heap.list_append(argv[1], argv[2])?;
    Ok(Flow::Ok)
}

/// `list.set list index item`: replaces one element in place.
fn cmd_set(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let index = interp.heap.as_int(argv[2])?;
    interp.heap.list_set(argv[1], index, argv[3])?;
    Ok(Flow::Ok)
}

/// `list.extend list list`: appends all elements of the second list.
fn cmd_extend(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    interp.heap.list_extend(argv[1], argv[2])?;
    interp.set_last(argv[1]);
    Ok(Flow::Ok)
}

/// `list.index list index`: one element.
fn cmd_index(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let index = interp.heap.as_int(argv[2])?;
    if index < 0 {
        return Err(SzlError::bad_index(index));
    }
    let items = interp.heap.as_list(argv[1])?;
    match items.get(index as usize) {
        Some(&item) => {
            interp.set_last(item);
            Ok(Flow::Ok)
        }
        None => Err(SzlError::bad_index(index)),
    }
}

/// `list.range list start end`: elements `start..=end`.
fn cmd_range(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let items = interp.heap.as_list_vec(argv[1])?;
    let start = interp.heap.as_int(argv[2])?;
    if start < 0 || start as usize >= items.len() {
        return Err(SzlError::new(
            crate::error::ErrorKind::BadIndex,
            format!("bad start index: {start}"),
        ));
    }
    let end = interp.heap.as_int(argv[3])?;
    if end < start || end as usize >= items.len() {
        return Err(SzlError::new(
            crate::error::ErrorKind::BadIndex,
            format!("bad end index: {end}"),
        ));
    }
    let slice = items[start as usize..=end as usize].to_vec();
    for &item in &slice {
        interp.heap.inc_ref(item);
    }
    let list = interp.heap.new_list(slice);
    interp.set_last_owned(list);
    Ok(Flow::Ok)
}

/// `list.in list item`: value membership.
fn cmd_in(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let found = interp.heap.list_contains(argv[1], argv[2])?;
    interp.set_last_bool(found);
    Ok(Flow::Ok)
}

/// `list.reverse list`: a reversed copy.
fn cmd_reverse(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let mut items = interp.heap.as_list_vec(argv[1])?;
    items.reverse();
    for &item in &items {
        interp.heap.inc_ref(item);
    }
    let list = interp.heap.new_list(items);
    interp.set_last_owned(list);
    Ok(Flow::Ok)
}

/// `list.join list delim`: item string forms joined with `delim`.
fn cmd_join(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let delim = interp.heap.as_str(argv[2])?.to_owned();
    let items = interp.heap.as_list_vec(argv[1])?;
    let joined = interp.heap.join(&delim, &items, false)?;
    interp.set_last_str(&joined);
    Ok(Flow::Ok)
}

const EXPORTS: &[ExtExport] = &[
    ExtExport::Proc {
        name: "list.new",
        min_args: Some(1),
        max_args: None,
        help: Some("?item?..."),
        handler: cmd_new,
    },
    ExtExport::Proc {
        name: "list.len",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("list"),
        handler: cmd_len,
    },
    ExtExport::Proc {
        name: "list.append",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("list item"),
        handler: cmd_append,
    },
    ExtExport::Proc {
        name: "list.set",
        min_args: Some(4),
        max_args: Some(4),
        help: Some("list index item"),
        handler: cmd_set,
    },
    ExtExport::Proc {
        name: "list.extend",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("list list"),
        handler: cmd_extend,
    },
    ExtExport::Proc {
        name: "list.index",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("list index"),
        handler: cmd_index,
    },
    ExtExport::Proc {
        name: "list.range",
        min_args: Some(4),
        max_args: Some(4),
        help: Some("list start end"),
        handler: cmd_range,
    },
    ExtExport::Proc {
        name: "list.in",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("list item"),
        handler: cmd_in,
    },
    ExtExport::Proc {
        name: "list.reverse",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("list"),
        handler: cmd_reverse,
    },
    ExtExport::Proc {
        name: "list.join",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("list delim"),
        handler: cmd_join,
    },
];

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    interp.register_extension("list", EXPORTS)
}
