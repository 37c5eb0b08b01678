//! Dictionary commands over the sorted-pair-list representation.

use crate::error::{ErrorKind, Flow, SzlError, SzlResult};
use crate::heap::ObjId;
use crate::interp::{ExtExport, Interp};

/// `dict.new ?k v?...`: builds a dict from alternating keys and values.
fn cmd_new(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    if argv.len() % 2 == 0 {
        return Err(interp.usage_error(argv[0]));
    }
    let dict = interp.heap.new_dict(&argv[1..])?;
    interp.set_last_owned(dict);
    Ok(Flow::Ok)
}

/// `dict.get dict k ?fallback?`: the value for `k`; an absent key yields
/// the fallback when given and an error otherwise.
fn cmd_get(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    match interp.heap.dict_get(argv[1], argv[2])? {
        Some(value) => {
            interp.set_last(value);
            Ok(Flow::Ok)
        }
        None if argv.len() == 4 => {
            interp.set_last(argv[3]);
            Ok(Flow::Ok)
        }
        None => {
            let key = interp.heap.as_str(argv[2])?.to_owned();
            Err(SzlError::new(ErrorKind::BadName, format!("bad key: {key}")))
        }
    }
}

/// `dict.set dict k v`: inserts or overwrites in place.
fn cmd_set(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    interp.heap.dict_set(argv[1], argv[2], argv[3])?;
    Ok(Flow::Ok)
}

const EXPORTS: &[ExtExport] = &[
    ExtExport::Proc {
        name: "dict.new",
        min_args: Some(1),
        max_args: None,
        help: Some("?k v?..."),
        handler: cmd_new,
    },
    ExtExport::Proc {
        name: "dict.get",
        min_args: Some(3),
        max_args: Some(4),
        help: Some("dict k ?v?"),
        handler: cmd_get,
    },
    ExtExport::Proc {
        name: "dict.set",
        min_args: Some(4),
        max_args: Some(4),
        help: Some("dict k v"),
        handler: cmd_set,
    },
];

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    interp.register_extension("dict", EXPORTS)
}
