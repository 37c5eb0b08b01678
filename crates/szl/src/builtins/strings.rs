//! String commands.
//!
//! Character-indexed operations (`str.len`, `str.range`) work on the wide
//! representation; `byte.len` counts UTF-8 bytes.

use crate::error::{ErrorKind, Flow, SzlError, SzlResult};
use crate::heap::ObjId;
use crate::interp::{ExtExport, Interp};

const FORMAT_SEQ: &str = "{}";

/// `format fmt ?obj?...`: replaces each `{}` in `fmt` with the string form
/// of the next argument.
fn cmd_format(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let fmt = interp.heap.as_str(argv[1])?.to_owned();
    if fmt.is_empty() {
        return Err(SzlError::new(ErrorKind::BadValue, "empty fmt"));
    }
    let mut out = String::new();
    let mut rest = fmt.as_str();
    let mut next = 2;
    loop {
        match rest.find(FORMAT_SEQ) {
            None => {
                if next != argv.len() {
                    return Err(SzlError::new(
                        ErrorKind::BadValue,
                        format!("extra args for fmt: {fmt}"),
                    ));
                }
                break;
            }
            Some(pos) => {
                if next == argv.len() {
                    return Err(SzlError::new(
                        ErrorKind::BadValue,
                        format!("missing args for fmt: {fmt}"),
                    ));
                }
                out.push_str(&rest[..pos]);
                out.push_str(interp.heap.as_str(argv[next])?);
                rest = &fmt[fmt.len() - rest.len() + pos + FORMAT_SEQ.len()..];
                next += 1;
            }
        }
    }
    out.push_str(rest);
    interp.set_last_str(&out);
    Ok(Flow::Ok)
}

/// `str.len str`: length in characters.
fn cmd_len(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let len = interp.heap.as_wstr(argv[1])?.len();
    interp.set_last_int(len as i64);
    Ok(Flow::Ok)
}

/// `byte.len str`: length in bytes.
fn cmd_byte_len(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let len = interp.heap.as_str(argv[1])?.len();
    interp.set_last_int(len as i64);
    Ok(Flow::Ok)
}

/// `str.append obj str`: appends in place.
fn cmd_append(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let src = interp.heap.as_str(argv[2])?.to_owned();
    interp.heap.str_append(argv[1], &src)?;
    interp.set_last(argv[1]);
    Ok(Flow::Ok)
}

/// `str.split str delim`: the list of substrings between occurrences of
/// `delim`.
fn cmd_split(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let delim = interp.heap.as_str(argv[2])?.to_owned();
    if delim.is_empty() {
        return Err(SzlError::new(ErrorKind::BadValue, "empty delim"));
    }
    let s = interp.heap.as_str(argv[1])?.to_owned();
    let list = interp.heap.new_list(Vec::new());
    for part in s.split(delim.as_str()) {
        let item = interp.heap.new_str(part);
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

/// `str.join delim ?obj?...`: string forms joined with `delim`, without
/// list-style brace wrapping.
fn cmd_join(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let delim = interp.heap.as_str(argv[1])?.to_owned();
    let joined = interp.heap.join(&delim, &argv[2..], false)?;
    interp.set_last_str(&joined);
    Ok(Flow::Ok)
}

/// `str.range str start end`: characters `start..=end`.
fn cmd_range(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let chars = interp.heap.as_wstr(argv[1])?.to_vec();
    let start = interp.heap.as_int(argv[2])?;
    if start < 0 || start as usize >= chars.len() {
        return Err(SzlError::new(
            ErrorKind::BadIndex,
            format!("bad start index: {start}"),
        ));
    }
    let end = interp.heap.as_int(argv[3])?;
    if end < start || end as usize >= chars.len() {
        return Err(SzlError::new(
            ErrorKind::BadIndex,
            format!("bad end index: {end}"),
        ));
    }
    let slice: String = chars[start as usize..=end as usize].iter().collect();
    interp.set_last_str(&slice);
    Ok(Flow::Ok)
}

/// `str.in str sub`: substring containment.
fn cmd_in(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let sub = interp.heap.as_str(argv[2])?.to_owned();
    let s = interp.heap.as_str(argv[1])?;
    let found = s.contains(&sub);
    interp.set_last_bool(found);
    Ok(Flow::Ok)
}

/// `ltrim str`
fn cmd_ltrim(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let s = interp.heap.as_str(argv[1])?;
    let trimmed = s.trim_start_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n')).to_owned();
    interp.set_last_str(&trimmed);
    Ok(Flow::Ok)
}

/// `rtrim str`
fn cmd_rtrim(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let s = interp.heap.as_str(argv[1])?;
    let trimmed = s.trim_end_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n')).to_owned();
    interp.set_last_str(&trimmed);
    Ok(Flow::Ok)
}

const EXPORTS: &[ExtExport] = &[
    ExtExport::Proc {
        name: "format",
        min_args: Some(2),
        max_args: None,
        help: Some("fmt ?obj?..."),
        handler: cmd_format,
    },
    ExtExport::Proc {
        name: "str.len",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("str"),
        handler: cmd_len,
    },
    ExtExport::Proc {
        name: "byte.len",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("str"),
        handler: cmd_byte_len,
    },
    ExtExport::Proc {
        name: "str.append",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("obj str"),
        handler: cmd_append,
    },
    ExtExport::Proc {
        name: "str.split",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("str delim"),
        handler: cmd_split,
    },
    ExtExport::Proc {
        name: "str.join",
        min_args: Some(3),
        max_args: None,
        help: Some("delim ?obj?..."),
        handler: cmd_join,
    },
    ExtExport::Proc {
        name: "str.range",
        min_args: Some(4),
        max_args: Some(4),
        help: Some("str start end"),
        handler: cmd_range,
    },
    ExtExport::Proc {
        name: "str.in",
        min_args: Some(3),
        max_args: Some(3),
        help: Some("str sub"),
        handler: cmd_in,
    },
    ExtExport::Proc {
        name: "ltrim",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("str"),
        handler: cmd_ltrim,
    },
    ExtExport::Proc {
        name: "rtrim",
        min_args: Some(2),
        max_args: Some(2),
        help: Some("str"),
        handler: cmd_rtrim,
    },
];

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    interp.register_extension("str", EXPORTS)
}
