//! Stream command objects and the standard stream set.
//!
//! A stream is exposed to scripts as a callable value whose handler
//! dispatches sub-commands (`read`, `write`, `close`, …) to the shared
//! [`Stream`] stored in the command's private data. The package installs the
//! standard streams `in`, `out`, `err` and the `null` sink under those
//! names.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ErrorKind, Flow, SzlError, SzlResult};
use crate::heap::ObjId;
use crate::interp::Interp;
use crate::stream::{NullStream, StdinStream, StdoutStream, Stream};
use crate::value::CmdData;

const STREAM_HELP: &str = "read|readln|write|writeln|flush|close|accept|handle|unblock|rewind|setopt ?arg?...";

impl Interp {
    /// Wraps `stream` in a callable value and binds it in the global frame.
    ///
    /// Without an explicit name a unique `kind:xxxxxxxx` name is generated,
    /// the way procedure objects are named. Returns an owned reference to
    /// the stream object.
    pub fn new_stream(
        &mut self,
        name: Option<&str>,
        stream: Stream,
        kind: &str,
    ) -> SzlResult<ObjId> {
        let generated;
        let name = match name {
            Some(name) => name,
            None => {
                generated = self.unique_name(kind);
                &generated
            }
        };
        self.register_command(
            name,
            Some(2),
            Some(4),
            Some(STREAM_HELP),
            stream_dispatch,
            CmdData::Stream(Rc::new(RefCell::new(stream))),
        )
    }
}

fn shared_stream(interp: &Interp, cmd: ObjId) -> SzlResult<Rc<RefCell<Stream>>> {
    match &interp
        .heap
        .get(cmd)
        .cmd
        .as_ref()
        .expect("stream object is callable")
        .data
    {
        CmdData::Stream(stream) => Ok(Rc::clone(stream)),
        _ => Err(SzlError::unsupported("stream op")),
    }
}

fn bytes_to_value(interp: &mut Interp, bytes: Vec<u8>) -> SzlResult<()> {
    let text = String::from_utf8(bytes)
        .map_err(|_| SzlError::new(ErrorKind::BadValue, "stream data is not valid utf-8"))?;
    interp.set_last_str(&text);
    Ok(())
}

/// Handler attached to every stream object.
fn stream_dispatch(interp: &mut Interp, argv: &[ObjId]) -> SzlResult {
    let stream = shared_stream(interp, argv[0])?;
    let op = interp.heap.as_str(argv[1])?.to_owned();
    match (argv.len(), op.as_str()) {
        (3, "read") => {
            let requested = interp.heap.as_int(argv[2])?;
            if requested <= 0 {
                return Ok(Flow::Ok);
            }
            let data = stream.borrow_mut().read(requested as usize)?;
            bytes_to_value(interp, data)?;
        }
        (2, "read") => {
            let data = stream.borrow_mut().read_all()?;
            bytes_to_value(interp, data)?;
        }
        (2, "readln") => {
            let data = stream.borrow_mut().read_line()?;
            bytes_to_value(interp, data)?;
        }
        (3, "write") => {
            let buf = interp.heap.as_str(argv[2])?.to_owned();
            let written = stream.borrow_mut().write(buf.as_bytes())?;
            interp.set_last_int(written as i64);
        }
        (3, "writeln") => {
            let mut buf = interp.heap.as_str(argv[2])?.to_owned();
            if !buf.ends_with('\n') {
                buf.push('\n');
            }
            let written = stream.borrow_mut().write(buf.as_bytes())?;
            interp.set_last_int(written as i64);
        }
        (2, "flush") => stream.borrow_mut().flush()?,
        (2, "close") => stream.borrow_mut().close(),
        (2, "accept") => {
            let clients = stream.borrow_mut().accept()?;
            let list = interp.heap.new_list(Vec::new());
            for client in clients {
                match interp.new_stream(None, client, "stream.client") {
                    Ok(id) => {
                        let appended = interp.heap.list_append(list, id);
                        interp.heap.dec_ref(id);
                        if let Err(err) = appended {
                            interp.heap.dec_ref(list);
                            return Err(err);
                        }
                    }
                    Err(err) => {
                        interp.heap.dec_ref(list);
                        return Err(err);
                    }
                }
            }
            interp.set_last_owned(list);
        }
        (2, "handle") => {
            let handle = stream.borrow_mut().handle()?;
            interp.set_last_int(handle);
        }
        (2, "unblock") => stream.borrow_mut().unblock()?,
        (2, "rewind") => stream.borrow_mut().rewind()?,
        (4, "setopt") => {
            let key = interp.heap.as_str(argv[2])?.to_owned();
            let value = interp.heap.as_str(argv[3])?.to_owned();
            stream.borrow_mut().setopt(&key, &value)?;
        }
        _ => return Err(interp.usage_error(argv[0])),
    }
    Ok(Flow::Ok)
}

pub(crate) fn register(interp: &mut Interp) -> SzlResult<()> {
    let streams: [(&str, Stream); 4] = [
        ("in", Stream::new(Box::new(StdinStream))),
        ("out", Stream::new(Box::new(StdoutStream::stdout()))),
        ("err", Stream::new(Box::new(StdoutStream::stderr()))),
        ("null", Stream::new(Box::new(NullStream))),
    ];
    for (name, stream) in streams {
        let id = interp.new_stream(Some(name), stream, "stream")?;
        interp.heap.dec_ref(id);
    }
    interp.register_extension("io", &[])
}
