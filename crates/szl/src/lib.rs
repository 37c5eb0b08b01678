#![doc = include_str!("../../../README.md")]
#![allow(clippy::cast_possible_truncation)] // numeric narrowing mirrors the wire formats
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

mod builtins;
mod dict;
mod error;
mod frame;
mod heap;
mod interp;
mod parse;
mod repl;
mod stream;
mod tracer;
mod value;

pub use crate::{
    error::{ErrorKind, Flow, Status, SzlError, SzlResult},
    heap::{HeapStats, ObjId},
    interp::{DEFAULT_MAX_NESTING, ExtExport, Interp, Limits},
    parse::nesting_balance,
    repl::{ReplProgress, ReplSession},
    stream::{MemoryStream, NullStream, ReadOutcome, StdinStream, StdoutStream, Stream, StreamOps},
    tracer::{ExecTracer, NoopTracer, RecordingTracer, StderrTracer},
    value::{CmdData, Handler},
};
