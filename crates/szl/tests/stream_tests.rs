//! Stream façade tests: scripts driving stream command objects.

use pretty_assertions::assert_eq;
use szl::{Interp, MemoryStream, Status, Stream};

fn interp_with_memory_stream(name: &str) -> Interp {
    let mut interp = Interp::new();
    let id = interp
        .new_stream(Some(name), Stream::new(Box::new(MemoryStream::default())), "stream")
        .unwrap();
    // The stream stays reachable through its global binding.
    interp.release(id);
    interp
}

/// Writing, rewinding, and reading a line back.
#[test]
fn memory_stream_write_then_read() {
    let mut interp = interp_with_memory_stream("mem");
    assert_eq!(interp.run("mem writeln hello\nmem rewind\nmem readln"), Status::Ok);
    assert_eq!(interp.last_string().unwrap(), "hello");
}

/// `write` reports the byte count written.
#[test]
fn write_reports_byte_count() {
    let mut interp = interp_with_memory_stream("mem");
    assert_eq!(interp.run("mem write abc"), Status::Ok);
    assert_eq!(interp.last_string().unwrap(), "3");
}

/// A stream object is a value: it can be passed through variables and
/// dispatched via `$`.
#[test]
fn stream_dispatch_through_variable() {
    let mut interp = interp_with_memory_stream("mem");
    let status = interp.run("set f [echo mem]\nmem write xyz\nmem rewind\n$f read");
    assert_eq!(status, Status::Ok);
    assert_eq!(interp.last_string().unwrap(), "xyz");
}

/// Operations after `close` fail with a closed-stream diagnostic.
#[test]
fn closed_stream_operations_fail() {
    let mut interp = interp_with_memory_stream("mem");
    assert_eq!(interp.run("mem close\nmem read"), Status::Error);
    assert_eq!(interp.last_string().unwrap(), "read on closed stream");
}

/// Methods the backend does not implement report `Unsupported`.
#[test]
fn unsupported_operations_fail() {
    let mut interp = Interp::new();
    assert_eq!(interp.run("null accept"), Status::Error);
    assert_eq!(interp.last_string().unwrap(), "accept on unsupported stream");
}

/// The null stream swallows writes and reads nothing.
#[test]
fn null_stream_behaviour() {
    let mut interp = Interp::new();
    assert_eq!(interp.run("null write anything"), Status::Ok);
    assert_eq!(interp.last_string().unwrap(), "8");
    assert_eq!(interp.run("null read"), Status::Ok);
    assert_eq!(interp.last_string().unwrap(), "");
}

/// An unknown sub-command is a usage error carrying the stream help text.
#[test]
fn unknown_stream_op_is_usage_error() {
    let mut interp = Interp::new();
    assert_eq!(interp.run("null frobnicate"), Status::Error);
    assert!(interp.last_string().unwrap().starts_with("bad usage"));
}
