//! The stream façade: uniform read/write/accept/close over pluggable
//! transports.
//!
//! A transport implements [`StreamOps`]; the default method bodies report
//! `Unsupported`, so a backend only fills in what it can do. A [`Stream`]
//! wraps one transport with the `closed`/`blocking` state the user-facing
//! stream commands need. Stream objects exposed to scripts are callable
//! values dispatching sub-commands to their backend (see
//! `builtins::io`).

use std::io::{Read, Write};

use crate::error::{SzlError, SzlResult};

/// Outcome of one read: bytes delivered and whether the transport may have
/// more to give.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    pub bytes: usize,
    pub more: bool,
}

/// The transport-specific implementation of an I/O stream.
///
/// Every method has a default body failing with `Unsupported`; backends
/// override the subset they support.
pub trait StreamOps {
    fn read(&mut self, _buf: &mut [u8]) -> SzlResult<ReadOutcome> {
        Err(SzlError::unsupported("read"))
    }

    fn write(&mut self, _buf: &[u8]) -> SzlResult<usize> {
        Err(SzlError::unsupported("write"))
    }

    fn flush(&mut self) -> SzlResult<()> {
        Err(SzlError::unsupported("flush"))
    }

    /// Accepts one pending client, or `None` when nothing is pending.
    fn accept(&mut self) -> SzlResult<Option<Box<dyn StreamOps>>> {
        Err(SzlError::unsupported("accept"))
    }

    /// The underlying OS handle.
    fn handle(&mut self) -> SzlResult<i64> {
        Err(SzlError::unsupported("handle"))
    }

    fn unblock(&mut self) -> SzlResult<()> {
        Err(SzlError::unsupported("unblock"))
    }

    fn rewind(&mut self) -> SzlResult<()> {
        Err(SzlError::unsupported("rewind"))
    }

    fn setopt(&mut self, _key: &str, _value: &str) -> SzlResult<()> {
        Err(SzlError::unsupported("setopt"))
    }

    /// Releases transport resources. Called at most once.
    fn close(&mut self) {}
}

const STREAM_BUFSIZ: usize = 4096;

/// A transport plus the interpreter-facing stream state.
#[derive(Debug)]
pub struct Stream {
    ops: Box<dyn StreamOps>,
    closed: bool,
    blocking: bool,
}

impl std::fmt::Debug for dyn StreamOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StreamOps")
    }
}

impl Stream {
    #[must_use]
    pub fn new(ops: Box<dyn StreamOps>) -> Self {
        Self {
            ops,
            closed: false,
            blocking: true,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self, op: &str) -> SzlResult<()> {
        if self.closed {
            return Err(SzlError::closed(op));
        }
        Ok(())
    }

    /// Reads up to `len` bytes.
    pub fn read(&mut self, len: usize) -> SzlResult<Vec<u8>> {
        self.check_open("read")?;
        let mut buf = vec![0u8; len];
        let outcome = self.ops.read(&mut buf)?;
        buf.truncate(outcome.bytes);
        Ok(buf)
    }

    /// Reads until the transport reports no more data.
    pub fn read_all(&mut self) -> SzlResult<Vec<u8>> {
        self.check_open("read")?;
        let mut out = Vec::new();
        loop {
            let mut chunk = vec![0u8; STREAM_BUFSIZ];
            let outcome = self.ops.read(&mut chunk)?;
            out.extend_from_slice(&chunk[..outcome.bytes]);
            if outcome.bytes == 0 || !outcome.more || !self.blocking {
                break;
            }
        }
        Ok(out)
    }

    /// Reads one line, up to and excluding a newline.
    pub fn read_line(&mut self) -> SzlResult<Vec<u8>> {
        self.check_open("read")?;
        let mut out = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            let outcome = self.ops.read(&mut byte)?;
            if outcome.bytes == 0 || byte[0] == b'\n' {
                break;
            }
            out.push(byte[0]);
            if !outcome.more {
                break;
            }
        }
        Ok(out)
    }

    /// Writes the whole buffer, returning the byte count written. A blocking
    /// stream that cannot take the full buffer is an error.
    pub fn write(&mut self, buf: &[u8]) -> SzlResult<usize> {
        self.check_open("write")?;
        let mut written = 0;
        while written < buf.len() {
            let chunk = self.ops.write(&buf[written..])?;
            if chunk == 0 {
                break;
            }
            written += chunk;
        }
        if self.blocking && written != buf.len() {
            return Err(SzlError::new(
                crate::error::ErrorKind::Io,
                "short write to stream",
            ));
        }
        Ok(written)
    }

    pub fn flush(&mut self) -> SzlResult<()> {
        self.check_open("flush")?;
        self.ops.flush()
    }

    /// Accepts pending clients; a blocking stream accepts exactly one.
    pub fn accept(&mut self) -> SzlResult<Vec<Stream>> {
        self.check_open("accept")?;
        let mut clients = Vec::new();
        loop {
            match self.ops.accept()? {
                Some(ops) => clients.push(Self::new(ops)),
                None => break,
            }
            if self.blocking {
                break;
            }
        }
        Ok(clients)
    }

    pub fn handle(&mut self) -> SzlResult<i64> {
        self.check_open("handle")?;
        self.ops.handle()
    }

    pub fn unblock(&mut self) -> SzlResult<()> {
        self.check_open("unblock")?;
        self.ops.unblock()?;
        self.blocking = false;
        Ok(())
    }

    pub fn rewind(&mut self) -> SzlResult<()> {
        self.check_open("rewind")?;
        self.ops.rewind()
    }

    pub fn setopt(&mut self, key: &str, value: &str) -> SzlResult<()> {
        self.check_open("setopt")?;
        self.ops.setopt(key, value)
    }

    /// Closes the stream; later operations fail with `Closed`.
    pub fn close(&mut self) {
        if !self.closed {
            self.ops.close();
            self.closed = true;
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.close();
    }
}

/// The null transport: reads are empty, writes are swallowed.
#[derive(Debug, Default)]
pub struct NullStream;

impl StreamOps for NullStream {
    fn read(&mut self, _buf: &mut [u8]) -> SzlResult<ReadOutcome> {
        Ok(ReadOutcome { bytes: 0, more: false })
    }

    fn write(&mut self, buf: &[u8]) -> SzlResult<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> SzlResult<()> {
        Ok(())
    }

    fn handle(&mut self) -> SzlResult<i64> {
        Ok(-1)
    }
}

/// An in-memory transport with a read cursor; supports `rewind`.
#[derive(Debug, Default)]
pub struct MemoryStream {
    data: Vec<u8>,
    pos: usize,
}

impl MemoryStream {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl StreamOps for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> SzlResult<ReadOutcome> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(ReadOutcome {
            bytes: n,
            more: self.pos < self.data.len(),
        })
    }

    fn write(&mut self, buf: &[u8]) -> SzlResult<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> SzlResult<()> {
        Ok(())
    }

    fn rewind(&mut self) -> SzlResult<()> {
        self.pos = 0;
        Ok(())
    }
}

/// Standard input as a stream transport.
#[derive(Debug, Default)]
pub struct StdinStream;

impl StreamOps for StdinStream {
    fn read(&mut self, buf: &mut [u8]) -> SzlResult<ReadOutcome> {
        let bytes = std::io::stdin().read(buf)?;
        Ok(ReadOutcome { bytes, more: bytes > 0 })
    }

    fn handle(&mut self) -> SzlResult<i64> {
        Ok(0)
    }
}

/// Standard output or standard error as a stream transport.
#[derive(Debug)]
pub struct StdoutStream {
    stderr: bool,
}

impl StdoutStream {
    #[must_use]
    pub fn stdout() -> Self {
        Self { stderr: false }
    }

    #[must_use]
    pub fn stderr() -> Self {
        Self { stderr: true }
    }
}

impl StreamOps for StdoutStream {
    fn write(&mut self, buf: &[u8]) -> SzlResult<usize> {
        if self.stderr {
            std::io::stderr().write_all(buf)?;
        } else {
            std::io::stdout().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> SzlResult<()> {
        if self.stderr {
            std::io::stderr().flush()?;
        } else {
            std::io::stdout().flush()?;
        }
        Ok(())
    }

    fn handle(&mut self) -> SzlResult<i64> {
        Ok(if self.stderr { 2 } else { 1 })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn memory_stream_round_trips_and_rewinds() {
        let mut stream = Stream::new(Box::new(MemoryStream::default()));
        stream.write(b"ab\ncd").unwrap();
        stream.rewind().unwrap();
        assert_eq!(stream.read_line().unwrap(), b"ab");
        assert_eq!(stream.read_all().unwrap(), b"cd");
    }

    #[test]
    fn closed_streams_refuse_all_operations() {
        let mut stream = Stream::new(Box::new(MemoryStream::default()));
        stream.close();
        let err = stream.write(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
        let err = stream.read(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
    }

    #[test]
    fn missing_methods_report_unsupported() {
        let mut stream = Stream::new(Box::new(NullStream));
        let err = stream.accept().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = stream.rewind().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn null_stream_reads_nothing_and_swallows_writes() {
        let mut stream = Stream::new(Box::new(NullStream));
        assert_eq!(stream.read_all().unwrap(), b"");
        assert_eq!(stream.write(b"gone").unwrap(), 4);
    }
}
