//! Output channels for streamed documents.
//!
//! A [`ChunkSink`] accepts string chunks in order. A write returns only once
//! the channel can take the next chunk, so a slow reader suspends the encoder
//! instead of letting output pile up in memory. Errors are terminal: the
//! encoder never retries a failed write.

use std::io::{self, Write};

/// An ordered, backpressured output channel.
pub trait ChunkSink {
    /// Write one chunk. Returns when it is safe to write again.
    fn write_chunk(&mut self, chunk: &str) -> io::Result<()>;
}

impl<S: ChunkSink + ?Sized> ChunkSink for &mut S {
    fn write_chunk(&mut self, chunk: &str) -> io::Result<()> {
        (**self).write_chunk(chunk)
    }
}

/// Sink over a blocking [`Write`].
///
/// `write_all` blocks while the underlying channel is full (a pipe whose
/// reader has not caught up), which is the backpressure signal. A reader that
/// goes away surfaces as `BrokenPipe`.
pub struct WriterSink<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush and hand back the writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> ChunkSink for WriterSink<W> {
    fn write_chunk(&mut self, chunk: &str) -> io::Result<()> {
        self.inner.write_all(chunk.as_bytes())?;
        self.written += chunk.len() as u64;
        Ok(())
    }
}

/// In-memory sink.
///
/// With a byte limit it refuses the first chunk that would cross it, the way
/// a disconnected consumer stops accepting data.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: String,
    limit: Option<usize>,
    chunks: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    /// Number of accepted chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }
}

impl ChunkSink for MemorySink {
    fn write_chunk(&mut self, chunk: &str) -> io::Result<()> {
        if let Some(limit) = self.limit {
            if self.buf.len() + chunk.len() > limit {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "consumer stopped reading",
                ));
            }
        }
        self.buf.push_str(chunk);
        self.chunks += 1;
        Ok(())
    }
}
