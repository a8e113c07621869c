//! Pass-through writer that tallies the bytes it forwards.

use std::io::{self, Write};

/// Forwards writes to an inner sink while counting every byte accepted.
///
/// Placed in front of a compressor, the count is the uncompressed size of
/// the stream, independent of what the compressor emits.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wrap `inner` with a zeroed counter.
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// Bytes accepted so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Unwrap, returning the inner sink and the final count.
    pub fn into_parts(self) -> (W, u64) {
        (self.inner, self.count)
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_forwarded_bytes() {
        let mut w = CountingWriter::new(Vec::new());
        w.write_all(b"hello ").unwrap();
        w.write_all(b"world").unwrap();
        assert_eq!(w.count(), 11);

        let (inner, count) = w.into_parts();
        assert_eq!(inner, b"hello world");
        assert_eq!(count, 11);
    }

    #[test]
    fn test_short_writes_count_only_accepted_bytes() {
        // A sink that takes at most 3 bytes per call.
        struct Trickle(Vec<u8>);
        impl Write for Trickle {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let n = buf.len().min(3);
                self.0.extend_from_slice(&buf[..n]);
                Ok(n)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut w = CountingWriter::new(Trickle(Vec::new()));
        assert_eq!(w.write(b"abcdefg").unwrap(), 3);
        assert_eq!(w.count(), 3);
        w.write_all(b"defg").unwrap();
        assert_eq!(w.count(), 7);
    }

    #[test]
    fn test_counts_uncompressed_side_of_encoder() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let payload = vec![b'a'; 64 * 1024];
        let mut w = CountingWriter::new(GzEncoder::new(Vec::new(), Compression::fast()));
        w.write_all(&payload).unwrap();
        let (encoder, count) = w.into_parts();
        let compressed = encoder.finish().unwrap();

        assert_eq!(count, payload.len() as u64);
        assert!((compressed.len() as u64) < count);
    }
}
