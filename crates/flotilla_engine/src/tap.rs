use std::io::{self, Write};

/// Write adapter that counts bytes on their way into `inner`.
///
/// `on_write(increase, total)` runs after every successful write.
pub struct LengthTap<W, F> {
    inner: W,
    total: u64,
    on_write: F,
}

impl<W, F> LengthTap<W, F>
where
    W: Write,
    F: FnMut(u64, u64),
{
    pub fn new(inner: W, on_write: F) -> Self {
        Self {
            inner,
            total: 0,
            on_write,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W, F> Write for LengthTap<W, F>
where
    W: Write,
    F: FnMut(u64, u64),
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        let increase = written as u64;
        self.total += increase;
        (self.on_write)(increase, self.total);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Fraction of a body received, or `None` when the length was not declared.
pub fn progress_fraction(received: u64, content_length: Option<u64>) -> Option<f64> {
    match content_length? {
        0 => Some(1.0),
        length => Some(received as f64 / length as f64),
    }
}
