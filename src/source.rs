//! Byte supply abstraction.
//!
//! The decoders pull input through [`ByteSource`], one bounded request
//! at a time. A source reports end-of-data by returning 0; it is never
//! asked to seek.

/// Sequential byte supplier.
pub trait ByteSource {
    /// Fill `buf` with up to `buf.len()` bytes and return the number
    /// actually written. 0 means end of data.
    fn fill(&mut self, buf: &mut [u8]) -> usize;
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        (**self).fill(buf)
    }
}

/// In-memory source over a byte slice.
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl ByteSource for SliceSource<'_> {
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

/// Source backed by any [`std::io::Read`], e.g. a file.
///
/// Read errors are reported as end-of-data; retry policy belongs to
/// the caller.
#[cfg(feature = "std")]
pub struct ReadSource<R> {
    inner: R,
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ReadSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ByteSource for ReadSource<R> {
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(_) => return 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_reports_eof() {
        let mut src = SliceSource::new(&[1, 2, 3]);
        let mut buf = [0u8; 2];
        assert_eq!(src.fill(&mut buf), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(src.fill(&mut buf), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(src.fill(&mut buf), 0);
    }
}
