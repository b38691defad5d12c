//! Big-endian cursor over classfile bytes

use crate::error::{Error, Result};

/// Bounds-checked reader; every failure is a malformed-input error carrying the offset
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::malformed_at(
                self.pos,
                format!("unexpected end of input, wanted {} more bytes", len),
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn u1(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u2(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u4(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u8(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    pub fn i2(&mut self) -> Result<i16> {
        Ok(self.u2()? as i16)
    }

    pub fn i4(&mut self) -> Result<i32> {
        Ok(self.u4()? as i32)
    }

    /// Skip to the next multiple of four, as switch instructions require
    pub fn align4(&mut self) -> Result<()> {
        let pad = (4 - self.pos % 4) % 4;
        self.take(pad).map(|_| ())
    }

    /// Fail unless the whole input was consumed
    pub fn expect_end(&self, what: &str) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::malformed_at(
                self.pos,
                format!("{} trailing bytes after {}", self.remaining(), what),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian() {
        let mut r = ByteReader::new(&[0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34]);
        assert_eq!(r.u4().unwrap(), 0xCAFEBABE);
        assert_eq!(r.u2().unwrap(), 52);
        assert!(r.is_empty());
    }

    #[test]
    fn test_truncation_is_malformed() {
        let mut r = ByteReader::new(&[0x00]);
        let err = r.u2().unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        r.u1().unwrap();
        assert!(r.expect_end("class").is_err());
    }
}
