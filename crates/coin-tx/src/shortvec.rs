//! Compact length encoding used throughout the transaction wire format
//!
//! Lengths are written as little-endian base-128 groups with a continuation
//! bit, at most three bytes, and never above `u16::MAX`.

use coin_core::TxError;

const MAX_ENCODING_BYTES: usize = 3;

/// Append `len` in compact form
pub fn encode_len(bytes: &mut Vec<u8>, len: usize) -> Result<(), TxError> {
    let mut n = u16::try_from(len).map_err(|_| TxError::Malformed {
        message: format!("length {} exceeds compact-u16 range", len),
    })?;
    loop {
        let mut byte = (n & 0x7F) as u8;
        n >>= 7;
        if n != 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
        if n == 0 {
            break;
        }
    }
    Ok(())
}

/// Decode a compact length, returning the value and bytes consumed
pub fn decode_len(bytes: &[u8]) -> Result<(usize, usize), TxError> {
    let mut result: u32 = 0;
    for (i, &byte) in bytes.iter().enumerate().take(MAX_ENCODING_BYTES) {
        result |= u32::from(byte & 0x7F) << (i * 7);
        if byte & 0x80 == 0 {
            // An all-zero trailing group is an alias of a shorter form
            if i > 0 && byte == 0 {
                return Err(TxError::Malformed {
                    message: "non-canonical compact length".to_string(),
                });
            }
            if result > u32::from(u16::MAX) {
                return Err(TxError::Malformed {
                    message: format!("compact length {} overflows u16", result),
                });
            }
            return Ok((result as usize, i + 1));
        }
    }
    Err(TxError::Malformed {
        message: "truncated or oversized compact length".to_string(),
    })
}

/// Cursor over wire bytes
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn peek_u8(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, TxError> {
        let byte = self.peek_u8().ok_or_else(|| self.eof("u8"))?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_len(&mut self) -> Result<usize, TxError> {
        let (len, used) = decode_len(&self.bytes[self.pos..])?;
        self.pos += used;
        Ok(len)
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], TxError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(self.eof("bytes")),
        }
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TxError> {
        let slice = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn eof(&self, what: &str) -> TxError {
        TxError::Malformed {
            message: format!("unexpected end of input reading {} at offset {}", what, self.pos),
        }
    }
}
