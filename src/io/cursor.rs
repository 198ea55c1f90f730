use crate::error::FormatError;

// =============================================================================
// Endian Helper Functions
// =============================================================================
//
// Every multi-byte value in a PretextMap file is little-endian. The helpers
// assume the caller has already checked the slice length; `ByteCursor` does
// that check and turns a short read into `FormatError::Truncated`.

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian i32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_i32_le(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian f32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_f32_le(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a 24-bit little-endian group from a byte slice into the low bits of a u32.
///
/// # Panics
/// Panics if the slice has fewer than 3 bytes.
#[inline]
pub fn read_u24_le(bytes: &[u8]) -> u32 {
    u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16)
}

// =============================================================================
// ByteCursor
// =============================================================================

/// Forward-only reader over a byte slice with bounds-checked field reads.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Start reading at `pos` (which may be past the end; reads will then fail).
    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    /// Current offset from the start of the underlying slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes, naming `field` in the error if the input is short.
    pub fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], FormatError> {
        let available = self.remaining();
        if len > available {
            return Err(FormatError::Truncated {
                field,
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, FormatError> {
        Ok(self.take(1, field)?[0])
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, FormatError> {
        self.take(4, field).map(read_u32_le)
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, FormatError> {
        self.take(4, field).map(read_i32_le)
    }

    pub fn read_f32(&mut self, field: &'static str) -> Result<f32, FormatError> {
        self.take(4, field).map(read_f32_le)
    }

    /// Read a u64 stored as two little-endian u32 halves, low half first.
    pub fn read_u64_halves(&mut self, field: &'static str) -> Result<u64, FormatError> {
        let low = self.read_u32(field)?;
        let high = self.read_u32(field)?;
        Ok(u64::from(low) | (u64::from(high) << 32))
    }

    /// Read a fixed-size NUL-terminated ASCII buffer.
    ///
    /// The string stops at the first zero byte; anything after it is padding.
    pub fn read_fixed_str(&mut self, len: usize, field: &'static str) -> Result<String, FormatError> {
        let raw = self.take(len, field)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}
