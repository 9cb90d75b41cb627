use super::super::common::map_error::MapError;
use super::transformation::zigzag_decode;

// Protobuf wire types
const VARINT: u32 = 0;
const FIXED64: u32 = 1;
const LENGTH_DELIMITED: u32 = 2;
const FIXED32: u32 = 5;

/// Cursor over protobuf-encoded bytes. Reads never run past the end of the
/// buffer; truncated input surfaces as a `Pbf` error.
pub struct Pbf<'a> {
    data: &'a [u8],
    inx: usize,
    pub value: u32,
    pub tag: u32,
}

impl<'a> Pbf<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Pbf {
            data,
            inx: 0,
            value: 0,
            tag: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.inx < self.data.len()
    }

    pub fn wire_type(&self) -> u32 {
        self.value & 0x7
    }

    fn take(&mut self, bytes: usize) -> Result<&'a [u8], MapError> {
        let end = self
            .inx
            .checked_add(bytes)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| MapError::pbf("read beyond the end of the data"))?;
        let chunk = &self.data[self.inx..end];
        self.inx = end;
        Ok(chunk)
    }

    pub fn skip_bytes(&mut self, bytes: usize) -> Result<(), MapError> {
        self.take(bytes).map(|_| ())
    }

    pub fn boolean(&mut self) -> Result<bool, MapError> {
        Ok(self.varint64()? != 0)
    }

    pub fn varint32(&mut self) -> Result<u32, MapError> {
        // Fields declared as 32-bit may still be sign-extended to ten bytes.
        Ok(self.varint64()? as u32)
    }

    pub fn varint64(&mut self) -> Result<u64, MapError> {
        let mut result: u64 = 0;
        let mut bitpos: u32 = 0;

        while bitpos < 70 {
            let byte = match self.data.get(self.inx) {
                Some(byte) => *byte,
                None => return Err(MapError::pbf("unterminated varint")),
            };
            self.inx += 1;
            if bitpos < 64 {
                result |= ((byte & 0x7F) as u64) << bitpos;
            }
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            bitpos += 7;
        }

        Err(MapError::pbf("varint too long"))
    }

    pub fn svarint32(&mut self) -> Result<i32, MapError> {
        Ok(zigzag_decode(self.varint32()?))
    }

    pub fn svarint64(&mut self) -> Result<i64, MapError> {
        let n = self.varint64()?;
        Ok((n >> 1) as i64 ^ -((n & 1) as i64))
    }

    /// Reads the next field key into `value` / `tag`.
    pub fn next(&mut self) -> Result<bool, MapError> {
        if self.has_next() {
            self.value = self.varint32()?;
            self.tag = self.value >> 3;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn skip(&mut self) -> Result<(), MapError> {
        match self.wire_type() {
            VARINT => self.varint64().map(|_| ()),
            FIXED64 => self.skip_bytes(8),
            LENGTH_DELIMITED => {
                let bytes = self.varint32()? as usize;
                self.skip_bytes(bytes)
            }
            FIXED32 => self.skip_bytes(4),
            other => Err(MapError::pbf(&format!("unknown wire type {}", other))),
        }
    }

    pub fn fixed32(&mut self) -> Result<f32, MapError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(f32::from_le_bytes(bytes))
    }

    pub fn fixed64(&mut self) -> Result<f64, MapError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(f64::from_le_bytes(bytes))
    }

    pub fn string(&mut self) -> Result<String, MapError> {
        let bytes = self.varint32()? as usize;
        let chunk = self.take(bytes)?;
        Ok(String::from_utf8_lossy(chunk).into_owned())
    }

    pub fn message(&mut self) -> Result<Pbf<'a>, MapError> {
        let bytes = self.varint32()? as usize;
        Ok(Pbf::new(self.take(bytes)?))
    }

    /// Reads a repeated uint32 field, packed or not. Unpacked fields arrive
    /// one element per key, so this appends to `out`.
    pub fn repeated_u32(&mut self, out: &mut Vec<u32>) -> Result<(), MapError> {
        if self.wire_type() == LENGTH_DELIMITED {
            let mut packed = self.message()?;
            while packed.has_next() {
                out.push(packed.varint32()?);
            }
        } else {
            out.push(self.varint32()?);
        }
        Ok(())
    }
}
