use super::AdcError;

/// Row-major sequence of 1-bit codes, `dimension / 8` bytes per vector.
///
/// The store only borrows or wraps the caller's buffer; it is never mutated.
#[derive(Clone, Debug)]
pub struct BinaryCodeStore<T = Vec<u8>> {
    codes: T,
    dimension: usize,
    code_size: usize,
}

impl<T: AsRef<[u8]>> BinaryCodeStore<T> {
    pub fn new(dimension: usize, codes: T) -> Result<Self, AdcError> {
        if dimension == 0 || dimension % 8 != 0 {
            return Err(AdcError::InvalidDimension(dimension));
        }
        let code_size = dimension / 8;
        let len = codes.as_ref().len();
        if len % code_size != 0 {
            return Err(AdcError::MisalignedCodes { len, code_size });
        }
        Ok(Self {
            codes,
            dimension,
            code_size,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Bytes per code.
    pub fn code_size(&self) -> usize {
        self.code_size
    }

    /// Number of stored codes.
    pub fn len(&self) -> usize {
        self.codes.as_ref().len() / self.code_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The packed code of vector `index`, or `None` past the end.
    pub fn code(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(self.code_size)?;
        let end = start.checked_add(self.code_size)?;
        self.codes.as_ref().get(start..end)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.codes.as_ref()
    }
}

/// Packs a vector into bits, most significant bit first. A coordinate maps to
/// 1 when it is strictly positive. Trailing coordinates that do not fill a byte
/// leave the low bits of the last byte unset.
pub fn pack_bits(vector: &[f32]) -> Vec<u8> {
    vector
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .filter(|&(_, &value)| value > 0.0)
                .fold(0u8, |byte, (p, _)| byte | (0x80 >> p))
        })
        .collect()
}

/// Expands the first `dimension` bits of `code` into `0.0` / `1.0` values.
pub fn unpack_bits(code: &[u8], dimension: usize) -> Vec<f32> {
    (0..dimension)
        .map(|i| {
            let bit = code.get(i / 8).map_or(0, |byte| (byte >> (7 - i % 8)) & 1);
            bit as f32
        })
        .collect()
}
