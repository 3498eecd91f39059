//! Read-only row filter passed down to searchers.

use bit_vec::BitVec;

use crate::record::DeletedBitmap;

/// Borrowed exclusion mask: bit set means the row must not be returned.
///
/// Rows past the end of the mask are not excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitsetView<'a> {
    bits: Option<&'a BitVec>,
}

impl<'a> BitsetView<'a> {
    pub fn new(bits: &'a BitVec) -> Self {
        Self { bits: Some(bits) }
    }

    /// A view that excludes nothing.
    pub fn empty() -> Self {
        Self { bits: None }
    }

    pub fn is_excluded(&self, offset: usize) -> bool {
        self.bits
            .and_then(|bits| bits.get(offset))
            .unwrap_or(false)
    }

    /// Number of bits covered.
    pub fn len(&self) -> usize {
        self.bits.map_or(0, BitVec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn excluded_count(&self) -> usize {
        self.bits
            .map_or(0, |bits| bits.iter().filter(|bit| *bit).count())
    }
}

impl<'a> From<&'a BitVec> for BitsetView<'a> {
    fn from(bits: &'a BitVec) -> Self {
        Self::new(bits)
    }
}

impl<'a> From<&'a DeletedBitmap> for BitsetView<'a> {
    fn from(bitmap: &'a DeletedBitmap) -> Self {
        Self::new(bitmap.bits())
    }
}
