#![forbid(unsafe_code)]

//! Fixed-capacity UTF-16 text.
//!
//! Every constructor follows the same truncation law: at most `CAP - 1`
//! code units are kept and the unit after the last kept one is a NUL
//! terminator. The remaining units stay zero, so the buffer can be written
//! to the wire as is.

use std::{fmt, path::Path};

/// Process image path capacity, in UTF-16 code units.
pub const PROCESS_PATH_CAPACITY: usize = 512;
/// Target file path capacity, in UTF-16 code units.
pub const FILE_PATH_CAPACITY: usize = 1024;

pub type ProcessPath = BoundedText<PROCESS_PATH_CAPACITY>;
pub type FilePath = BoundedText<FILE_PATH_CAPACITY>;

#[derive(Clone, PartialEq, Eq)]
pub struct BoundedText<const CAP: usize> {
    units: [u16; CAP],
    len: usize,
}

impl<const CAP: usize> BoundedText<CAP> {
    /// Largest number of units a value can hold.
    pub const MAX_LEN: usize = CAP.saturating_sub(1);

    pub const fn empty() -> Self {
        Self {
            units: [0; CAP],
            len: 0,
        }
    }

    /// Copy `min(CAP - 1, source.len())` units and terminate.
    pub fn from_units(source: impl IntoIterator<Item = u16>) -> Self {
        let mut text = Self::empty();
        for (slot, unit) in text.units.iter_mut().take(Self::MAX_LEN).zip(source) {
            *slot = unit;
            text.len += 1;
        }
        text
    }

    pub fn from_str_truncated(source: &str) -> Self {
        Self::from_units(source.encode_utf16())
    }

    pub fn from_path_truncated(source: &Path) -> Self {
        Self::from_str_truncated(&source.to_string_lossy())
    }

    /// Read a NUL-terminated (or full) buffer as produced by the wire codec.
    pub fn from_terminated(raw: &[u16]) -> Self {
        Self::from_units(raw.iter().copied().take_while(|&unit| unit != 0))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// The meaningful units, without the terminator.
    pub fn as_units(&self) -> &[u16] {
        &self.units[..self.len]
    }

    /// The whole buffer including terminator and padding.
    pub fn raw(&self) -> &[u16; CAP] {
        &self.units
    }

    /// Lossy because truncation may split a surrogate pair.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_units())
    }
}

impl<const CAP: usize> Default for BoundedText<CAP> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const CAP: usize> fmt::Debug for BoundedText<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl<const CAP: usize> fmt::Display for BoundedText<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn empty_is_all_zero() {
        let text = FilePath::default();
        assert!(text.is_empty());
        assert!(text.raw().iter().all(|&unit| unit == 0));
    }

    #[test]
    fn exact_fit_keeps_everything() {
        let source = "a".repeat(ProcessPath::MAX_LEN);
        let text = ProcessPath::from_str_truncated(&source);
        assert_eq!(text.len(), PROCESS_PATH_CAPACITY - 1);
        assert_eq!(text.raw()[PROCESS_PATH_CAPACITY - 1], 0);
        assert_eq!(text.to_string_lossy(), source);
    }

    #[test]
    fn from_terminated_stops_at_nul() {
        let raw = [b'a' as u16, b'b' as u16, 0, b'c' as u16];
        let text = BoundedText::<8>::from_terminated(&raw);
        assert_eq!(text.to_string_lossy(), "ab");
    }

    proptest! {
        #[test]
        fn truncation_law_holds(source in prop::collection::vec(1u16..=u16::MAX, 0..3000)) {
            let text = FilePath::from_units(source.iter().copied());
            let expected = source.len().min(FILE_PATH_CAPACITY - 1);

            prop_assert_eq!(text.len(), expected);
            prop_assert_eq!(text.as_units(), &source[..expected]);
            prop_assert_eq!(text.raw()[expected], 0);
        }

        #[test]
        fn tiny_capacity_never_overflows(source in ".*") {
            let text = BoundedText::<1>::from_str_truncated(&source);
            prop_assert!(text.is_empty());
        }
    }
}
