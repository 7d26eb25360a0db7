//! Borrowed views handed to the native side.

use kvbridge_ffi::KvStr;
use std::marker::PhantomData;

/// A `{pointer, length}` view of caller memory for a single call.
///
/// The lifetime ties the view to the slice it was made from, so the
/// memory cannot move or be freed while the call that uses it runs. No
/// bytes are copied and nothing needs to be released.
#[derive(Debug, Clone, Copy)]
pub struct BorrowedView<'a> {
    raw: KvStr,
    _borrow: PhantomData<&'a [u8]>,
}

impl<'a> BorrowedView<'a> {
    /// Views `bytes`. An empty slice gives a present, empty view.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            raw: KvStr::from_bytes(bytes),
            _borrow: PhantomData,
        }
    }

    /// Views the UTF-8 bytes of `text`.
    pub fn from_str(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }

    /// Views `bytes`, or gives the absent view for `None`.
    pub fn optional(bytes: Option<&'a [u8]>) -> Self {
        bytes.map_or_else(Self::absent, Self::new)
    }

    /// The absent view.
    pub fn absent() -> Self {
        Self {
            raw: KvStr::null(),
            _borrow: PhantomData,
        }
    }

    /// Returns true for the absent view.
    pub fn is_absent(&self) -> bool {
        self.raw.is_null()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.raw.len
    }

    /// Returns true if the view has no bytes.
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    pub(crate) fn raw(&self) -> KvStr {
        self.raw
    }
}

impl<'a> From<&'a str> for BorrowedView<'a> {
    fn from(text: &'a str) -> Self {
        Self::from_str(text)
    }
}

impl<'a> From<&'a [u8]> for BorrowedView<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_present() {
        let view = BorrowedView::from_str("");
        assert!(!view.is_absent());
        assert!(view.is_empty());

        let absent = BorrowedView::optional(None);
        assert!(absent.is_absent());
        assert_eq!(absent.len(), 0);
    }

    #[test]
    fn no_copy() {
        let text = String::from("shared");
        let view = BorrowedView::from(text.as_str());
        assert_eq!(view.raw().ptr, text.as_ptr());
        assert_eq!(view.len(), 6);
    }
}
