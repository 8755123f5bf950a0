//! Primitive marshallers
//!
//! Staging of host byte buffers into the NUL-terminated strings libxml2
//! expects, and ownership of buffers libxml2 hands back. Every staged value
//! is owned by the call that created it and released when it goes out of
//! scope, so early `?` returns never leak.

use crate::error::Reason;
use crate::ffi::{self, XmlChar};
use libc::c_char;
use std::ffi::{CStr, CString};
use std::ops::Deref;
use std::ptr::{self, NonNull};

/// A host byte buffer copied into a NUL-terminated native string.
///
/// Bytes after an interior NUL are dropped: libxml2 would stop reading
/// there anyway.
pub struct NativeString {
    inner: CString,
}

impl NativeString {
    pub fn stage(bytes: &[u8]) -> Result<Self, Reason> {
        let len = memchr::memchr(0, bytes).unwrap_or(bytes.len());

        let mut buf = Vec::new();
        buf.try_reserve_exact(len + 1)
            .map_err(|_| Reason::MallocFailed)?;
        buf.extend_from_slice(&bytes[..len]);
        buf.push(0);

        // SAFETY: exactly one NUL, at the end
        let inner = unsafe { CString::from_vec_with_nul_unchecked(buf) };
        Ok(NativeString { inner })
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.inner.as_ptr()
    }

    pub fn as_xml_ptr(&self) -> *const XmlChar {
        self.inner.as_ptr() as *const XmlChar
    }

    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }
}

/// A NULL-terminated array of staged strings (`xmlChar **`).
///
/// An empty list stages as a NULL array pointer.
pub struct NativeStringList {
    // owns the strings `ptrs` points into
    _staged: Vec<NativeString>,
    ptrs: Vec<*mut XmlChar>,
}

impl NativeStringList {
    /// Stage every item with `stage_item`.
    ///
    /// On the first failing item, everything staged so far is released
    /// before the failure is returned.
    pub fn stage_with<I, F>(items: I, mut stage_item: F) -> Result<Self, Reason>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Result<NativeString, Reason>,
    {
        let items = items.into_iter();
        let (hint, _) = items.size_hint();

        let mut strings = Vec::new();
        strings
            .try_reserve_exact(hint)
            .map_err(|_| Reason::MallocFailed)?;
        for item in items {
            strings.push(stage_item(item)?);
        }

        let mut ptrs = Vec::new();
        if !strings.is_empty() {
            ptrs.try_reserve_exact(strings.len() + 1)
                .map_err(|_| Reason::MallocFailed)?;
            ptrs.extend(strings.iter().map(|s| s.as_xml_ptr() as *mut XmlChar));
            ptrs.push(ptr::null_mut());
        }

        Ok(NativeStringList {
            _staged: strings,
            ptrs,
        })
    }

    #[cfg(test)]
    pub fn stage(items: &[&[u8]]) -> Result<Self, Reason> {
        Self::stage_with(items.iter().copied(), NativeString::stage)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.ptrs.len().saturating_sub(1)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.ptrs.is_empty()
    }

    /// Pointer for libxml2; valid while `self` is alive. libxml2 only reads
    /// through it.
    pub fn as_mut_ptr(&mut self) -> *mut *mut XmlChar {
        if self.ptrs.is_empty() {
            ptr::null_mut()
        } else {
            self.ptrs.as_mut_ptr()
        }
    }
}

/// A buffer allocated by libxml2, released with `xmlFree` on drop.
pub struct LibxmlBuffer {
    ptr: NonNull<XmlChar>,
    len: usize,
}

impl LibxmlBuffer {
    /// # Safety
    ///
    /// `ptr` must come from libxml2's allocator, hold at least `len`
    /// initialised bytes, and not be freed by anyone else.
    pub unsafe fn from_raw(ptr: NonNull<XmlChar>, len: usize) -> Self {
        LibxmlBuffer { ptr, len }
    }
}

impl Deref for LibxmlBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: guaranteed by `from_raw`
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for LibxmlBuffer {
    fn drop(&mut self) {
        // SAFETY: sole owner of a libxml2 allocation
        unsafe { ffi::xml_free(self.ptr.as_ptr().cast()) }
    }
}

/// Borrow the bytes of a NUL-terminated libxml2 string, terminator excluded.
///
/// # Safety
///
/// `ptr` must point at a live NUL-terminated string that outlives `'a`.
pub unsafe fn xml_char_bytes<'a>(ptr: NonNull<XmlChar>) -> &'a [u8] {
    CStr::from_ptr(ptr.as_ptr() as *const c_char).to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_appends_terminator() {
        let s = NativeString::stage(b"/a/b").unwrap();
        assert_eq!(s.as_bytes(), b"/a/b");
        // SAFETY: staged string is NUL-terminated
        let back = unsafe { CStr::from_ptr(s.as_ptr()) };
        assert_eq!(back.to_bytes(), b"/a/b");
    }

    #[test]
    fn test_stage_truncates_at_interior_nul() {
        let s = NativeString::stage(b"abc\0def").unwrap();
        assert_eq!(s.as_bytes(), b"abc");
    }

    #[test]
    fn test_stage_empty() {
        let s = NativeString::stage(b"").unwrap();
        assert_eq!(s.as_bytes(), b"");
        assert!(!s.as_ptr().is_null());
    }

    #[test]
    fn test_empty_list_is_null_array() {
        let mut list = NativeStringList::stage(&[]).unwrap();
        assert!(list.is_empty());
        assert!(list.as_mut_ptr().is_null());
    }

    #[test]
    fn test_list_is_null_terminated() {
        let mut list = NativeStringList::stage(&[&b"xs"[..], &b"ds"[..]]).unwrap();
        assert_eq!(list.len(), 2);

        let arr = list.as_mut_ptr();
        // SAFETY: array has len + 1 entries while `list` lives
        unsafe {
            let first = CStr::from_ptr(*arr as *const c_char);
            let second = CStr::from_ptr(*arr.add(1) as *const c_char);
            assert_eq!(first.to_bytes(), b"xs");
            assert_eq!(second.to_bytes(), b"ds");
            assert!((*arr.add(2)).is_null());
        }
    }

    #[test]
    fn test_list_pointers_survive_move() {
        fn build() -> NativeStringList {
            NativeStringList::stage(&[&b"xs"[..]]).unwrap()
        }
        let mut boxed = Box::new(build());
        assert_eq!(boxed.len(), 1);

        let arr = boxed.as_mut_ptr();
        // SAFETY: staged strings moved with the list and are still owned by it
        unsafe {
            assert_eq!(CStr::from_ptr(*arr as *const c_char).to_bytes(), b"xs");
            assert!((*arr.add(1)).is_null());
        }
    }

    #[test]
    fn test_list_failure_reports_reason() {
        let items: [Option<&[u8]>; 3] = [Some(&b"a"[..]), None, Some(&b"c"[..])];
        let result = NativeStringList::stage_with(items, |item| {
            NativeString::stage(item.ok_or(Reason::FailedToInspectBinary)?)
        });
        assert_eq!(result.err(), Some(Reason::FailedToInspectBinary));
    }

    #[cfg(feature = "memory_tracking")]
    #[test]
    fn test_list_failure_releases_partial_staging() {
        use crate::tracking::thread_outstanding;

        let items: [Option<&[u8]>; 3] = [Some(&b"ns1"[..]), Some(&b"ns2"[..]), None];

        let before = thread_outstanding();
        let result = NativeStringList::stage_with(items, |item| {
            NativeString::stage(item.ok_or(Reason::FailedToInspectBinary)?)
        });
        let after = thread_outstanding();

        assert!(result.is_err());
        assert_eq!(before, after);
    }

    #[cfg(feature = "memory_tracking")]
    #[test]
    fn test_staged_string_released_on_drop() {
        use crate::tracking::thread_outstanding;

        let before = thread_outstanding();
        {
            let s = NativeString::stage(b"http://www.w3.org/2001/XMLSchema").unwrap();
            assert!(thread_outstanding() > before);
            assert!(!s.as_bytes().is_empty());
        }
        assert_eq!(thread_outstanding(), before);
    }
}
