//! Handle codec
//!
//! A `Handle` is the integer the host holds in place of a libxml2 address.
//! The host never dereferences it and its garbage collector never owns what
//! it points to: every object behind a handle stays alive until the matching
//! explicit free operation is called, and a freed handle must not be reused.
//!
//! Nullability is decided per call site. Positions that require an object use
//! [`Handle::decode`]/[`Handle::encode`]; optional positions use the `_or_null`
//! variants, where zero stands for "no object".

use crate::error::Reason;
use std::ptr::NonNull;

/// Opaque reference to a libxml2 heap object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Handle(u64);

impl Handle {
    /// The "no object" handle
    pub const NULL: Handle = Handle(0);

    pub fn from_raw(raw: u64) -> Self {
        Handle(raw)
    }

    pub fn into_raw(self) -> u64 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Encode an address that must be non-null.
    pub fn encode<T>(ptr: *const T) -> Result<Self, Reason> {
        if ptr.is_null() {
            return Err(Reason::PointerIsNull);
        }
        Ok(Self::encode_or_null(ptr))
    }

    /// Encode an optional address; null becomes [`Handle::NULL`].
    pub fn encode_or_null<T>(ptr: *const T) -> Self {
        Handle(ptr as usize as u64)
    }

    /// Decode into a non-null address.
    ///
    /// Zero fails with `null_pointer`; a value wider than the platform's
    /// pointer fails with `failed_to_get_pointer`.
    pub fn decode<T>(self) -> Result<NonNull<T>, Reason> {
        self.decode_or_null()?.ok_or(Reason::NullPointer)
    }

    /// Decode into an optional address; `None` is the null marker.
    pub fn decode_or_null<T>(self) -> Result<Option<NonNull<T>>, Reason> {
        let addr = usize::try_from(self.0).map_err(|_| Reason::FailedToGetPointer)?;
        Ok(NonNull::new(addr as *mut T))
    }

    /// Decode an optional address straight to a raw pointer, null included.
    pub fn decode_raw<T>(self) -> Result<*mut T, Reason> {
        Ok(self
            .decode_or_null::<T>()?
            .map_or(std::ptr::null_mut(), NonNull::as_ptr))
    }
}

impl From<u64> for Handle {
    fn from(raw: u64) -> Self {
        Handle(raw)
    }
}

impl From<Handle> for u64 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}
