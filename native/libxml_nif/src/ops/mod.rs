//! Lifecycle Operations
//!
//! One libxml2 call per operation, one attempt each. libxml2 reports
//! failure as a NULL or negative return; these modules translate that into
//! a [`Reason`] naming the failed step.
//!
//! Ownership: every operation returning a new handle documents the free
//! operation that must eventually be called on it, and what that free
//! invalidates. Nothing here frees on the caller's behalf.

pub mod c14n;
pub mod document;
pub mod node;
pub mod schema;
pub mod xpath;

use crate::error::Reason;
use crate::handle::Handle;

/// Encode a pointer returned by libxml2, mapping NULL to `reason`.
fn created<T>(ptr: *mut T, reason: Reason, call: &'static str) -> Result<Handle, Reason> {
    if ptr.is_null() {
        tracing::debug!(call, %reason, "libxml2 returned NULL");
        return Err(reason);
    }
    Handle::encode(ptr)
}
