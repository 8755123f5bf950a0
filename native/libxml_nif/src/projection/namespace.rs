//! Namespace projection (read-only)

use crate::error::Reason;
use crate::ffi::XmlNs;
use crate::handle::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NsRecord {
    pub next: Handle,
    pub href: Handle,
    pub prefix: Handle,
}

/// # Safety
///
/// `ns` must be zero or a live `xmlNs`.
pub unsafe fn project_ns(ns: Handle) -> Result<NsRecord, Reason> {
    let p = ns.decode::<XmlNs>()?.as_ptr();
    Ok(NsRecord {
        next: Handle::encode_or_null((*p).next),
        href: Handle::encode_or_null((*p).href),
        prefix: Handle::encode_or_null((*p).prefix),
    })
}
