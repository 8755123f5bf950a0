//! Canonical XML serialization
//!
//! libxml2 does the canonicalization; this module stages the inclusive
//! namespace prefix list and takes ownership of the output buffer.

use super::document::checked_doc;
use crate::error::{NifOutcome, Reason};
use crate::ffi::{self, XmlNodeSet};
use crate::handle::Handle;
use crate::marshal::{LibxmlBuffer, NativeStringList};
use std::ptr::{self, NonNull};

/// `xmlC14NMode`: 0 = C14N 1.0, 1 = exclusive C14N 1.0, 2 = C14N 1.1
pub type C14nMode = i32;

/// Serialize `doc`, or only the nodes in `nodeset` when it is non-null.
///
/// `inclusive_prefixes` only matters for exclusive mode. The staged list
/// stays owned by the caller, who drops it after the call either way.
///
/// # Safety
///
/// `doc` must be zero or a live document; `nodeset` zero or a live node set
/// over that document.
pub unsafe fn c14n_doc_dump_memory(
    doc: Handle,
    nodeset: Handle,
    mode: C14nMode,
    inclusive_prefixes: &mut NativeStringList,
    with_comments: i32,
) -> NifOutcome<LibxmlBuffer> {
    let d = checked_doc(doc)?;
    let set = nodeset.decode_raw::<XmlNodeSet>()?;

    let mut output: *mut u8 = ptr::null_mut();
    let ret = ffi::xmlC14NDocDumpMemory(
        d,
        set,
        mode,
        inclusive_prefixes.as_mut_ptr(),
        with_comments,
        &mut output,
    );

    // take ownership first so the buffer is released on every path below
    let buffer = NonNull::new(output).map(|p| {
        let len = usize::try_from(ret).unwrap_or(0);
        LibxmlBuffer::from_raw(p, len)
    });

    if ret < 0 {
        tracing::debug!(ret, mode, "xmlC14NDocDumpMemory failed");
        return Err(Reason::FailedToC14nDumpMemory.into());
    }
    match buffer {
        Some(buffer) => Ok(buffer),
        None => {
            tracing::debug!(ret, mode, "xmlC14NDocDumpMemory produced no buffer");
            Err(Reason::FailedToC14nDumpMemory.into())
        }
    }
}
