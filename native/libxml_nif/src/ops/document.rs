//! Document lifecycle
//!
//! A document handle owns its whole tree. `free_doc` invalidates the
//! document handle and every node, namespace, string and XPath context
//! handle derived from it.

use super::created;
use crate::error::{Fault, NifOutcome, Reason};
use crate::ffi::{self, XmlDoc, XmlNode, XML_DOCUMENT_NODE};
use crate::handle::Handle;
use libc::{c_char, c_int};
use std::ptr;

/// Base URL recorded on documents parsed from memory
const MEMORY_DOCUMENT_URL: &[u8] = b"noname.xml\0";

/// `xmlParserOption` flags used for every in-memory parse
const PARSE_OPTIONS: c_int = 0;

/// Decode a handle that must name a document.
///
/// A non-document discriminant is a calling-convention fault, not a
/// domain failure.
///
/// # Safety
///
/// `doc` must be zero or a live libxml2 node-like struct.
pub(crate) unsafe fn checked_doc(doc: Handle) -> NifOutcome<*mut XmlDoc> {
    let p = doc.decode::<XmlDoc>()?.as_ptr();
    if (*p).type_ != XML_DOCUMENT_NODE {
        tracing::debug!(kind = (*p).type_, "document handle expected");
        return Err(Fault::BadArg);
    }
    Ok(p)
}

/// Check that `doc` names a document and hand it back unchanged.
///
/// Argument decoders call this as soon as the handle is read, so a wrong
/// kind of object is reported before any later argument is looked at.
///
/// # Safety
///
/// `doc` must be zero or a live libxml2 node-like struct.
pub unsafe fn require_document(doc: Handle) -> NifOutcome<Handle> {
    checked_doc(doc)?;
    Ok(doc)
}

/// Parse a document from memory.
///
/// The returned handle must be released with [`free_doc`].
pub fn read_memory(content: &[u8]) -> Result<Handle, Reason> {
    ffi::init();

    let size = c_int::try_from(content.len()).map_err(|_| Reason::FailedToParseDocument)?;
    // SAFETY: buffer and URL are valid for the call; libxml2 copies what it keeps
    let doc = unsafe {
        ffi::xmlReadMemory(
            content.as_ptr() as *const c_char,
            size,
            MEMORY_DOCUMENT_URL.as_ptr() as *const c_char,
            ptr::null(),
            PARSE_OPTIONS,
        )
    };
    created(doc, Reason::FailedToParseDocument, "xmlReadMemory")
}

/// Copy a document; `recursive` non-zero copies the whole tree.
///
/// The copy is independent and must be released with [`free_doc`].
///
/// # Safety
///
/// `doc` must be zero or a live document.
pub unsafe fn copy_doc(doc: Handle, recursive: i32) -> NifOutcome<Handle> {
    let p = checked_doc(doc)?;
    let copy = ffi::xmlCopyDoc(p, recursive);
    Ok(created(copy, Reason::FailedToCopyDocument, "xmlCopyDoc")?)
}

/// Free a document and everything it owns.
///
/// # Safety
///
/// `doc` must be zero or a live document not freed before.
pub unsafe fn free_doc(doc: Handle) -> NifOutcome<()> {
    let p = checked_doc(doc)?;
    ffi::xmlFreeDoc(p);
    Ok(())
}

/// Root element, or [`Handle::NULL`] for a document without one.
///
/// # Safety
///
/// `doc` must be zero or a live document.
pub unsafe fn doc_get_root_element(doc: Handle) -> NifOutcome<Handle> {
    let p = checked_doc(doc)?;
    Ok(Handle::encode_or_null(ffi::xmlDocGetRootElement(p)))
}

/// Make `node` the root element of `doc`.
///
/// Returns the previous root (now unlinked, owned by the caller and to be
/// released with `free_node`), or [`Handle::NULL`].
///
/// # Safety
///
/// `doc` must be zero or a live document; `node` zero or a live node not
/// owned by another tree position the caller still relies on.
pub unsafe fn doc_set_root_element(doc: Handle, node: Handle) -> NifOutcome<Handle> {
    let p = checked_doc(doc)?;
    let root = node.decode::<XmlNode>()?.as_ptr();
    Ok(Handle::encode_or_null(ffi::xmlDocSetRootElement(p, root)))
}
