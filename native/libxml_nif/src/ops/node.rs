//! Node graph operations
//!
//! A node that is not linked into a document tree is owned by the caller
//! and must be released with [`free_node`] (one node and its subtree) or
//! [`free_node_list`] (the node, its following siblings and their
//! subtrees). Freeing invalidates every handle into the freed subtree.

use super::created;
use super::document::checked_doc;
use crate::error::{NifOutcome, Reason};
use crate::ffi::{self, XmlNode};
use crate::handle::Handle;
use crate::marshal::NativeString;

/// Copy `node` into `doc`; `extended` 1 copies recursively, 2 copies
/// properties and namespaces only.
///
/// The copy is unlinked and owned by the caller.
///
/// # Safety
///
/// `node` must be zero or a live node; `doc` zero or a live document.
pub unsafe fn doc_copy_node(node: Handle, doc: Handle, extended: i32) -> NifOutcome<Handle> {
    let n = node.decode::<XmlNode>()?.as_ptr();
    let d = checked_doc(doc)?;
    let copy = ffi::xmlDocCopyNode(n, d, extended);
    Ok(created(copy, Reason::FailedToDocCopyNode, "xmlDocCopyNode")?)
}

/// Declare a namespace on `node`.
///
/// The namespace is owned by the node and freed with it; there is no
/// standalone free.
///
/// # Safety
///
/// `node` must be zero or a live element node.
pub unsafe fn new_ns(node: Handle, href: &[u8], prefix: &[u8]) -> Result<Handle, Reason> {
    let n = node.decode::<XmlNode>()?.as_ptr();
    let href = NativeString::stage(href)?;
    let prefix = NativeString::stage(prefix)?;

    // libxml2 copies both strings; the staging is dropped on return
    let ns = ffi::xmlNewNs(n, href.as_xml_ptr(), prefix.as_xml_ptr());
    created(ns, Reason::FailedToNewNs, "xmlNewNs")
}

/// Copy `node` without a target document.
///
/// # Safety
///
/// `node` must be zero or a live node.
pub unsafe fn copy_node(node: Handle, extended: i32) -> Result<Handle, Reason> {
    let n = node.decode::<XmlNode>()?.as_ptr();
    created(ffi::xmlCopyNode(n, extended), Reason::FailedToCopyNode, "xmlCopyNode")
}

/// Detach `node` from its parent and siblings without freeing it.
///
/// # Safety
///
/// `node` must be zero or a live node.
pub unsafe fn unlink_node(node: Handle) -> Result<(), Reason> {
    let n = node.decode::<XmlNode>()?.as_ptr();
    ffi::xmlUnlinkNode(n);
    Ok(())
}

/// Free one node and its subtree. Unlink it first if it is still in a tree.
///
/// # Safety
///
/// `node` must be zero or a live node not freed before.
pub unsafe fn free_node(node: Handle) -> Result<(), Reason> {
    let n = node.decode::<XmlNode>()?.as_ptr();
    ffi::xmlFreeNode(n);
    Ok(())
}

/// Free `node` and all of its following siblings.
///
/// # Safety
///
/// `node` must be zero or a live node not freed before.
pub unsafe fn free_node_list(node: Handle) -> Result<(), Reason> {
    let n = node.decode::<XmlNode>()?.as_ptr();
    ffi::xmlFreeNodeList(n);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;
    use crate::ops::document::{doc_get_root_element, free_doc, read_memory};
    use crate::projection::{project_node, read_xml_char};

    #[test]
    fn test_copy_unlink_free() {
        let doc = read_memory(b"<a><b/><c/></a>").unwrap();
        unsafe {
            let root = doc_get_root_element(doc).unwrap();
            let b = project_node(root).unwrap().common.children;

            let copy = copy_node(b, 1).unwrap();
            let copied = project_node(copy).unwrap();
            assert!(copied.common.parent.is_null());
            assert_eq!(read_xml_char(copied.common.name).unwrap(), b"b");
            free_node(copy).unwrap();

            unlink_node(b).unwrap();
            let record = project_node(b).unwrap();
            assert!(record.common.parent.is_null());
            assert!(record.common.next.is_null());

            let rest = project_node(root).unwrap();
            assert_eq!(rest.common.children, rest.common.last);
            assert_eq!(read_xml_char(project_node(rest.common.children).unwrap().common.name).unwrap(), b"c");

            free_node(b).unwrap();
            free_doc(doc).unwrap();
        }
    }

    #[test]
    fn test_doc_copy_node_targets_document() {
        let src = read_memory(b"<a><b>text</b></a>").unwrap();
        let dst = read_memory(b"<z/>").unwrap();
        unsafe {
            let b = project_node(doc_get_root_element(src).unwrap()).unwrap().common.children;
            let copy = doc_copy_node(b, dst, 1).unwrap();
            let record = project_node(copy).unwrap();
            assert_eq!(record.common.doc, dst);
            assert!(!record.common.children.is_null());

            free_node(copy).unwrap();
            free_doc(dst).unwrap();
            free_doc(src).unwrap();
        }
    }

    #[test]
    fn test_doc_copy_node_requires_document() {
        let doc = read_memory(b"<a/>").unwrap();
        unsafe {
            let root = doc_get_root_element(doc).unwrap();
            assert_eq!(doc_copy_node(root, root, 1), Err(Fault::BadArg));
            free_doc(doc).unwrap();
        }
    }

    #[test]
    fn test_free_node_list_frees_siblings() {
        let doc = read_memory(b"<a><b/><c/><d/></a>").unwrap();
        unsafe {
            let root = doc_get_root_element(doc).unwrap();
            let copy = copy_node(root, 1).unwrap();
            let first = project_node(copy).unwrap().common.children;

            // detach the child list from the copied parent, then free it whole
            let mut parent = project_node(copy).unwrap();
            parent.common.children = Handle::NULL;
            parent.common.last = Handle::NULL;
            crate::projection::inject_node(copy, &parent).unwrap();

            free_node_list(first).unwrap();
            free_node(copy).unwrap();
            free_doc(doc).unwrap();
        }
    }

    #[test]
    fn test_null_node_rejected() {
        unsafe {
            assert_eq!(copy_node(Handle::NULL, 1), Err(Reason::NullPointer));
            assert_eq!(unlink_node(Handle::NULL), Err(Reason::NullPointer));
            assert_eq!(free_node(Handle::NULL), Err(Reason::NullPointer));
            assert_eq!(free_node_list(Handle::NULL), Err(Reason::NullPointer));
            assert_eq!(new_ns(Handle::NULL, b"urn:x", b"x"), Err(Reason::NullPointer));
        }
    }
}
