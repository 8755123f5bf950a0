//! Raw libxml2 bindings
//!
//! Only the entry points and struct layouts the bridge touches are declared.
//! Structs whose tail is never read by the bridge (`XmlDoc`, `XmlXPathContext`)
//! declare their leading fields only; they are never constructed or sized on
//! the Rust side, only reached through pointers handed out by libxml2.

#![allow(non_snake_case)]

use libc::{c_char, c_int, c_ushort, c_void};
use std::sync::Once;

pub type XmlChar = u8;

// xmlElementType
#[cfg(test)]
pub const XML_ELEMENT_NODE: c_int = 1;
pub const XML_ATTRIBUTE_NODE: c_int = 2;
#[cfg(test)]
pub const XML_TEXT_NODE: c_int = 3;
pub const XML_DOCUMENT_NODE: c_int = 9;
pub const XML_DTD_NODE: c_int = 14;
pub const XML_ELEMENT_DECL: c_int = 15;
pub const XML_ATTRIBUTE_DECL: c_int = 16;

// xmlXPathObjectType
pub const XPATH_UNDEFINED: c_int = 0;
pub const XPATH_NODESET: c_int = 1;
pub const XPATH_BOOLEAN: c_int = 2;
pub const XPATH_NUMBER: c_int = 3;
pub const XPATH_STRING: c_int = 4;
pub const XPATH_POINT: c_int = 5;
pub const XPATH_RANGE: c_int = 6;
pub const XPATH_LOCATIONSET: c_int = 7;
pub const XPATH_USERS: c_int = 8;
pub const XPATH_XSLT_TREE: c_int = 9;

/// `struct _xmlNode`
///
/// Attribute, DTD, declaration and document structs share the prefix up to
/// and including `doc`; fields after it are only valid for the node kinds
/// that use this exact layout.
#[repr(C)]
pub struct XmlNode {
    pub _private: *mut c_void,
    pub type_: c_int,
    pub name: *const XmlChar,
    pub children: *mut XmlNode,
    pub last: *mut XmlNode,
    pub parent: *mut XmlNode,
    pub next: *mut XmlNode,
    pub prev: *mut XmlNode,
    pub doc: *mut XmlDoc,
    pub ns: *mut XmlNs,
    pub content: *mut XmlChar,
    pub properties: *mut c_void,
    pub nsDef: *mut XmlNs,
    pub psvi: *mut c_void,
    pub line: c_ushort,
    pub extra: c_ushort,
}

/// Leading fields of `struct _xmlDoc`.
#[repr(C)]
pub struct XmlDoc {
    pub _private: *mut c_void,
    pub type_: c_int,
    pub name: *mut c_char,
    pub children: *mut XmlNode,
    pub last: *mut XmlNode,
    pub parent: *mut XmlNode,
    pub next: *mut XmlNode,
    pub prev: *mut XmlNode,
    pub doc: *mut XmlDoc,
}

/// `struct _xmlNs`
#[repr(C)]
pub struct XmlNs {
    pub next: *mut XmlNs,
    pub type_: c_int,
    pub href: *const XmlChar,
    pub prefix: *const XmlChar,
    pub _private: *mut c_void,
    pub context: *mut XmlDoc,
}

/// `struct _xmlNodeSet`
#[repr(C)]
pub struct XmlNodeSet {
    pub nodeNr: c_int,
    pub nodeMax: c_int,
    pub nodeTab: *mut *mut XmlNode,
}

/// `struct _xmlXPathObject`
#[repr(C)]
pub struct XmlXPathObject {
    pub type_: c_int,
    pub nodesetval: *mut XmlNodeSet,
    pub boolval: c_int,
    pub floatval: f64,
    pub stringval: *mut XmlChar,
    pub user: *mut c_void,
    pub index: c_int,
    pub user2: *mut c_void,
    pub index2: c_int,
}

/// Leading fields of `struct _xmlXPathContext`.
#[repr(C)]
pub struct XmlXPathContext {
    pub doc: *mut XmlDoc,
    pub node: *mut XmlNode,
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

pub type XmlFreeFunc = Option<unsafe extern "C" fn(mem: *mut c_void)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
extern "C" {
    pub static xmlFree: XmlFreeFunc;

    pub fn xmlInitParser();

    // tree / parser
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlCopyDoc(doc: *mut XmlDoc, recursive: c_int) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
    pub fn xmlDocCopyNode(node: *mut XmlNode, doc: *mut XmlDoc, extended: c_int) -> *mut XmlNode;
    pub fn xmlDocGetRootElement(doc: *const XmlDoc) -> *mut XmlNode;
    pub fn xmlDocSetRootElement(doc: *mut XmlDoc, root: *mut XmlNode) -> *mut XmlNode;
    pub fn xmlNewNs(node: *mut XmlNode, href: *const XmlChar, prefix: *const XmlChar) -> *mut XmlNs;
    pub fn xmlCopyNode(node: *mut XmlNode, extended: c_int) -> *mut XmlNode;
    pub fn xmlUnlinkNode(node: *mut XmlNode);
    pub fn xmlFreeNode(node: *mut XmlNode);
    pub fn xmlFreeNodeList(node: *mut XmlNode);

    // c14n
    pub fn xmlC14NDocDumpMemory(
        doc: *mut XmlDoc,
        nodes: *mut XmlNodeSet,
        mode: c_int,
        inclusive_ns_prefixes: *mut *mut XmlChar,
        with_comments: c_int,
        doc_txt_ptr: *mut *mut XmlChar,
    ) -> c_int;

    // xpath
    pub fn xmlXPathNewContext(doc: *mut XmlDoc) -> *mut XmlXPathContext;
    pub fn xmlXPathFreeContext(ctxt: *mut XmlXPathContext);
    pub fn xmlXPathEval(expr: *const XmlChar, ctxt: *mut XmlXPathContext) -> *mut XmlXPathObject;
    pub fn xmlXPathFreeObject(obj: *mut XmlXPathObject);

    // xmlschemas
    pub fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaNewDocParserCtxt(doc: *mut XmlDoc) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaParse(ctxt: *mut XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaNewValidCtxt(schema: *mut XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, instance: *mut XmlDoc) -> c_int;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
}

static LIBXML2_INIT: Once = Once::new();

/// Initialise libxml2's parser globals exactly once per process.
///
/// Safe to call from any thread and any number of times. There is no
/// matching teardown; the library stays initialised until the VM exits.
pub fn init() {
    LIBXML2_INIT.call_once(|| {
        // SAFETY: guarded by `Once`, so never concurrent with itself
        unsafe { xmlInitParser() };
        tracing::trace!("libxml2 parser initialised");
    });
}

/// Release memory that libxml2 allocated with `xmlMalloc`.
///
/// # Safety
///
/// `ptr` must be null or a live allocation from libxml2's allocator that is
/// not referenced anywhere else.
pub unsafe fn xml_free(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    if let Some(free) = xmlFree {
        free(ptr);
    }
}
