//! Struct Projection Layer
//!
//! Turns libxml2 structs into neutral records (`project_*`) and writes the
//! safe subset of a record back (`inject_*`). Records only ever hold handles
//! and scalars; following a handle is a separate call.
//!
//! - node: tagged by node type, see [`NodeVariant`]
//! - namespace: `next`, `href`, `prefix`
//! - XPath context: `doc`, `node`
//! - XPath object: tagged by result type, see [`XPathValue`]
//! - node set: `node_nr`, `node_max`, ordered `nodes`

pub mod namespace;
pub mod node;
pub mod node_set;
pub mod xpath;

pub use namespace::{project_ns, NsRecord};
pub use node::{inject_node, project_node, ElementFields, NodeCommon, NodeRecord, NodeVariant};
pub use node_set::{project_node_set, NodeSetRecord};
pub use xpath::{
    inject_xpath_context, project_xpath_context, project_xpath_object, XPathContextRecord,
    XPathObjectRecord, XPathValue,
};

use crate::error::Reason;
use crate::handle::Handle;
use crate::marshal::xml_char_bytes;

/// Bytes of the `xmlChar *` string behind `handle`.
///
/// # Safety
///
/// `handle` must be zero or point at a live NUL-terminated string that
/// outlives `'a`.
pub unsafe fn read_xml_char<'a>(handle: Handle) -> Result<&'a [u8], Reason> {
    let ptr = handle.decode::<u8>()?;
    Ok(xml_char_bytes(ptr))
}
