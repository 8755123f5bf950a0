//! Node projection
//!
//! `xmlNode` is a tagged struct: every node kind shares the leading link
//! fields, but only the element-like kinds carry `ns`, `content`,
//! `properties`, `nsDef` and `line`. The discriminant is always read before
//! anything variant-specific.

use crate::error::Reason;
use crate::ffi::{
    XmlDoc, XmlNode, XmlNs, XML_ATTRIBUTE_DECL, XML_ATTRIBUTE_NODE, XML_DOCUMENT_NODE,
    XML_DTD_NODE, XML_ELEMENT_DECL,
};
use crate::handle::Handle;
use libc::{c_int, c_void};

/// Fields every node kind exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeCommon {
    pub private: Handle,
    pub name: Handle,
    pub children: Handle,
    pub last: Handle,
    pub parent: Handle,
    pub next: Handle,
    pub prev: Handle,
    pub doc: Handle,
}

/// Fields only the element-like kinds expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementFields {
    pub ns: Handle,
    pub content: Handle,
    pub properties: Handle,
    pub ns_def: Handle,
    /// Source line; read-only
    pub line: i32,
}

/// Node kind, one case per field layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeVariant {
    Attribute,
    Dtd,
    ElementDecl,
    AttributeDecl,
    Document,
    /// Element, text, comment, PI and every other kind using the full
    /// `xmlNode` layout. Carries its raw discriminant.
    Element { kind: i32, fields: ElementFields },
}

impl NodeVariant {
    /// The variant for a discriminant whose layout hides the element
    /// fields, or `None` for element-like kinds.
    pub fn without_element_fields(kind: i32) -> Option<Self> {
        match kind {
            XML_ATTRIBUTE_NODE => Some(NodeVariant::Attribute),
            XML_DTD_NODE => Some(NodeVariant::Dtd),
            XML_ELEMENT_DECL => Some(NodeVariant::ElementDecl),
            XML_ATTRIBUTE_DECL => Some(NodeVariant::AttributeDecl),
            XML_DOCUMENT_NODE => Some(NodeVariant::Document),
            _ => None,
        }
    }

    pub fn discriminant(&self) -> i32 {
        match self {
            NodeVariant::Attribute => XML_ATTRIBUTE_NODE,
            NodeVariant::Dtd => XML_DTD_NODE,
            NodeVariant::ElementDecl => XML_ELEMENT_DECL,
            NodeVariant::AttributeDecl => XML_ATTRIBUTE_DECL,
            NodeVariant::Document => XML_DOCUMENT_NODE,
            NodeVariant::Element { kind, .. } => *kind,
        }
    }

    pub fn element_fields(&self) -> Option<&ElementFields> {
        match self {
            NodeVariant::Element { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

/// Neutral view of one `xmlNode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    pub common: NodeCommon,
    pub variant: NodeVariant,
}

/// Read a node's fields.
///
/// # Safety
///
/// `node` must be zero or a live libxml2 node (of any kind).
pub unsafe fn project_node(node: Handle) -> Result<NodeRecord, Reason> {
    let p = node.decode::<XmlNode>()?.as_ptr();

    let kind = (*p).type_;
    let common = NodeCommon {
        private: Handle::encode_or_null((*p)._private),
        name: Handle::encode_or_null((*p).name),
        children: Handle::encode_or_null((*p).children),
        last: Handle::encode_or_null((*p).last),
        parent: Handle::encode_or_null((*p).parent),
        next: Handle::encode_or_null((*p).next),
        prev: Handle::encode_or_null((*p).prev),
        doc: Handle::encode_or_null((*p).doc),
    };

    let variant = match NodeVariant::without_element_fields(kind) {
        Some(variant) => variant,
        None => NodeVariant::Element {
            kind,
            fields: ElementFields {
                ns: Handle::encode_or_null((*p).ns),
                content: Handle::encode_or_null((*p).content),
                properties: Handle::encode_or_null((*p).properties),
                ns_def: Handle::encode_or_null((*p).nsDef),
                line: i32::from((*p).line),
            },
        },
    };

    Ok(NodeRecord { common, variant })
}

/// Write a record back into a node.
///
/// The discriminant is written like any other field. Element fields are
/// written only when the record's own variant is element-like; `line` is
/// never written. Every handle is decoded before the first write, so a
/// failure leaves the node untouched.
///
/// # Safety
///
/// `node` must be zero or a live libxml2 node whose layout matches
/// `record.variant`, and every handle in the record must be valid for the
/// field it is written to. Keeping the tree consistent is the caller's job.
pub unsafe fn inject_node(node: Handle, record: &NodeRecord) -> Result<(), Reason> {
    let p = node.decode::<XmlNode>()?.as_ptr();

    let c = &record.common;
    let private = c.private.decode_raw::<c_void>()?;
    let name = c.name.decode_raw::<u8>()?;
    let children = c.children.decode_raw::<XmlNode>()?;
    let last = c.last.decode_raw::<XmlNode>()?;
    let parent = c.parent.decode_raw::<XmlNode>()?;
    let next = c.next.decode_raw::<XmlNode>()?;
    let prev = c.prev.decode_raw::<XmlNode>()?;
    let doc = c.doc.decode_raw::<XmlDoc>()?;

    let element = match record.variant.element_fields() {
        Some(f) => Some((
            f.ns.decode_raw::<XmlNs>()?,
            f.content.decode_raw::<u8>()?,
            f.properties.decode_raw::<c_void>()?,
            f.ns_def.decode_raw::<XmlNs>()?,
        )),
        None => None,
    };

    (*p)._private = private;
    (*p).type_ = record.variant.discriminant() as c_int;
    (*p).name = name;
    (*p).children = children;
    (*p).last = last;
    (*p).parent = parent;
    (*p).next = next;
    (*p).prev = prev;
    (*p).doc = doc;

    if let Some((ns, content, properties, ns_def)) = element {
        (*p).ns = ns;
        (*p).content = content;
        (*p).properties = properties;
        (*p).nsDef = ns_def;
    }

    Ok(())
}
