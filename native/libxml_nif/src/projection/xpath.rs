//! XPath context and XPath object projection

use crate::error::Reason;
use crate::ffi::{
    XmlDoc, XmlNode, XmlXPathContext, XmlXPathObject, XPATH_BOOLEAN, XPATH_LOCATIONSET,
    XPATH_NODESET, XPATH_NUMBER, XPATH_POINT, XPATH_RANGE, XPATH_STRING, XPATH_UNDEFINED,
    XPATH_USERS, XPATH_XSLT_TREE,
};
use crate::handle::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XPathContextRecord {
    /// Always non-null
    pub doc: Handle,
    pub node: Handle,
}

/// # Safety
///
/// `ctx` must be zero or a live `xmlXPathContext`.
pub unsafe fn project_xpath_context(ctx: Handle) -> Result<XPathContextRecord, Reason> {
    let p = ctx.decode::<XmlXPathContext>()?.as_ptr();
    Ok(XPathContextRecord {
        doc: Handle::encode((*p).doc)?,
        node: Handle::encode_or_null((*p).node),
    })
}

/// # Safety
///
/// `ctx` must be zero or a live `xmlXPathContext`; `record.doc` must be a
/// live document and `record.node` zero or a node of that document.
pub unsafe fn inject_xpath_context(ctx: Handle, record: &XPathContextRecord) -> Result<(), Reason> {
    let p = ctx.decode::<XmlXPathContext>()?.as_ptr();
    let doc = record.doc.decode::<XmlDoc>()?.as_ptr();
    let node = record.node.decode_raw::<XmlNode>()?;

    (*p).doc = doc;
    (*p).node = node;
    Ok(())
}

/// Evaluation result payload, one case per result type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XPathValue {
    Undefined,
    NodeSet { nodesetval: Handle },
    Boolean { boolval: i32 },
    Number { floatval: f64 },
    String { stringval: Handle },
    Point { index: i32, user: Handle },
    Range { index: i32, index2: i32, user: Handle, user2: Handle },
    LocationSet { user: Handle },
    Users,
    XsltTree { nodesetval: Handle },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XPathObjectRecord {
    /// Raw result type as stored in the object
    pub kind: i32,
    pub value: XPathValue,
}

/// Read an evaluation result.
///
/// A result type libxml2 does not define projects as `Undefined` with its
/// raw `kind` preserved.
///
/// # Safety
///
/// `obj` must be zero or a live `xmlXPathObject`.
pub unsafe fn project_xpath_object(obj: Handle) -> Result<XPathObjectRecord, Reason> {
    let p = obj.decode::<XmlXPathObject>()?.as_ptr();

    let kind = (*p).type_;
    let value = match kind {
        XPATH_UNDEFINED => XPathValue::Undefined,
        XPATH_NODESET => XPathValue::NodeSet {
            nodesetval: Handle::encode_or_null((*p).nodesetval),
        },
        XPATH_BOOLEAN => XPathValue::Boolean {
            boolval: (*p).boolval,
        },
        XPATH_NUMBER => XPathValue::Number {
            floatval: (*p).floatval,
        },
        XPATH_STRING => XPathValue::String {
            stringval: Handle::encode_or_null((*p).stringval),
        },
        XPATH_POINT => XPathValue::Point {
            index: (*p).index,
            user: Handle::encode_or_null((*p).user),
        },
        XPATH_RANGE => XPathValue::Range {
            index: (*p).index,
            index2: (*p).index2,
            user: Handle::encode_or_null((*p).user),
            user2: Handle::encode_or_null((*p).user2),
        },
        XPATH_LOCATIONSET => XPathValue::LocationSet {
            user: Handle::encode_or_null((*p).user),
        },
        XPATH_USERS => XPathValue::Users,
        XPATH_XSLT_TREE => XPathValue::XsltTree {
            nodesetval: Handle::encode_or_null((*p).nodesetval),
        },
        _ => XPathValue::Undefined,
    };

    Ok(XPathObjectRecord { kind, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::document::{doc_get_root_element, free_doc, read_memory};
    use crate::ops::xpath::{eval, free_context, free_object, new_context};
    use crate::projection::read_xml_char;

    fn eval_value(xml: &[u8], expr: &[u8]) -> (XPathObjectRecord, Vec<u8>) {
        let doc = read_memory(xml).unwrap();
        unsafe {
            let ctx = new_context(doc).unwrap();
            let obj = eval(ctx, expr).unwrap();
            let record = project_xpath_object(obj).unwrap();
            let text = match record.value {
                XPathValue::String { stringval } => read_xml_char(stringval).unwrap().to_vec(),
                _ => Vec::new(),
            };
            free_object(obj).unwrap();
            free_context(ctx).unwrap();
            free_doc(doc).unwrap();
            (record, text)
        }
    }

    #[test]
    fn test_context_projection() {
        let doc = read_memory(b"<a><b/></a>").unwrap();
        unsafe {
            let ctx = new_context(doc).unwrap();
            let record = project_xpath_context(ctx).unwrap();
            assert_eq!(record.doc, doc);
            assert!(record.node.is_null());

            free_context(ctx).unwrap();
            free_doc(doc).unwrap();
        }
    }

    #[test]
    fn test_context_injection_sets_node() {
        let doc = read_memory(b"<a><b/></a>").unwrap();
        unsafe {
            let root = doc_get_root_element(doc).unwrap();
            let ctx = new_context(doc).unwrap();

            inject_xpath_context(ctx, &XPathContextRecord { doc, node: root }).unwrap();
            assert_eq!(project_xpath_context(ctx).unwrap().node, root);

            let obj = eval(ctx, b"count(b)").unwrap();
            assert_eq!(
                project_xpath_object(obj).unwrap().value,
                XPathValue::Number { floatval: 1.0 }
            );

            free_object(obj).unwrap();
            free_context(ctx).unwrap();
            free_doc(doc).unwrap();
        }
    }

    #[test]
    fn test_context_injection_requires_doc() {
        let doc = read_memory(b"<a/>").unwrap();
        unsafe {
            let ctx = new_context(doc).unwrap();
            let record = XPathContextRecord {
                doc: Handle::NULL,
                node: Handle::NULL,
            };
            assert_eq!(inject_xpath_context(ctx, &record), Err(Reason::NullPointer));
            assert_eq!(project_xpath_context(ctx).unwrap().doc, doc);

            free_context(ctx).unwrap();
            free_doc(doc).unwrap();
        }
    }

    #[test]
    fn test_node_set_result() {
        let (record, _) = eval_value(b"<a><b/></a>", b"/a");
        assert_eq!(record.kind, XPATH_NODESET);
        assert!(matches!(record.value, XPathValue::NodeSet { nodesetval } if !nodesetval.is_null()));
    }

    #[test]
    fn test_boolean_result() {
        let (record, _) = eval_value(b"<a><b/></a>", b"boolean(/a/b)");
        assert_eq!(record.kind, XPATH_BOOLEAN);
        assert_eq!(record.value, XPathValue::Boolean { boolval: 1 });
    }

    #[test]
    fn test_number_result() {
        let (record, _) = eval_value(b"<a><b/><b/></a>", b"count(//b) * 1.5");
        assert_eq!(record.kind, XPATH_NUMBER);
        assert_eq!(record.value, XPathValue::Number { floatval: 3.0 });
    }

    #[test]
    fn test_string_result() {
        let (record, text) = eval_value(b"<a>hi<b>there</b></a>", b"string(/a)");
        assert_eq!(record.kind, XPATH_STRING);
        assert_eq!(text, b"hithere");
    }

    fn synthetic_object(kind: i32) -> XmlXPathObject {
        XmlXPathObject {
            type_: kind,
            nodesetval: 0x10 as *mut _,
            boolval: 1,
            floatval: 2.5,
            stringval: 0x20 as *mut _,
            user: 0x30 as *mut _,
            index: 4,
            user2: 0x40 as *mut _,
            index2: 5,
        }
    }

    fn project_kind(kind: i32) -> XPathObjectRecord {
        let mut obj = synthetic_object(kind);
        let handle = Handle::encode(&mut obj as *mut XmlXPathObject).unwrap();
        unsafe { project_xpath_object(handle).unwrap() }
    }

    #[test]
    fn test_every_result_type_payload() {
        let set = Handle::from_raw(0x10);
        let cases = [
            (XPATH_UNDEFINED, XPathValue::Undefined),
            (XPATH_NODESET, XPathValue::NodeSet { nodesetval: set }),
            (XPATH_BOOLEAN, XPathValue::Boolean { boolval: 1 }),
            (XPATH_NUMBER, XPathValue::Number { floatval: 2.5 }),
            (
                XPATH_STRING,
                XPathValue::String {
                    stringval: Handle::from_raw(0x20),
                },
            ),
            (
                XPATH_POINT,
                XPathValue::Point {
                    index: 4,
                    user: Handle::from_raw(0x30),
                },
            ),
            (
                XPATH_RANGE,
                XPathValue::Range {
                    index: 4,
                    index2: 5,
                    user: Handle::from_raw(0x30),
                    user2: Handle::from_raw(0x40),
                },
            ),
            (
                XPATH_LOCATIONSET,
                XPathValue::LocationSet {
                    user: Handle::from_raw(0x30),
                },
            ),
            (XPATH_USERS, XPathValue::Users),
            (XPATH_XSLT_TREE, XPathValue::XsltTree { nodesetval: set }),
        ];

        for (kind, expected) in cases {
            let record = project_kind(kind);
            assert_eq!(record.kind, kind);
            assert_eq!(record.value, expected, "result type {}", kind);
        }
    }

    #[test]
    fn test_unknown_result_type_is_undefined() {
        for kind in [10, -1, 255] {
            let record = project_kind(kind);
            assert_eq!(record.kind, kind);
            assert_eq!(record.value, XPathValue::Undefined);
        }
    }

    #[test]
    fn test_null_rejected() {
        unsafe {
            assert_eq!(project_xpath_object(Handle::NULL), Err(Reason::NullPointer));
            assert_eq!(project_xpath_context(Handle::NULL), Err(Reason::NullPointer));
        }
    }
}
