//! Node set projection
//!
//! Array order is significant: `nodes[0]` is `nodeTab[0]`. Nothing here
//! sorts or deduplicates.

use crate::error::Reason;
use crate::ffi::XmlNodeSet;
use crate::handle::Handle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSetRecord {
    pub node_nr: i32,
    pub node_max: i32,
    pub nodes: Vec<Handle>,
}

/// # Safety
///
/// `set` must be zero or a live `xmlNodeSet` whose first `nodeNr` table
/// entries are readable.
pub unsafe fn project_node_set(set: Handle) -> Result<NodeSetRecord, Reason> {
    let p = set.decode::<XmlNodeSet>()?.as_ptr();

    let node_nr = (*p).nodeNr;
    let node_max = (*p).nodeMax;
    let tab = (*p).nodeTab;

    let count = usize::try_from(node_nr).unwrap_or(0);
    let mut nodes = Vec::new();
    if count > 0 && !tab.is_null() {
        nodes
            .try_reserve_exact(count)
            .map_err(|_| Reason::BadAlloc)?;
        for node in std::slice::from_raw_parts(tab, count) {
            nodes.push(Handle::encode(*node)?);
        }
    }

    Ok(NodeSetRecord {
        node_nr,
        node_max,
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::document::{doc_get_root_element, free_doc, read_memory};
    use crate::ops::xpath::{eval, free_context, free_object, new_context};
    use crate::projection::{project_node, project_xpath_object, read_xml_char, XPathValue};

    /// Evaluate `expr` and hand the projected node set to `check`.
    fn with_node_set(xml: &[u8], expr: &[u8], check: impl FnOnce(Handle, &NodeSetRecord)) {
        let doc = read_memory(xml).unwrap();
        unsafe {
            let ctx = new_context(doc).unwrap();
            let obj = eval(ctx, expr).unwrap();
            let set = match project_xpath_object(obj).unwrap().value {
                XPathValue::NodeSet { nodesetval } => nodesetval,
                other => panic!("expected node set, got {:?}", other),
            };
            let record = project_node_set(set).unwrap();
            check(doc, &record);
            free_object(obj).unwrap();
            free_context(ctx).unwrap();
            free_doc(doc).unwrap();
        }
    }

    #[test]
    fn test_single_root_match() {
        with_node_set(b"<a><b/></a>", b"/a", |doc, record| {
            assert_eq!(record.node_nr, 1);
            assert!(record.node_max >= record.node_nr);
            assert_eq!(record.nodes.len(), 1);
            let root = unsafe { doc_get_root_element(doc).unwrap() };
            assert_eq!(record.nodes[0], root);
        });
    }

    #[test]
    fn test_document_order_preserved() {
        with_node_set(b"<r><x>1</x><x>2</x><x>3</x></r>", b"//x", |_, record| {
            assert_eq!(record.node_nr, 3);
            let texts: Vec<Vec<u8>> = record
                .nodes
                .iter()
                .map(|&node| unsafe {
                    let text = project_node(node).unwrap().common.children;
                    let content = project_node(text)
                        .unwrap()
                        .variant
                        .element_fields()
                        .unwrap()
                        .content;
                    read_xml_char(content).unwrap().to_vec()
                })
                .collect();
            assert_eq!(texts, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
        });
    }

    #[test]
    fn test_empty_match() {
        let doc = read_memory(b"<a/>").unwrap();
        unsafe {
            let ctx = new_context(doc).unwrap();
            let obj = eval(ctx, b"/missing").unwrap();
            match project_xpath_object(obj).unwrap().value {
                // libxml2 may represent an empty result without a set
                XPathValue::NodeSet { nodesetval } if nodesetval.is_null() => {}
                XPathValue::NodeSet { nodesetval } => {
                    let record = project_node_set(nodesetval).unwrap();
                    assert_eq!(record.node_nr, 0);
                    assert!(record.nodes.is_empty());
                }
                other => panic!("expected node set, got {:?}", other),
            }
            free_object(obj).unwrap();
            free_context(ctx).unwrap();
            free_doc(doc).unwrap();
        }
    }

    #[test]
    fn test_null_rejected() {
        assert_eq!(unsafe { project_node_set(Handle::NULL) }, Err(Reason::NullPointer));
    }
}
