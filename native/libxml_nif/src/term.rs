//! Elixir Term Conversion Utilities
//!
//! Decodes NIF arguments into handles, integers and staged strings, and
//! encodes projected records as maps keyed by atoms.

use crate::error::{Fault, NifOutcome, Reason};
use crate::handle::Handle;
use crate::marshal::{NativeString, NativeStringList};
use crate::projection::{
    ElementFields, NodeCommon, NodeRecord, NodeSetRecord, NodeVariant, NsRecord,
    XPathContextRecord, XPathObjectRecord, XPathValue,
};
use rustler::types::atom;
use rustler::{Atom, Binary, Encoder, Env, ListIterator, NifResult, OwnedBinary, Term};

// Record keys
mod key {
    rustler::atoms! {
        private,
        type_ = "type",
        name,
        children,
        last,
        parent,
        next,
        prev,
        doc,
        ns,
        content,
        properties,
        ns_def,
        line,
        href,
        prefix,
        node,
        nodesetval,
        boolval,
        floatval,
        stringval,
        index,
        index2,
        user,
        user2,
        node_nr,
        node_max,
        nodes,
    }
}

impl Encoder for Handle {
    fn encode<'a>(&self, env: Env<'a>) -> Term<'a> {
        self.into_raw().encode(env)
    }
}

// ============================================================================
// Replies
// ============================================================================

/// `{:ok, value}`, `{:error, reason}`, or `badarg` for a calling-convention
/// fault.
pub fn reply<'a>(env: Env<'a>, outcome: NifOutcome<Term<'a>>) -> NifResult<Term<'a>> {
    match outcome {
        Ok(value) => Ok((atom::ok(), value).encode(env)),
        Err(fault) => fault_to_term(env, fault),
    }
}

/// Bare `:ok`, `{:error, reason}`, or `badarg`.
pub fn reply_unit<'a>(env: Env<'a>, outcome: NifOutcome<()>) -> NifResult<Term<'a>> {
    match outcome {
        Ok(()) => Ok(atom::ok().encode(env)),
        Err(fault) => fault_to_term(env, fault),
    }
}

fn fault_to_term<'a>(env: Env<'a>, fault: Fault) -> NifResult<Term<'a>> {
    match fault {
        Fault::Reason(reason) => Ok((atom::error(), reason.to_string()).encode(env)),
        Fault::BadArg => Err(rustler::Error::BadArg),
    }
}

// ============================================================================
// Argument decoding
// ============================================================================

/// Non-negative integer argument as a handle (zero allowed; nullability is
/// checked where the handle is decoded).
pub fn get_pointer(term: Term) -> Result<Handle, Reason> {
    term.decode::<u64>()
        .map(Handle::from_raw)
        .map_err(|_| Reason::FailedToGetPointer)
}

/// Handle argument that must name an object; zero fails with
/// `null_pointer` right away.
pub fn get_object(term: Term) -> Result<Handle, Reason> {
    let handle = get_pointer(term)?;
    handle.decode::<libc::c_void>()?;
    Ok(handle)
}

pub fn get_int(term: Term) -> Result<i32, Reason> {
    term.decode::<i32>().map_err(|_| Reason::FailedToGetInt)
}

pub fn get_binary<'a>(term: Term<'a>) -> Result<Binary<'a>, Reason> {
    Binary::from_term(term).map_err(|_| Reason::FailedToInspectBinary)
}

/// Stage a binary argument as a native string.
pub fn get_native_string(term: Term) -> Result<NativeString, Reason> {
    NativeString::stage(get_binary(term)?.as_slice())
}

/// Stage a proper list of binaries as a NULL-terminated string array.
pub fn get_native_string_list(term: Term) -> Result<NativeStringList, Reason> {
    term.list_length()
        .map_err(|_| Reason::FailedToGetListLength)?;
    let items: ListIterator = term.decode().map_err(|_| Reason::FailedToGetListLength)?;
    NativeStringList::stage_with(items, get_native_string)
}

fn field<'a>(map: Term<'a>, key: Atom) -> Result<Term<'a>, Reason> {
    map.map_get(key.to_term(map.get_env()))
        .map_err(|_| Reason::FailedToGetMapValue)
}

fn pointer_field(map: Term, key: Atom) -> Result<Handle, Reason> {
    get_pointer(field(map, key)?)
}

fn int_field(map: Term, key: Atom) -> Result<i32, Reason> {
    get_int(field(map, key)?)
}

// ============================================================================
// Encoding
// ============================================================================

/// Copy bytes into a fresh binary term.
pub fn bytes_to_binary<'a>(env: Env<'a>, bytes: &[u8]) -> Result<Term<'a>, Reason> {
    let mut binary = OwnedBinary::new(bytes.len()).ok_or(Reason::BadAlloc)?;
    binary.as_mut_slice().copy_from_slice(bytes);
    Ok(binary.release(env).encode(env))
}

fn make_map<'a>(env: Env<'a>, pairs: &[(Atom, Term<'a>)]) -> Result<Term<'a>, Reason> {
    let pairs: Vec<(Term<'a>, Term<'a>)> = pairs
        .iter()
        .map(|(k, v)| (k.encode(env), *v))
        .collect();
    Term::map_from_pairs(env, &pairs).map_err(|_| Reason::FailedToMapPut)
}

// ============================================================================
// Records
// ============================================================================

pub fn node_to_term<'a>(env: Env<'a>, record: &NodeRecord) -> Result<Term<'a>, Reason> {
    let c = &record.common;
    let mut pairs = vec![
        (key::private(), c.private.encode(env)),
        (key::type_(), record.variant.discriminant().encode(env)),
        (key::name(), c.name.encode(env)),
        (key::children(), c.children.encode(env)),
        (key::last(), c.last.encode(env)),
        (key::parent(), c.parent.encode(env)),
        (key::next(), c.next.encode(env)),
        (key::prev(), c.prev.encode(env)),
        (key::doc(), c.doc.encode(env)),
    ];

    if let Some(f) = record.variant.element_fields() {
        pairs.extend([
            (key::ns(), f.ns.encode(env)),
            (key::content(), f.content.encode(env)),
            (key::properties(), f.properties.encode(env)),
            (key::ns_def(), f.ns_def.encode(env)),
            (key::line(), f.line.encode(env)),
        ]);
    }

    make_map(env, &pairs)
}

/// Decode a node map. The `type` value decides which keys are required.
pub fn term_to_node(map: Term) -> Result<NodeRecord, Reason> {
    let common = NodeCommon {
        private: pointer_field(map, key::private())?,
        name: pointer_field(map, key::name())?,
        children: pointer_field(map, key::children())?,
        last: pointer_field(map, key::last())?,
        parent: pointer_field(map, key::parent())?,
        next: pointer_field(map, key::next())?,
        prev: pointer_field(map, key::prev())?,
        doc: pointer_field(map, key::doc())?,
    };

    let kind = int_field(map, key::type_())?;
    let variant = match NodeVariant::without_element_fields(kind) {
        Some(variant) => variant,
        None => NodeVariant::Element {
            kind,
            fields: ElementFields {
                ns: pointer_field(map, key::ns())?,
                content: pointer_field(map, key::content())?,
                properties: pointer_field(map, key::properties())?,
                ns_def: pointer_field(map, key::ns_def())?,
                line: int_field(map, key::line())?,
            },
        },
    };

    Ok(NodeRecord { common, variant })
}

pub fn ns_to_term<'a>(env: Env<'a>, record: &NsRecord) -> Result<Term<'a>, Reason> {
    make_map(
        env,
        &[
            (key::next(), record.next.encode(env)),
            (key::href(), record.href.encode(env)),
            (key::prefix(), record.prefix.encode(env)),
        ],
    )
}

pub fn xpath_context_to_term<'a>(
    env: Env<'a>,
    record: &XPathContextRecord,
) -> Result<Term<'a>, Reason> {
    make_map(
        env,
        &[
            (key::doc(), record.doc.encode(env)),
            (key::node(), record.node.encode(env)),
        ],
    )
}

pub fn term_to_xpath_context(map: Term) -> Result<XPathContextRecord, Reason> {
    Ok(XPathContextRecord {
        doc: pointer_field(map, key::doc())?,
        node: pointer_field(map, key::node())?,
    })
}

pub fn xpath_object_to_term<'a>(
    env: Env<'a>,
    record: &XPathObjectRecord,
) -> Result<Term<'a>, Reason> {
    let mut pairs = vec![(key::type_(), record.kind.encode(env))];

    match record.value {
        XPathValue::Undefined | XPathValue::Users => {}
        XPathValue::NodeSet { nodesetval } | XPathValue::XsltTree { nodesetval } => {
            pairs.push((key::nodesetval(), nodesetval.encode(env)));
        }
        XPathValue::Boolean { boolval } => {
            pairs.push((key::boolval(), boolval.encode(env)));
        }
        XPathValue::Number { floatval } => {
            pairs.push((key::floatval(), floatval.encode(env)));
        }
        XPathValue::String { stringval } => {
            pairs.push((key::stringval(), stringval.encode(env)));
        }
        XPathValue::Point { index, user } => {
            pairs.push((key::index(), index.encode(env)));
            pairs.push((key::user(), user.encode(env)));
        }
        XPathValue::Range {
            index,
            index2,
            user,
            user2,
        } => {
            pairs.push((key::index(), index.encode(env)));
            pairs.push((key::index2(), index2.encode(env)));
            pairs.push((key::user(), user.encode(env)));
            pairs.push((key::user2(), user2.encode(env)));
        }
        XPathValue::LocationSet { user } => {
            pairs.push((key::user(), user.encode(env)));
        }
    }

    make_map(env, &pairs)
}

pub fn node_set_to_term<'a>(env: Env<'a>, record: &NodeSetRecord) -> Result<Term<'a>, Reason> {
    make_map(
        env,
        &[
            (key::node_nr(), record.node_nr.encode(env)),
            (key::node_max(), record.node_max.encode(env)),
            // Vec encodes as a list in index order
            (key::nodes(), record.nodes.encode(env)),
        ],
    )
}
