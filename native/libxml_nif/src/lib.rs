//! libxml_nif - libxml2 behind integer handles
//!
//! Every libxml2 object the host works with (documents, nodes, namespaces,
//! XPath contexts and results, schema pipeline stages) is passed across as
//! a plain integer [`Handle`]. The BEAM never owns that memory: each object
//! lives until the host calls its free operation.
//!
//! Layers, leaves first:
//! - handle: address <-> integer codec
//! - error: `{:error, reason}` vocabulary
//! - marshal: NUL-terminated staging of binaries and binary lists
//! - projection: native structs <-> neutral records
//! - ops: single-call libxml2 pass-throughs
//! - term + this file: argument decoding, replies, the NIF table
//!
//! Handles are trusted. Passing a freed handle, or one of the wrong kind
//! where no discriminant check applies, is undefined behaviour; the only
//! guard is the `type` check on document arguments.

use rustler::{Encoder, Env, NifResult, Term};

mod error;
mod ffi;
mod handle;
mod marshal;
mod ops;
mod projection;
mod term;

use error::NifOutcome;
use handle::Handle;
use term::{
    bytes_to_binary, get_binary, get_int, get_native_string_list, get_object, get_pointer, reply,
    reply_unit,
};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    pub static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    thread_local! {
        // Net bytes allocated minus freed on this thread
        static THREAD_NET: Cell<isize> = const { Cell::new(0) };
    }

    /// Net bytes this thread has allocated and not yet released.
    #[cfg(test)]
    pub fn thread_outstanding() -> isize {
        THREAD_NET.try_with(Cell::get).unwrap_or(0)
    }

    fn thread_adjust(delta: isize) {
        let _ = THREAD_NET.try_with(|net| net.set(net.get() + delta));
    }

    pub struct TrackingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    unsafe impl GlobalAlloc for TrackingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                thread_adjust(layout.size() as isize);
                let current = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
                let mut peak = PEAK_ALLOCATED.load(Ordering::Relaxed);
                while current > peak {
                    match PEAK_ALLOCATED.compare_exchange_weak(
                        peak,
                        current,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break,
                        Err(p) => peak = p,
                    }
                }
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            thread_adjust(-(layout.size() as isize));
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Memory Tracking NIFs
// ============================================================================

#[cfg(feature = "memory_tracking")]
use std::sync::atomic::Ordering;

#[cfg(feature = "memory_tracking")]
#[rustler::nif]
fn get_rust_memory() -> usize {
    tracking::ALLOCATED.load(Ordering::SeqCst)
}

#[cfg(feature = "memory_tracking")]
#[rustler::nif]
fn get_rust_memory_peak() -> usize {
    tracking::PEAK_ALLOCATED.load(Ordering::SeqCst)
}

#[cfg(feature = "memory_tracking")]
#[rustler::nif]
fn reset_rust_memory_stats() -> (usize, usize) {
    let current = tracking::ALLOCATED.load(Ordering::SeqCst);
    let peak = tracking::PEAK_ALLOCATED.swap(current, Ordering::SeqCst);
    (current, peak)
}

#[cfg(not(feature = "memory_tracking"))]
#[rustler::nif]
fn get_rust_memory() -> usize {
    0
}

#[cfg(not(feature = "memory_tracking"))]
#[rustler::nif]
fn get_rust_memory_peak() -> usize {
    0
}

#[cfg(not(feature = "memory_tracking"))]
#[rustler::nif]
fn reset_rust_memory_stats() -> (usize, usize) {
    (0, 0)
}

// ============================================================================
// Reply helpers
// ============================================================================
//
// Every `unsafe` block below relies on the host contract: a handle argument
// is zero or names a live object of the kind the operation expects.

fn respond<'a, F>(env: Env<'a>, body: F) -> NifResult<Term<'a>>
where
    F: FnOnce() -> NifOutcome<Term<'a>>,
{
    reply(env, body())
}

fn respond_unit<'a, F>(env: Env<'a>, body: F) -> NifResult<Term<'a>>
where
    F: FnOnce() -> NifOutcome<()>,
{
    reply_unit(env, body())
}

/// Decode a document argument and check its kind on the spot, before any
/// later argument is decoded.
fn get_document(term: Term) -> NifOutcome<Handle> {
    let doc = get_pointer(term)?;
    // SAFETY: host contract on handle arguments
    unsafe { ops::document::require_document(doc) }
}

fn handle_term(env: Env<'_>, handle: Handle) -> Term<'_> {
    handle.encode(env)
}

// ============================================================================
// Documents
// ============================================================================

/// Parse a binary into a document. Free with `xml_free_doc/1`.
#[rustler::nif]
fn xml_read_memory<'a>(env: Env<'a>, content: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let content = get_binary(content)?;
        let doc = ops::document::read_memory(content.as_slice())?;
        Ok(handle_term(env, doc))
    })
}

/// Copy a document (`recursive` non-zero for a deep copy). Free with
/// `xml_free_doc/1`.
#[rustler::nif]
fn xml_copy_doc<'a>(env: Env<'a>, doc: Term<'a>, recursive: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let doc = get_document(doc)?;
        let recursive = get_int(recursive)?;
        let copy = unsafe { ops::document::copy_doc(doc, recursive)? };
        Ok(handle_term(env, copy))
    })
}

/// Free a document. Every handle derived from it becomes invalid.
#[rustler::nif]
fn xml_free_doc<'a>(env: Env<'a>, doc: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let doc = get_document(doc)?;
        unsafe { ops::document::free_doc(doc) }
    })
}

#[rustler::nif]
fn xml_doc_copy_node<'a>(
    env: Env<'a>,
    node: Term<'a>,
    doc: Term<'a>,
    extended: Term<'a>,
) -> NifResult<Term<'a>> {
    respond(env, || {
        let node = get_object(node)?;
        let doc = get_document(doc)?;
        let extended = get_int(extended)?;
        let copy = unsafe { ops::node::doc_copy_node(node, doc, extended)? };
        Ok(handle_term(env, copy))
    })
}

/// Root element handle, or 0 when the document has none.
#[rustler::nif]
fn xml_doc_get_root_element<'a>(env: Env<'a>, doc: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let doc = get_document(doc)?;
        let root = unsafe { ops::document::doc_get_root_element(doc)? };
        Ok(handle_term(env, root))
    })
}

/// Replace the root element; returns the old root (now caller-owned) or 0.
#[rustler::nif]
fn xml_doc_set_root_element<'a>(env: Env<'a>, doc: Term<'a>, node: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let doc = get_document(doc)?;
        let node = get_pointer(node)?;
        let old = unsafe { ops::document::doc_set_root_element(doc, node)? };
        Ok(handle_term(env, old))
    })
}

// ============================================================================
// Nodes and namespaces
// ============================================================================

#[rustler::nif]
fn xml_new_ns<'a>(
    env: Env<'a>,
    node: Term<'a>,
    href: Term<'a>,
    prefix: Term<'a>,
) -> NifResult<Term<'a>> {
    respond(env, || {
        let node = get_pointer(node)?;
        let href = get_binary(href)?;
        let prefix = get_binary(prefix)?;
        let ns = unsafe { ops::node::new_ns(node, href.as_slice(), prefix.as_slice())? };
        Ok(handle_term(env, ns))
    })
}

#[rustler::nif]
fn xml_copy_node<'a>(env: Env<'a>, node: Term<'a>, extended: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let node = get_pointer(node)?;
        let extended = get_int(extended)?;
        let copy = unsafe { ops::node::copy_node(node, extended)? };
        Ok(handle_term(env, copy))
    })
}

#[rustler::nif]
fn xml_unlink_node<'a>(env: Env<'a>, node: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let node = get_pointer(node)?;
        unsafe { ops::node::unlink_node(node)? };
        Ok(())
    })
}

#[rustler::nif]
fn xml_free_node<'a>(env: Env<'a>, node: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let node = get_pointer(node)?;
        unsafe { ops::node::free_node(node)? };
        Ok(())
    })
}

#[rustler::nif]
fn xml_free_node_list<'a>(env: Env<'a>, node: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let node = get_pointer(node)?;
        unsafe { ops::node::free_node_list(node)? };
        Ok(())
    })
}

// ============================================================================
// Canonicalization
// ============================================================================

/// Canonical form of a document, optionally limited to a node set (0 for
/// the whole document).
#[rustler::nif]
fn xml_c14n_doc_dump_memory<'a>(
    env: Env<'a>,
    doc: Term<'a>,
    nodeset: Term<'a>,
    mode: Term<'a>,
    inclusive_ns_prefixes: Term<'a>,
    with_comments: Term<'a>,
) -> NifResult<Term<'a>> {
    respond(env, || {
        let doc = get_document(doc)?;
        let nodeset = get_pointer(nodeset)?;
        let mode = get_int(mode)?;
        let mut prefixes = get_native_string_list(inclusive_ns_prefixes)?;
        let with_comments = get_int(with_comments)?;

        let output = unsafe {
            ops::c14n::c14n_doc_dump_memory(doc, nodeset, mode, &mut prefixes, with_comments)?
        };
        Ok(bytes_to_binary(env, &output)?)
    })
}

// ============================================================================
// XPath
// ============================================================================

/// New evaluation context. Free with `xml_xpath_free_context/1` before the
/// document.
#[rustler::nif]
fn xml_xpath_new_context<'a>(env: Env<'a>, doc: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let doc = get_document(doc)?;
        let ctx = unsafe { ops::xpath::new_context(doc)? };
        Ok(handle_term(env, ctx))
    })
}

#[rustler::nif]
fn xml_xpath_free_context<'a>(env: Env<'a>, ctx: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let ctx = get_pointer(ctx)?;
        unsafe { ops::xpath::free_context(ctx)? };
        Ok(())
    })
}

/// Evaluate an expression. Free the result with `xml_xpath_free_object/1`.
#[rustler::nif]
fn xml_xpath_eval<'a>(env: Env<'a>, ctx: Term<'a>, expr: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let ctx = get_pointer(ctx)?;
        let expr = get_binary(expr)?;
        let obj = unsafe { ops::xpath::eval(ctx, expr.as_slice())? };
        Ok(handle_term(env, obj))
    })
}

#[rustler::nif]
fn xml_xpath_free_object<'a>(env: Env<'a>, obj: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let obj = get_pointer(obj)?;
        unsafe { ops::xpath::free_object(obj)? };
        Ok(())
    })
}

// ============================================================================
// XML Schema
// ============================================================================

#[rustler::nif]
fn xml_schema_new_parser_ctxt<'a>(env: Env<'a>, url: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let url = get_binary(url)?;
        let ctxt = ops::schema::new_parser_ctxt(url.as_slice())?;
        Ok(handle_term(env, ctxt))
    })
}

#[rustler::nif]
fn xml_schema_new_doc_parser_ctxt<'a>(env: Env<'a>, doc: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let doc = get_document(doc)?;
        let ctxt = unsafe { ops::schema::new_doc_parser_ctxt(doc)? };
        Ok(handle_term(env, ctxt))
    })
}

#[rustler::nif]
fn xml_schema_parse<'a>(env: Env<'a>, ctxt: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let ctxt = get_pointer(ctxt)?;
        let schema = unsafe { ops::schema::parse(ctxt)? };
        Ok(handle_term(env, schema))
    })
}

#[rustler::nif]
fn xml_schema_new_valid_ctxt<'a>(env: Env<'a>, schema: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let schema = get_pointer(schema)?;
        let ctxt = unsafe { ops::schema::new_valid_ctxt(schema)? };
        Ok(handle_term(env, ctxt))
    })
}

/// `{:ok, 0}` when valid, `{:ok, n}` with n > 0 validity errors, `{:ok, -1}`
/// on an internal libxml2 error.
#[rustler::nif]
fn xml_schema_validate_doc<'a>(env: Env<'a>, ctxt: Term<'a>, instance: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let ctxt = get_object(ctxt)?;
        let instance = get_document(instance)?;
        let code = unsafe { ops::schema::validate_doc(ctxt, instance)? };
        Ok(code.encode(env))
    })
}

#[rustler::nif]
fn xml_schema_free_parser_ctxt<'a>(env: Env<'a>, ctxt: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let ctxt = get_pointer(ctxt)?;
        unsafe { ops::schema::free_parser_ctxt(ctxt)? };
        Ok(())
    })
}

#[rustler::nif]
fn xml_schema_free<'a>(env: Env<'a>, schema: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let schema = get_pointer(schema)?;
        unsafe { ops::schema::free_schema(schema)? };
        Ok(())
    })
}

#[rustler::nif]
fn xml_schema_free_valid_ctxt<'a>(env: Env<'a>, ctxt: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let ctxt = get_pointer(ctxt)?;
        unsafe { ops::schema::free_valid_ctxt(ctxt)? };
        Ok(())
    })
}

// ============================================================================
// Introspection
// ============================================================================

#[rustler::nif]
fn get_xml_node<'a>(env: Env<'a>, node: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let node = get_pointer(node)?;
        let record = unsafe { projection::project_node(node)? };
        Ok(term::node_to_term(env, &record)?)
    })
}

/// Write a node map back. The map's own `type` picks which keys are read.
#[rustler::nif]
fn set_xml_node<'a>(env: Env<'a>, node: Term<'a>, map: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let node = get_pointer(node)?;
        let record = term::term_to_node(map)?;
        unsafe { projection::inject_node(node, &record)? };
        Ok(())
    })
}

#[rustler::nif]
fn get_xml_char<'a>(env: Env<'a>, string: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let string = get_pointer(string)?;
        let bytes = unsafe { projection::read_xml_char(string)? };
        Ok(bytes_to_binary(env, bytes)?)
    })
}

#[rustler::nif]
fn get_xml_ns<'a>(env: Env<'a>, ns: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let ns = get_pointer(ns)?;
        let record = unsafe { projection::project_ns(ns)? };
        Ok(term::ns_to_term(env, &record)?)
    })
}

#[rustler::nif]
fn get_xml_xpath_context<'a>(env: Env<'a>, ctx: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let ctx = get_pointer(ctx)?;
        let record = unsafe { projection::project_xpath_context(ctx)? };
        Ok(term::xpath_context_to_term(env, &record)?)
    })
}

#[rustler::nif]
fn set_xml_xpath_context<'a>(env: Env<'a>, ctx: Term<'a>, map: Term<'a>) -> NifResult<Term<'a>> {
    respond_unit(env, || {
        let ctx = get_pointer(ctx)?;
        let record = term::term_to_xpath_context(map)?;
        unsafe { projection::inject_xpath_context(ctx, &record)? };
        Ok(())
    })
}

#[rustler::nif]
fn get_xml_xpath_object<'a>(env: Env<'a>, obj: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let obj = get_pointer(obj)?;
        let record = unsafe { projection::project_xpath_object(obj)? };
        Ok(term::xpath_object_to_term(env, &record)?)
    })
}

#[rustler::nif]
fn get_xml_node_set<'a>(env: Env<'a>, set: Term<'a>) -> NifResult<Term<'a>> {
    respond(env, || {
        let set = get_pointer(set)?;
        let record = unsafe { projection::project_node_set(set)? };
        Ok(term::node_set_to_term(env, &record)?)
    })
}

// ============================================================================
// NIF Initialization
// ============================================================================

fn load(_env: Env, _info: Term) -> bool {
    ffi::init();
    true
}

rustler::init!("Elixir.Libxml.Nif", load = load);
