//! XPath contexts and evaluation
//!
//! A context belongs to one document and must be released with
//! [`free_context`] before that document is freed. Each evaluation result
//! is released with [`free_object`], which also frees its node set; node
//! handles inside the set stay owned by the document.

use super::created;
use super::document::checked_doc;
use crate::error::{NifOutcome, Reason};
use crate::ffi::{self, XmlXPathContext, XmlXPathObject};
use crate::handle::Handle;
use crate::marshal::NativeString;

/// # Safety
///
/// `doc` must be zero or a live document.
pub unsafe fn new_context(doc: Handle) -> NifOutcome<Handle> {
    let d = checked_doc(doc)?;
    let ctx = ffi::xmlXPathNewContext(d);
    Ok(created(ctx, Reason::XPathNewContext, "xmlXPathNewContext")?)
}

/// # Safety
///
/// `ctx` must be zero or a live context not freed before.
pub unsafe fn free_context(ctx: Handle) -> Result<(), Reason> {
    let c = ctx.decode::<XmlXPathContext>()?.as_ptr();
    ffi::xmlXPathFreeContext(c);
    Ok(())
}

/// Evaluate `expr` against `ctx`. Syntax and runtime errors both come back
/// as `xpath_eval`.
///
/// # Safety
///
/// `ctx` must be zero or a live context whose document is still alive.
pub unsafe fn eval(ctx: Handle, expr: &[u8]) -> Result<Handle, Reason> {
    let c = ctx.decode::<XmlXPathContext>()?.as_ptr();
    let expr = NativeString::stage(expr)?;
    let obj = ffi::xmlXPathEval(expr.as_xml_ptr(), c);
    created(obj, Reason::XPathEval, "xmlXPathEval")
}

/// # Safety
///
/// `obj` must be zero or a live evaluation result not freed before.
pub unsafe fn free_object(obj: Handle) -> Result<(), Reason> {
    let o = obj.decode::<XmlXPathObject>()?.as_ptr();
    ffi::xmlXPathFreeObject(o);
    Ok(())
}
