//! XML Schema validation pipeline
//!
//! parser context -> schema -> validation context -> validate. Each stage
//! is freed on its own, in reverse order of construction: a validation
//! context must be freed before its schema.

use super::created;
use super::document::checked_doc;
use crate::error::{NifOutcome, Reason};
use crate::ffi::{self, XmlSchema, XmlSchemaParserCtxt, XmlSchemaValidCtxt};
use crate::handle::Handle;
use crate::marshal::NativeString;

/// Parser context reading the schema from `url` (a path or URL).
///
/// Released with [`free_parser_ctxt`].
pub fn new_parser_ctxt(url: &[u8]) -> Result<Handle, Reason> {
    ffi::init();
    let url = NativeString::stage(url)?;
    // SAFETY: libxml2 copies the URL
    let ctxt = unsafe { ffi::xmlSchemaNewParserCtxt(url.as_ptr()) };
    created(ctxt, Reason::FailedToNewParserCtxt, "xmlSchemaNewParserCtxt")
}

/// Parser context reading the schema from an already parsed document.
///
/// The document must outlive the parser context. Released with
/// [`free_parser_ctxt`].
///
/// # Safety
///
/// `doc` must be zero or a live document.
pub unsafe fn new_doc_parser_ctxt(doc: Handle) -> NifOutcome<Handle> {
    let d = checked_doc(doc)?;
    let ctxt = ffi::xmlSchemaNewDocParserCtxt(d);
    Ok(created(ctxt, Reason::FailedToNewParserCtxt, "xmlSchemaNewDocParserCtxt")?)
}

/// Compile the schema. Released with [`free_schema`].
///
/// # Safety
///
/// `ctxt` must be zero or a live parser context.
pub unsafe fn parse(ctxt: Handle) -> Result<Handle, Reason> {
    let c = ctxt.decode::<XmlSchemaParserCtxt>()?.as_ptr();
    created(ffi::xmlSchemaParse(c), Reason::FailedToParseSchema, "xmlSchemaParse")
}

/// Validation context for `schema`. Released with [`free_valid_ctxt`].
///
/// # Safety
///
/// `schema` must be zero or a live schema.
pub unsafe fn new_valid_ctxt(schema: Handle) -> Result<Handle, Reason> {
    let s = schema.decode::<XmlSchema>()?.as_ptr();
    created(
        ffi::xmlSchemaNewValidCtxt(s),
        Reason::FailedToNewValidCtxt,
        "xmlSchemaNewValidCtxt",
    )
}

/// Validate `instance`. Returns libxml2's code unchanged: 0 when valid, a
/// positive error count when invalid, -1 on internal error.
///
/// # Safety
///
/// `ctxt` must be zero or a live validation context; `instance` zero or a
/// live document.
pub unsafe fn validate_doc(ctxt: Handle, instance: Handle) -> NifOutcome<i32> {
    let c = ctxt.decode::<XmlSchemaValidCtxt>()?.as_ptr();
    let d = checked_doc(instance)?;
    let code = ffi::xmlSchemaValidateDoc(c, d);
    if code != 0 {
        tracing::debug!(code, "schema validation did not pass");
    }
    Ok(code)
}

/// # Safety
///
/// `ctxt` must be zero or a live parser context not freed before.
pub unsafe fn free_parser_ctxt(ctxt: Handle) -> Result<(), Reason> {
    ffi::xmlSchemaFreeParserCtxt(ctxt.decode::<XmlSchemaParserCtxt>()?.as_ptr());
    Ok(())
}

/// # Safety
///
/// `schema` must be zero or a live schema with no validation context left.
pub unsafe fn free_schema(schema: Handle) -> Result<(), Reason> {
    ffi::xmlSchemaFree(schema.decode::<XmlSchema>()?.as_ptr());
    Ok(())
}

/// # Safety
///
/// `ctxt` must be zero or a live validation context not freed before.
pub unsafe fn free_valid_ctxt(ctxt: Handle) -> Result<(), Reason> {
    ffi::xmlSchemaFreeValidCtxt(ctxt.decode::<XmlSchemaValidCtxt>()?.as_ptr());
    Ok(())
}
