//! Error channel
//!
//! Every fallible operation reports one of these reasons. The `Display` form
//! is the token the host sees in `{:error, reason}`; tokens are matched by
//! host code, so they never change once published.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Reason {
    // decode failures
    #[error("failed_to_get_pointer")]
    FailedToGetPointer,
    #[error("null_pointer")]
    NullPointer,
    #[error("pointer_is_null")]
    PointerIsNull,
    #[error("failed_to_get_int")]
    FailedToGetInt,
    #[error("failed_to_inspect_binary")]
    FailedToInspectBinary,
    #[error("failed_to_get_list_length")]
    FailedToGetListLength,
    #[error("failed_to_get_map_value")]
    FailedToGetMapValue,
    #[error("failed_to_map_put")]
    FailedToMapPut,

    // resource exhaustion
    #[error("malloc_failed")]
    MallocFailed,
    #[error("bad_alloc")]
    BadAlloc,

    // native operations
    #[error("failed_to_parse_document")]
    FailedToParseDocument,
    #[error("failed_to_copy_document")]
    FailedToCopyDocument,
    #[error("failed_to_doc_copy_node")]
    FailedToDocCopyNode,
    #[error("failed_to_new_ns")]
    FailedToNewNs,
    #[error("failed_to_copy_node")]
    FailedToCopyNode,
    #[error("failed_to_c14n_dump_memory")]
    FailedToC14nDumpMemory,
    #[error("xpath_new_context")]
    XPathNewContext,
    #[error("xpath_eval")]
    XPathEval,
    #[error("failed_to_new_parser_ctxt")]
    FailedToNewParserCtxt,
    #[error("failed_to_parse_schema")]
    FailedToParseSchema,
    #[error("failed_to_new_valid_ctxt")]
    FailedToNewValidCtxt,
}

/// Failure of a NIF call: either a domain reason for `{:error, reason}` or a
/// calling-convention fault raised as `badarg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Reason(Reason),
    BadArg,
}

impl From<Reason> for Fault {
    fn from(reason: Reason) -> Self {
        Fault::Reason(reason)
    }
}

pub type NifOutcome<T> = Result<T, Fault>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_wire_token() {
        assert_eq!(Reason::FailedToGetPointer.to_string(), "failed_to_get_pointer");
        assert_eq!(Reason::NullPointer.to_string(), "null_pointer");
        assert_eq!(Reason::FailedToC14nDumpMemory.to_string(), "failed_to_c14n_dump_memory");
        assert_eq!(Reason::XPathNewContext.to_string(), "xpath_new_context");
        assert_eq!(Reason::XPathEval.to_string(), "xpath_eval");
        assert_eq!(Reason::FailedToNewValidCtxt.to_string(), "failed_to_new_valid_ctxt");
    }

    #[test]
    fn test_tokens_are_snake_case() {
        let all = [
            Reason::FailedToGetPointer,
            Reason::NullPointer,
            Reason::PointerIsNull,
            Reason::FailedToGetInt,
            Reason::FailedToInspectBinary,
            Reason::FailedToGetListLength,
            Reason::FailedToGetMapValue,
            Reason::FailedToMapPut,
            Reason::MallocFailed,
            Reason::BadAlloc,
            Reason::FailedToParseDocument,
            Reason::FailedToCopyDocument,
            Reason::FailedToDocCopyNode,
            Reason::FailedToNewNs,
            Reason::FailedToCopyNode,
            Reason::FailedToC14nDumpMemory,
            Reason::XPathNewContext,
            Reason::XPathEval,
            Reason::FailedToNewParserCtxt,
            Reason::FailedToParseSchema,
            Reason::FailedToNewValidCtxt,
        ];
        for reason in all {
            let token = reason.to_string();
            assert!(token.bytes().all(|b| b.is_ascii_lowercase() || b == b'_' || b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_reason_lifts_into_fault() {
        let fault: Fault = Reason::NullPointer.into();
        assert_eq!(fault, Fault::Reason(Reason::NullPointer));
        assert_ne!(fault, Fault::BadArg);
    }
}
