// Error codes shared by every annex crate. The numbering follows the gRPC
// status codes so a host can forward them without a translation table.
use std::error::Error;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum ErrorCodes {
    // OK is returned on success, we use "Success" since Ok is a keyword in Rust.
    Success = 0,
    // UNKNOWN indicates an unknown error.
    Unknown = 2,
    // INVALID_ARGUMENT indicates the caller passed malformed input, e.g. a negative id
    // or a dimension that is not a multiple of 8.
    InvalidArgument = 3,
    // FAILED_PRECONDITION indicates the call is not valid in the current state.
    FailedPrecondition = 9,
    // OUT_OF_RANGE means an index was past the valid range.
    OutOfRange = 11,
    // UNIMPLEMENTED indicates the operation is not supported by this component.
    Unimplemented = 12,
    // INTERNAL errors are broken invariants.
    Internal = 13,
}

impl ErrorCodes {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCodes::InvalidArgument => "InvalidArgumentError",
            ErrorCodes::FailedPrecondition => "FailedPreconditionError",
            ErrorCodes::OutOfRange => "OutOfRangeError",
            ErrorCodes::Unimplemented => "UnsupportedOperationError",
            ErrorCodes::Internal => "InternalError",
            _ => "AnnexError",
        }
    }
}

impl std::fmt::Display for ErrorCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub trait AnnexError: Error + Send {
    fn code(&self) -> ErrorCodes;
    fn boxed(self) -> Box<dyn AnnexError>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
    fn should_trace_error(&self) -> bool {
        true
    }
}

impl Error for Box<dyn AnnexError> {}

impl AnnexError for Box<dyn AnnexError> {
    fn code(&self) -> ErrorCodes {
        self.as_ref().code()
    }
}

impl AnnexError for std::io::Error {
    fn code(&self) -> ErrorCodes {
        ErrorCodes::Unknown
    }
}
