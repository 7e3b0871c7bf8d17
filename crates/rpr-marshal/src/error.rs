//! Marshal and call errors

use crate::dispatch::DispatchError;
use crate::ffi::table::LoadError;
use thiserror::Error;

/// Errors raised while converting caller values to native arguments
///
/// Pointer-string mismatches are not errors here: they degrade to a
/// null address instead of failing the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarshalError {
    #[error("Type mismatch for '{param}': expected {expected}, got {got}")]
    TypeMismatch {
        param: String,
        expected: String,
        got: String,
    },

    #[error("Number {value} out of range for {target} parameter '{param}'")]
    NumberOutOfRange {
        param: String,
        value: String,
        target: String,
    },

    #[error("Character {ch:?} cannot be encoded as a single byte")]
    Unencodable { ch: char },

    #[error("Payload of {len} bytes exceeds buffer capacity of {capacity} bytes")]
    CapacityViolation { len: usize, capacity: usize },

    #[error("Invalid buffer capacity for '{param}': {reason}")]
    InvalidCapacity { param: String, reason: String },
}

/// Errors raised by the call adapter
///
/// A failing native call is not an error here: its raw return code is
/// reported in the call result as-is.
#[derive(Error, Debug)]
pub enum CallError {
    #[error("No descriptor for function '{0}'")]
    UnknownFunction(String),

    #[error("Entry point '{0}' is not registered in the function table")]
    LookupFailure(String),

    #[error("'{name}' expects {expected} arguments, got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error("Failed to prepare call interface for '{name}': {reason}")]
    PrepareFailed { name: String, reason: String },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Load(#[from] LoadError),
}
