//! rpr-marshal - typed native calls into the REAPER host API
//!
//! This library wraps host functions whose signatures the host's own
//! scripting bindings get wrong, and provides:
//! - A pointer-string codec (`(Type*)0x…` ↔ 64-bit address)
//! - Fixed-capacity single-byte string buffers
//! - A declarative catalogue of wrapped functions
//! - A call adapter that marshals caller values, invokes the entry point
//!   through libffi and decodes by-reference results
//! - Dispatch of host-bound calls onto the host thread

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod adapter;
pub mod catalogue;
pub mod dispatch;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod value;

pub use adapter::{
    CallAdapter, CallDescriptor, CallResult, Capacity, ExecContext, ParamKind, ParamSpec,
};
pub use dispatch::{run_in, DispatchError, ExecutionContext, HostContext, HostPump, Job};
pub use error::{CallError, MarshalError};
pub use ffi::{
    DecodeMode, Encoding, FunctionTable, LoadError, NativeType, NativeValue, StringBuffer,
};
pub use value::Value;
