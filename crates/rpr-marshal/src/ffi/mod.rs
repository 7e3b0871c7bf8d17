//! Native boundary infrastructure
//!
//! - `types`: native ABI types and argument slots
//! - `pointer`: tagged pointer string codec
//! - `buffer`: fixed-capacity single-byte string buffers
//! - `table`: the function table (name → entry point)
//! - `caller`: prepared libffi call interfaces
//!
//! # Safety
//!
//! Native calls involve `unsafe` code. All of it lives in this module and in
//! the adapter's per-call frame; everything above those is safe.

pub mod buffer;
pub mod caller;
pub mod pointer;
pub mod table;
pub mod types;

pub use buffer::{DecodeMode, Encoding, StringBuffer};
pub use caller::ExternFunction;
pub use table::{EntryPoint, FunctionTable, GetFunc, LoadError};
pub use types::{NativeType, NativeValue};
