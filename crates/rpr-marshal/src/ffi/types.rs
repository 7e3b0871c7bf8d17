//! Native ABI types
//!
//! Defines:
//! - `NativeType`: the fixed-width C types used by the host's function table
//! - `NativeValue`: a runtime value of one of those types, stored in an
//!   argument slot for the duration of a call
//!
//! Type mapping:
//! - NativeType::Byte → NativeValue::Byte(i8)      (C `char` / `bool`)
//! - NativeType::Int → NativeValue::Int(i32)       (C `int`)
//! - NativeType::Double → NativeValue::Double(f64) (C `double`)
//! - NativeType::U64 → NativeValue::U64(u64)       (addresses passed by value)
//! - NativeType::Pointer → NativeValue::Ptr        (C `void*`, by-reference slots)
//! - NativeType::CharPtr → NativeValue::Ptr        (C `char*` buffers)
//! - NativeType::Void → NativeValue::Void

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::ffi::c_void;
use std::fmt;

/// Native parameter / return types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeType {
    /// Signed 8-bit (C char, used for bool flags)
    Byte,
    /// Signed 32-bit int
    Int,
    /// 64-bit IEEE double
    Double,
    /// Unsigned 64-bit integer
    U64,
    /// Untyped pointer
    Pointer,
    /// Pointer to a character buffer
    CharPtr,
    /// No value (return type only)
    Void,
}

impl NativeType {
    /// Get a display name for this native type
    pub fn display_name(&self) -> &'static str {
        match self {
            NativeType::Byte => "c_byte",
            NativeType::Int => "c_int",
            NativeType::Double => "c_double",
            NativeType::U64 => "c_uint64",
            NativeType::Pointer => "c_void_p",
            NativeType::CharPtr => "c_char_p",
            NativeType::Void => "c_void",
        }
    }

    /// Whether values of this type are passed through a pointer
    pub fn is_pointer(&self) -> bool {
        matches!(self, NativeType::Pointer | NativeType::CharPtr)
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Runtime representation of a native value
///
/// These are the actual C-compatible values whose addresses are handed to
/// the native call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeValue {
    Byte(i8),
    Int(i32),
    Double(f64),
    U64(u64),
    /// Pointer (either `void*` or `char*`)
    ///
    /// # Safety
    ///
    /// The pointee must outlive the call; the per-call frame owns it.
    Ptr(*mut c_void),
    Void,
}

impl NativeValue {
    /// Zero value of the given type
    pub fn zero(ty: NativeType) -> Self {
        match ty {
            NativeType::Byte => NativeValue::Byte(0),
            NativeType::Int => NativeValue::Int(0),
            NativeType::Double => NativeValue::Double(0.0),
            NativeType::U64 => NativeValue::U64(0),
            NativeType::Pointer | NativeType::CharPtr => NativeValue::Ptr(std::ptr::null_mut()),
            NativeType::Void => NativeValue::Void,
        }
    }

    /// Null pointer value
    pub fn null() -> Self {
        NativeValue::Ptr(std::ptr::null_mut())
    }

    /// Type of this value (pointers report `Pointer`)
    pub fn native_type(&self) -> NativeType {
        match self {
            NativeValue::Byte(_) => NativeType::Byte,
            NativeValue::Int(_) => NativeType::Int,
            NativeValue::Double(_) => NativeType::Double,
            NativeValue::U64(_) => NativeType::U64,
            NativeValue::Ptr(_) => NativeType::Pointer,
            NativeValue::Void => NativeType::Void,
        }
    }

    /// Address of the payload, as libffi expects for argument slots
    ///
    /// Also used to take the address of transient by-reference scalars.
    pub fn payload_ptr(&mut self) -> *mut c_void {
        match self {
            NativeValue::Byte(v) => v as *mut i8 as *mut c_void,
            NativeValue::Int(v) => v as *mut i32 as *mut c_void,
            NativeValue::Double(v) => v as *mut f64 as *mut c_void,
            NativeValue::U64(v) => v as *mut u64 as *mut c_void,
            NativeValue::Ptr(v) => v as *mut *mut c_void as *mut c_void,
            NativeValue::Void => std::ptr::null_mut(),
        }
    }

    /// Convert back to a caller-facing value
    pub fn to_value(&self) -> Value {
        match self {
            NativeValue::Byte(v) => Value::Int(i64::from(*v)),
            NativeValue::Int(v) => Value::Int(i64::from(*v)),
            NativeValue::Double(v) => Value::Number(*v),
            NativeValue::U64(v) => Value::Int(*v as i64),
            NativeValue::Ptr(p) => Value::Int(*p as usize as i64),
            NativeValue::Void => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_type_display_names() {
        assert_eq!(NativeType::Byte.display_name(), "c_byte");
        assert_eq!(NativeType::Int.display_name(), "c_int");
        assert_eq!(NativeType::Double.display_name(), "c_double");
        assert_eq!(NativeType::U64.display_name(), "c_uint64");
        assert_eq!(NativeType::Pointer.display_name(), "c_void_p");
        assert_eq!(NativeType::CharPtr.display_name(), "c_char_p");
        assert_eq!(NativeType::Void.display_name(), "c_void");
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(NativeValue::zero(NativeType::Byte), NativeValue::Byte(0));
        assert_eq!(NativeValue::zero(NativeType::Double), NativeValue::Double(0.0));
        assert_eq!(NativeValue::zero(NativeType::CharPtr), NativeValue::null());
    }

    #[test]
    fn test_payload_ptr_points_at_value() {
        let mut v = NativeValue::Int(7);
        let p = v.payload_ptr() as *mut i32;
        unsafe {
            assert_eq!(*p, 7);
            *p = 9;
        }
        assert_eq!(v, NativeValue::Int(9));
    }

    #[test]
    fn test_to_value() {
        assert_eq!(NativeValue::Byte(-1).to_value(), Value::Int(-1));
        assert_eq!(NativeValue::Int(42).to_value(), Value::Int(42));
        assert_eq!(NativeValue::Double(0.5).to_value(), Value::Number(0.5));
        assert_eq!(NativeValue::Void.to_value(), Value::Null);
    }

    #[test]
    fn test_pointer_types() {
        assert!(NativeType::Pointer.is_pointer());
        assert!(NativeType::CharPtr.is_pointer());
        assert!(!NativeType::U64.is_pointer());
    }
}
