//! Native function calling through libffi
//!
//! Host signatures mix bytes, ints, doubles, 64-bit addresses and pointers in
//! up to ten positions, far too many combinations for hand-written function
//! pointer casts. Each entry point gets one libffi call interface, prepared
//! once from its declared types and reused for every call.

use crate::error::{CallError, MarshalError};
use crate::ffi::table::EntryPoint;
use crate::ffi::types::{NativeType, NativeValue};
use libffi::raw;
use std::ffi::c_void;
use std::os::raw::c_uint;
use std::ptr::addr_of_mut;

const FFI_OK: u32 = 0;

fn ffi_type(ty: NativeType) -> *mut raw::ffi_type {
    unsafe {
        match ty {
            NativeType::Byte => addr_of_mut!(raw::ffi_type_sint8),
            NativeType::Int => addr_of_mut!(raw::ffi_type_sint32),
            NativeType::Double => addr_of_mut!(raw::ffi_type_double),
            NativeType::U64 => addr_of_mut!(raw::ffi_type_uint64),
            NativeType::Pointer | NativeType::CharPtr => addr_of_mut!(raw::ffi_type_pointer),
            NativeType::Void => addr_of_mut!(raw::ffi_type_void),
        }
    }
}

/// A prepared native entry point
///
/// Immutable after preparation; safe to share between threads.
pub struct ExternFunction {
    name: String,
    code: unsafe extern "C" fn(),
    param_types: Vec<NativeType>,
    return_type: NativeType,
    // The cif points into `arg_types`; both are boxed so neither moves.
    arg_types: Box<[*mut raw::ffi_type]>,
    cif: Box<raw::ffi_cif>,
}

// Safety: the cif and type table are never mutated after preparation, and the
// ffi_type pointers refer to libffi's static type descriptors.
unsafe impl Send for ExternFunction {}
unsafe impl Sync for ExternFunction {}

impl ExternFunction {
    /// Prepare a call interface for `entry`
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - `entry` points to a function with the C calling convention
    /// - The function's actual signature matches `param_types` and `return_type`
    /// - The function stays loaded for the lifetime of this ExternFunction
    pub unsafe fn prepare(
        name: &str,
        entry: EntryPoint,
        param_types: Vec<NativeType>,
        return_type: NativeType,
    ) -> Result<Self, CallError> {
        if param_types.contains(&NativeType::Void) {
            return Err(CallError::PrepareFailed {
                name: name.to_string(),
                reason: "void is not a parameter type".to_string(),
            });
        }

        let mut arg_types: Box<[*mut raw::ffi_type]> =
            param_types.iter().map(|t| ffi_type(*t)).collect();
        let mut cif: Box<raw::ffi_cif> = Box::new(std::mem::zeroed());

        let status = raw::ffi_prep_cif(
            &mut *cif,
            raw::ffi_abi_FFI_DEFAULT_ABI,
            arg_types.len() as c_uint,
            ffi_type(return_type),
            arg_types.as_mut_ptr(),
        );
        if status as u32 != FFI_OK {
            return Err(CallError::PrepareFailed {
                name: name.to_string(),
                reason: format!("ffi_prep_cif returned status {}", status as u32),
            });
        }

        let code: unsafe extern "C" fn() = std::mem::transmute(entry.as_ptr());

        Ok(Self {
            name: name.to_string(),
            code,
            param_types,
            return_type,
            arg_types,
            cif,
        })
    }

    /// Call the native function with prepared argument slots
    ///
    /// Blocks until the native side returns. The return value is handed back
    /// raw, without interpretation.
    ///
    /// # Safety
    ///
    /// Every pointer argument must be null or point to storage that is valid
    /// (and large enough) for what the native function reads or writes.
    pub unsafe fn invoke(&self, args: &mut [NativeValue]) -> Result<NativeValue, CallError> {
        if args.len() != self.param_types.len() {
            return Err(CallError::ArityMismatch {
                name: self.name.clone(),
                expected: self.param_types.len(),
                got: args.len(),
            });
        }

        for (index, (arg, ty)) in args.iter().zip(self.param_types.iter()).enumerate() {
            let compatible = match ty {
                NativeType::Pointer | NativeType::CharPtr => matches!(arg, NativeValue::Ptr(_)),
                other => arg.native_type() == *other,
            };
            if !compatible {
                return Err(MarshalError::TypeMismatch {
                    param: format!("{}#{}", self.name, index),
                    expected: ty.display_name().to_string(),
                    got: arg.native_type().display_name().to_string(),
                }
                .into());
            }
        }

        let mut arg_ptrs: Vec<*mut c_void> = args.iter_mut().map(|a| a.payload_ptr()).collect();

        // libffi widens small integral returns to a full register
        let mut ret = [0u64; 1];
        let cif = &*self.cif as *const raw::ffi_cif as *mut raw::ffi_cif;
        raw::ffi_call(
            cif,
            Some(self.code),
            ret.as_mut_ptr() as *mut c_void,
            arg_ptrs.as_mut_ptr(),
        );

        let raw_ret = ret[0];
        Ok(match self.return_type {
            NativeType::Byte => NativeValue::Byte(raw_ret as i8),
            NativeType::Int => NativeValue::Int(raw_ret as i32),
            NativeType::Double => NativeValue::Double(f64::from_bits(raw_ret)),
            NativeType::U64 => NativeValue::U64(raw_ret),
            NativeType::Pointer | NativeType::CharPtr => {
                NativeValue::Ptr(raw_ret as usize as *mut c_void)
            }
            NativeType::Void => NativeValue::Void,
        })
    }

    /// Signature key, e.g. `(U64,Int)->Byte`
    pub fn signature_key(&self) -> String {
        let params: Vec<String> = self
            .param_types
            .iter()
            .map(|t| format!("{:?}", t))
            .collect();
        format!("({})->{:?}", params.join(","), self.return_type)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get parameter types
    pub fn param_types(&self) -> &[NativeType] {
        &self.param_types
    }

    /// Get return type
    pub fn return_type(&self) -> NativeType {
        self.return_type
    }

    /// Number of libffi argument descriptors (equals the parameter count)
    pub fn arg_type_count(&self) -> usize {
        self.arg_types.len()
    }
}

impl std::fmt::Debug for ExternFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternFunction")
            .field("name", &self.name)
            .field("signature", &self.signature_key())
            .finish()
    }
}
