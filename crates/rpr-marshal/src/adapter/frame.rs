//! Per-call argument frame
//!
//! Owns every buffer and transient scalar whose address is handed to native
//! code, so all of them outlive the call and are dropped together afterwards.
//! A frame is never shared: each call builds its own.

use crate::adapter::{CallDescriptor, CallResult, Capacity, ParamKind};
use crate::error::MarshalError;
use crate::ffi::buffer::{Encoding, StringBuffer};
use crate::ffi::pointer;
use crate::ffi::types::{NativeType, NativeValue};
use crate::value::Value;
use tracing::debug;

/// Where a parameter's native storage lives
#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    /// Passed by value, nothing to read back
    Direct,
    /// Passed as a null pointer
    Null,
    /// Transient scalar at `cells[i]`
    Cell(usize),
    /// Buffer at `buffers[i]`
    Buffer(usize),
}

/// Native arguments for one call plus the storage they point into
pub struct ArgFrame {
    args: Vec<NativeValue>,
    slots: Vec<Slot>,
    // Boxed so the addresses handed out stay put while the Vec grows.
    cells: Vec<Box<NativeValue>>,
    buffers: Vec<StringBuffer>,
    encoding: Encoding,
}

impl ArgFrame {
    /// Marshal `values` according to the descriptor's parameter table
    ///
    /// The caller has already checked that `values` matches the parameter count.
    pub fn build(
        descriptor: &CallDescriptor,
        values: &[Value],
        default_capacity: usize,
        encoding: Encoding,
    ) -> Result<Self, MarshalError> {
        let mut frame = Self {
            args: Vec::with_capacity(values.len()),
            slots: Vec::with_capacity(values.len()),
            cells: Vec::new(),
            buffers: Vec::new(),
            encoding,
        };

        for (spec, value) in descriptor.params.iter().zip(values) {
            match spec.kind {
                ParamKind::Scalar(ty) => {
                    frame.push_direct(scalar(spec.name, ty, value)?);
                }

                ParamKind::ScalarOrZero(ty) => {
                    let native = if value.is_null() {
                        NativeValue::zero(ty)
                    } else {
                        scalar(spec.name, ty, value)?
                    };
                    frame.push_direct(native);
                }

                ParamKind::Handle(tag) => {
                    let address = match value {
                        Value::String(s) => pointer::encode(tag, s),
                        other => {
                            debug!(
                                param = spec.name,
                                got = other.type_name(),
                                "non-string handle, passing null"
                            );
                            0
                        }
                    };
                    frame.push_direct(NativeValue::U64(address));
                }

                ParamKind::InputString { capacity, optional } => {
                    if optional && value.is_null() {
                        frame.push_null();
                    } else {
                        let text = text(spec.name, value)?;
                        // An unset size source sizes the buffer to the text plus a terminator
                        let unsized_fit = text.chars().count() + 1;
                        let capacity = resolve_capacity(
                            spec.name,
                            capacity,
                            descriptor,
                            values,
                            default_capacity,
                        )?
                        .unwrap_or(unsized_fit);
                        frame.push_buffer(StringBuffer::encode(&text, encoding, capacity)?);
                    }
                }

                ParamKind::OptionalScalar(ty) => {
                    if value.is_null() {
                        frame.push_null();
                    } else {
                        frame.push_cell(scalar(spec.name, ty, value)?);
                    }
                }

                ParamKind::OutputString { capacity, .. } => {
                    let seed = if value.is_null() {
                        String::new()
                    } else {
                        text(spec.name, value)?
                    };
                    let capacity = resolve_capacity(
                        spec.name,
                        capacity,
                        descriptor,
                        values,
                        default_capacity,
                    )?
                    .ok_or_else(|| MarshalError::InvalidCapacity {
                        param: spec.name.to_string(),
                        reason: "output buffer size is unset".to_string(),
                    })?;
                    frame.push_buffer(StringBuffer::encode(&seed, encoding, capacity)?);
                }

                ParamKind::BufferSize => {
                    frame.push_cell(scalar(spec.name, NativeType::Int, value)?);
                }
            }
        }

        Ok(frame)
    }

    /// Argument slots in native order
    pub fn args_mut(&mut self) -> &mut [NativeValue] {
        &mut self.args
    }

    /// Decode results in the fixed order: return code, pass-through inputs,
    /// optional scalars, output strings, buffer sizes
    pub fn finish(
        self,
        descriptor: &CallDescriptor,
        values: &[Value],
        ret: NativeValue,
    ) -> CallResult {
        let mut result = CallResult {
            code: ret.to_value(),
            ..CallResult::default()
        };

        for ((spec, value), slot) in descriptor.params.iter().zip(values).zip(&self.slots) {
            match (spec.kind, *slot) {
                (
                    ParamKind::Scalar(_)
                    | ParamKind::ScalarOrZero(_)
                    | ParamKind::Handle(_)
                    | ParamKind::InputString { .. },
                    _,
                ) => result.inputs.push(value.clone()),

                (ParamKind::OptionalScalar(_), Slot::Cell(i)) => {
                    result.scalars.push(self.cells[i].to_value())
                }
                (ParamKind::OptionalScalar(_), _) => result.scalars.push(Value::Null),

                (ParamKind::OutputString { mode, .. }, Slot::Buffer(i)) => result
                    .strings
                    .push(Value::String(self.buffers[i].decode(self.encoding, mode))),
                (ParamKind::OutputString { .. }, _) => result.strings.push(Value::Null),

                (ParamKind::BufferSize, Slot::Cell(i)) => {
                    result.sizes.push(self.cells[i].to_value())
                }
                (ParamKind::BufferSize, _) => result.sizes.push(Value::Null),
            }
        }

        result
    }

    fn push_direct(&mut self, value: NativeValue) {
        self.args.push(value);
        self.slots.push(Slot::Direct);
    }

    fn push_null(&mut self) {
        self.args.push(NativeValue::null());
        self.slots.push(Slot::Null);
    }

    fn push_cell(&mut self, seed: NativeValue) {
        let mut cell = Box::new(seed);
        self.args.push(NativeValue::Ptr(cell.payload_ptr()));
        self.slots.push(Slot::Cell(self.cells.len()));
        self.cells.push(cell);
    }

    fn push_buffer(&mut self, mut buffer: StringBuffer) {
        self.args.push(NativeValue::Ptr(buffer.as_mut_ptr().cast()));
        self.slots.push(Slot::Buffer(self.buffers.len()));
        self.buffers.push(buffer);
    }
}

/// Convert a caller value to a by-value scalar of the given width
fn scalar(param: &str, ty: NativeType, value: &Value) -> Result<NativeValue, MarshalError> {
    let mismatch = || MarshalError::TypeMismatch {
        param: param.to_string(),
        expected: ty.display_name().to_string(),
        got: value.type_name().to_string(),
    };
    let out_of_range = |shown: String| MarshalError::NumberOutOfRange {
        param: param.to_string(),
        value: shown,
        target: ty.display_name().to_string(),
    };

    match ty {
        NativeType::Byte => {
            let i = value.as_int().ok_or_else(mismatch)?;
            // C char accepts both signed and unsigned byte spellings
            if (-128..=255).contains(&i) {
                Ok(NativeValue::Byte(i as i8))
            } else {
                Err(out_of_range(i.to_string()))
            }
        }
        NativeType::Int => {
            let i = value.as_int().ok_or_else(mismatch)?;
            i32::try_from(i)
                .map(NativeValue::Int)
                .map_err(|_| out_of_range(i.to_string()))
        }
        NativeType::Double => value.as_f64().map(NativeValue::Double).ok_or_else(mismatch),
        NativeType::U64 => match value {
            Value::String(s) => Ok(NativeValue::U64(pointer::encode(pointer::VOID_TAG, s))),
            other => other
                .as_int()
                .map(|i| NativeValue::U64(i as u64))
                .ok_or_else(mismatch),
        },
        NativeType::Pointer | NativeType::CharPtr | NativeType::Void => Err(mismatch()),
    }
}

/// Text form of a caller value for string parameters
fn text(param: &str, value: &Value) -> Result<String, MarshalError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int(_) | Value::Number(_) | Value::Bool(_) => Ok(value.to_string()),
        Value::Null => Err(MarshalError::TypeMismatch {
            param: param.to_string(),
            expected: "string".to_string(),
            got: value.type_name().to_string(),
        }),
    }
}

/// Buffer capacity in bytes; `None` when the size parameter is unset
///
/// Size parameters are native `c_int`s, so a size outside that range is
/// rejected before anything is allocated.
fn resolve_capacity(
    param: &str,
    capacity: Capacity,
    descriptor: &CallDescriptor,
    values: &[Value],
    default_capacity: usize,
) -> Result<Option<usize>, MarshalError> {
    let index = match capacity {
        Capacity::Default => return Ok(Some(default_capacity)),
        Capacity::FromParam(index) => index,
    };

    let invalid = |reason: String| MarshalError::InvalidCapacity {
        param: param.to_string(),
        reason,
    };

    let size_param = descriptor
        .params
        .get(index)
        .map(|p| p.name)
        .ok_or_else(|| invalid(format!("no parameter #{}", index)))?;
    let value = values
        .get(index)
        .ok_or_else(|| invalid(format!("no value for '{}'", size_param)))?;
    if value.is_null() {
        return Ok(None);
    }

    let size = value
        .as_int()
        .ok_or_else(|| invalid(format!("'{}' is not an integer", size_param)))?;
    let size = i32::try_from(size).map_err(|_| MarshalError::NumberOutOfRange {
        param: size_param.to_string(),
        value: size.to_string(),
        target: NativeType::Int.display_name().to_string(),
    })?;

    usize::try_from(size)
        .map(Some)
        .map_err(|_| invalid(format!("'{}' is negative ({})", size_param, size)))
}
