//! Call adapter
//!
//! Turns a call descriptor plus caller values into one native call:
//! marshal each parameter by its kind, invoke the prepared entry point,
//! then decode by-reference slots back into caller values.
//!
//! Parameter kinds:
//! - `Scalar` / `ScalarOrZero`: by value at a fixed native width
//! - `Handle`: tagged pointer string passed as a 64-bit address
//! - `InputString`: text copied into a buffer the host only reads
//! - `OptionalScalar`: by-reference scalar, null when unset
//! - `OutputString`: buffer the host may overwrite
//! - `BufferSize`: by-reference integer carrying a buffer length

mod frame;

pub use frame::ArgFrame;

use crate::catalogue;
use crate::dispatch::{self, ExecutionContext};
use crate::error::CallError;
use crate::ffi::buffer::{DecodeMode, Encoding};
use crate::ffi::caller::ExternFunction;
use crate::ffi::table::{FunctionTable, LoadError};
use crate::ffi::types::NativeType;
use crate::value::Value;
use rpr_config::{Config, MAX_STRBUF};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// Where a buffer's capacity comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// The adapter's configured default capacity
    Default,
    /// The caller's value for logical parameter `i`
    FromParam(usize),
}

/// How one logical parameter crosses the native boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Scalar(NativeType),
    /// Like `Scalar`, but an unset value passes zero
    ScalarOrZero(NativeType),
    /// Pointer string with the expected type tag
    Handle(&'static str),
    InputString { capacity: Capacity, optional: bool },
    OptionalScalar(NativeType),
    OutputString { capacity: Capacity, mode: DecodeMode },
    BufferSize,
}

impl ParamKind {
    /// Native type of the argument slot this kind produces
    pub fn native_type(&self) -> NativeType {
        match self {
            ParamKind::Scalar(ty) | ParamKind::ScalarOrZero(ty) => *ty,
            ParamKind::Handle(_) => NativeType::U64,
            ParamKind::InputString { .. } | ParamKind::OutputString { .. } => NativeType::CharPtr,
            ParamKind::OptionalScalar(_) | ParamKind::BufferSize => NativeType::Pointer,
        }
    }
}

/// A named parameter in a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn new(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind }
    }
}

/// Thread affinity of a native function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecContext {
    /// Callable from any thread
    #[default]
    Any,
    /// Must run on the host's thread
    Host,
}

/// Static description of one wrapped native function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallDescriptor {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
    pub return_type: NativeType,
    pub context: ExecContext,
}

impl CallDescriptor {
    pub const fn new(
        name: &'static str,
        params: &'static [ParamSpec],
        return_type: NativeType,
    ) -> Self {
        Self {
            name,
            params,
            return_type,
            context: ExecContext::Any,
        }
    }

    /// Same descriptor, bound to the host thread
    pub const fn host_bound(self) -> Self {
        Self {
            context: ExecContext::Host,
            ..self
        }
    }

    /// Native parameter types in call order
    pub fn native_types(&self) -> Vec<NativeType> {
        self.params.iter().map(|p| p.kind.native_type()).collect()
    }

    /// Check that every `FromParam` capacity names an integer parameter
    pub fn validate(&self) -> Result<(), CallError> {
        for spec in self.params {
            let capacity = match spec.kind {
                ParamKind::InputString { capacity, .. }
                | ParamKind::OutputString { capacity, .. } => capacity,
                _ => continue,
            };
            if let Capacity::FromParam(index) = capacity {
                let sized_by_int = matches!(
                    self.params.get(index).map(|p| p.kind),
                    Some(
                        ParamKind::Scalar(NativeType::Int)
                            | ParamKind::ScalarOrZero(NativeType::Int)
                            | ParamKind::BufferSize
                    )
                );
                if !sized_by_int {
                    return Err(CallError::PrepareFailed {
                        name: self.name.to_string(),
                        reason: format!(
                            "capacity of '{}' refers to parameter #{}, which is not an integer",
                            spec.name, index
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Outcome of one native call, in the fixed result order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallResult {
    /// Raw native return code, uninterpreted
    pub code: Value,
    /// Input-only values, exactly as the caller passed them
    pub inputs: Vec<Value>,
    /// Optional by-reference scalars after the call (`Null` when unset)
    pub scalars: Vec<Value>,
    /// Output buffers after the call
    pub strings: Vec<Value>,
    /// Buffer-size slots after the call
    pub sizes: Vec<Value>,
}

impl CallResult {
    /// Flatten into a single sequence: code first, then each group in order
    pub fn into_values(self) -> Vec<Value> {
        let mut values = Vec::with_capacity(
            1 + self.inputs.len() + self.scalars.len() + self.strings.len() + self.sizes.len(),
        );
        values.push(self.code);
        values.extend(self.inputs);
        values.extend(self.scalars);
        values.extend(self.strings);
        values.extend(self.sizes);
        values
    }
}

struct AdapterInner {
    table: FunctionTable,
    default_capacity: usize,
    encoding: Encoding,
    prepared: RwLock<HashMap<PreparedKey, Arc<ExternFunction>>>,
}

/// Entry point name plus the native signature it was prepared for
type PreparedKey = (&'static str, Vec<NativeType>, NativeType);

/// Marshals caller values through a function table
///
/// Cheap to clone; clones share the table and the prepared entry points.
/// Calls hold no adapter-wide lock while native code runs.
#[derive(Clone)]
pub struct CallAdapter {
    inner: Arc<AdapterInner>,
    context: Option<Arc<dyn ExecutionContext>>,
}

impl CallAdapter {
    /// Adapter with the built-in default capacity
    pub fn new(table: FunctionTable) -> Self {
        Self::with_capacity(table, MAX_STRBUF)
    }

    /// Adapter using the configured default capacity
    pub fn from_config(table: FunctionTable, config: &Config) -> Self {
        Self::with_capacity(table, config.default_capacity())
    }

    /// Adapter over the host library named by `config`
    ///
    /// Resolves every catalogue function the library exports; missing ones
    /// fail with a lookup error when called.
    ///
    /// # Safety
    ///
    /// Same contract as [`FunctionTable::load_library`]: the library must be
    /// trusted and export the host API with its declared signatures.
    pub unsafe fn load_from_config(config: &Config) -> Result<Self, CallError> {
        let path = config.host_library().ok_or(LoadError::NotConfigured)?;
        let mut table = FunctionTable::new();
        table.load_library(&path, catalogue::names())?;
        Ok(Self::from_config(table, config))
    }

    fn with_capacity(table: FunctionTable, default_capacity: usize) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                table,
                default_capacity,
                encoding: Encoding::default(),
                prepared: RwLock::new(HashMap::new()),
            }),
            context: None,
        }
    }

    /// Attach the execution context that host-bound functions must run in
    pub fn with_context(mut self, context: Arc<dyn ExecutionContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn default_capacity(&self) -> usize {
        self.inner.default_capacity
    }

    pub fn table(&self) -> &FunctionTable {
        &self.inner.table
    }

    /// Number of entry points prepared so far
    pub fn prepared_count(&self) -> usize {
        self.inner
            .prepared
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Call a catalogue function by name
    pub fn call(&self, name: &str, args: &[Value]) -> Result<CallResult, CallError> {
        let descriptor = catalogue::descriptor(name)
            .ok_or_else(|| CallError::UnknownFunction(name.to_string()))?;
        self.call_with(descriptor, args)
    }

    /// Call through an explicit descriptor
    pub fn call_with(
        &self,
        descriptor: &CallDescriptor,
        args: &[Value],
    ) -> Result<CallResult, CallError> {
        if args.len() != descriptor.params.len() {
            return Err(CallError::ArityMismatch {
                name: descriptor.name.to_string(),
                expected: descriptor.params.len(),
                got: args.len(),
            });
        }

        if descriptor.context == ExecContext::Host {
            if let Some(context) = &self.context {
                if !context.is_current() {
                    debug!(function = descriptor.name, "forwarding call to host context");
                    let adapter = self.clone();
                    let descriptor = *descriptor;
                    let args = args.to_vec();
                    return dispatch::run_in(context.as_ref(), move || {
                        adapter.call_here(&descriptor, &args)
                    })?;
                }
            }
        }

        self.call_here(descriptor, args)
    }

    fn call_here(
        &self,
        descriptor: &CallDescriptor,
        args: &[Value],
    ) -> Result<CallResult, CallError> {
        let function = self.resolve(descriptor)?;
        let mut frame = ArgFrame::build(
            descriptor,
            args,
            self.inner.default_capacity,
            self.inner.encoding,
        )?;

        trace!(function = descriptor.name, "invoking native entry point");
        // Safety: every pointer in the frame refers to storage the frame owns
        // and sizes it to the capacity passed alongside it.
        let ret = unsafe { function.invoke(frame.args_mut())? };

        Ok(frame.finish(descriptor, args, ret))
    }

    /// Prepared entry point for `descriptor`, preparing it on first use
    ///
    /// Two descriptors sharing a name but not a signature get separate
    /// call interfaces.
    fn resolve(&self, descriptor: &CallDescriptor) -> Result<Arc<ExternFunction>, CallError> {
        let key: PreparedKey = (
            descriptor.name,
            descriptor.native_types(),
            descriptor.return_type,
        );
        if let Some(function) = self
            .inner
            .prepared
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Ok(Arc::clone(function));
        }

        descriptor.validate()?;
        let entry = self.inner.table.lookup(descriptor.name)?;
        // Safety: the table holds C-ABI entry points that outlive the adapter;
        // the descriptor declares the host's signature for this name.
        let function = unsafe {
            ExternFunction::prepare(descriptor.name, entry, key.1.clone(), key.2)?
        };
        debug!(
            function = descriptor.name,
            signature = %function.signature_key(),
            "prepared entry point"
        );

        let mut prepared = self.inner.prepared.write().unwrap_or_else(|e| e.into_inner());
        let function = prepared.entry(key).or_insert_with(|| Arc::new(function));
        Ok(Arc::clone(function))
    }
}

impl std::fmt::Debug for CallAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallAdapter")
            .field("table", &self.inner.table)
            .field("default_capacity", &self.inner.default_capacity)
            .field("prepared", &self.prepared_count())
            .field("has_context", &self.context.is_some())
            .finish()
    }
}
