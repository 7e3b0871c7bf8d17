//! Function table: entry-point name → native address
//!
//! The table is an explicit object built once and handed to the adapter.
//! It can be filled three ways:
//! - `register`: one address at a time (tests, embedders)
//! - `from_get_func`: through the host's `GetFunc(name)` resolver
//! - `load_library`: from the exported symbols of a shared library
//!
//! The table only answers lookups; it never checks that an address really
//! has the signature a descriptor claims.

use crate::error::CallError;
use libloading::{Library, Symbol};
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CString};
use std::path::Path;
use std::ptr::NonNull;
use thiserror::Error;
use tracing::{debug, warn};

/// Host resolver signature: returns the address of a named API function or null
pub type GetFunc = unsafe extern "C" fn(name: *const c_char) -> *mut c_void;

/// Table loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to load library {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Entry point '{0}' has a null address")]
    NullEntryPoint(String),

    #[error("Invalid entry point name {0:?}")]
    InvalidName(String),

    #[error("No host library configured")]
    NotConfigured,
}

/// Address of a native function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryPoint(NonNull<c_void>);

// Safety: an entry point is a code address, immutable and process-wide.
unsafe impl Send for EntryPoint {}
unsafe impl Sync for EntryPoint {}

impl EntryPoint {
    /// Wrap a non-null address
    pub fn new(ptr: *const c_void) -> Option<Self> {
        NonNull::new(ptr as *mut c_void).map(EntryPoint)
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.0.as_ptr()
    }
}

/// Registry of native entry points
#[derive(Default)]
pub struct FunctionTable {
    entries: HashMap<String, EntryPoint>,
    /// Libraries whose symbols are in `entries`; kept loaded for the table's lifetime
    libraries: Vec<Library>,
}

impl FunctionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry point under `name`, replacing any previous one
    ///
    /// # Safety
    ///
    /// `ptr` must be the address of a C-ABI function that stays valid for
    /// the table's lifetime.
    pub unsafe fn register(
        &mut self,
        name: impl Into<String>,
        ptr: *const c_void,
    ) -> Result<(), LoadError> {
        let name = name.into();
        let entry = EntryPoint::new(ptr).ok_or_else(|| LoadError::NullEntryPoint(name.clone()))?;
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Build a table by asking the host resolver for each name
    ///
    /// Names the host does not know are skipped with a warning; calling them
    /// later reports a lookup failure.
    ///
    /// # Safety
    ///
    /// `get_func` must be the host's resolver and safe to call with any
    /// NUL-terminated name.
    pub unsafe fn from_get_func<'a, I>(get_func: GetFunc, names: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = Self::new();
        for name in names {
            let c_name = CString::new(name).map_err(|_| LoadError::InvalidName(name.to_string()))?;
            match EntryPoint::new(get_func(c_name.as_ptr())) {
                Some(entry) => {
                    table.entries.insert(name.to_string(), entry);
                }
                None => warn!(name, "host resolver has no entry point"),
            }
        }
        debug!(resolved = table.len(), "function table built from host resolver");
        Ok(table)
    }

    /// Load a shared library and register its exported symbols among `names`
    ///
    /// Returns how many names were resolved. Missing symbols are skipped.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialisers; the library must be trusted
    /// and its symbols must be C-ABI functions.
    pub unsafe fn load_library<'a, I>(&mut self, path: &Path, names: I) -> Result<usize, LoadError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let library = Library::new(path).map_err(|e| LoadError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut resolved = 0;
        for name in names {
            let symbol: Result<Symbol<'_, *mut c_void>, _> = library.get(name.as_bytes());
            match symbol.ok().and_then(|s| EntryPoint::new(*s)) {
                Some(entry) => {
                    self.entries.insert(name.to_string(), entry);
                    resolved += 1;
                }
                None => warn!(name, library = %path.display(), "symbol not exported"),
            }
        }

        debug!(resolved, library = %path.display(), "function table loaded library");
        self.libraries.push(library);
        Ok(resolved)
    }

    /// Look up an entry point by exact name
    pub fn lookup(&self, name: &str) -> Result<EntryPoint, CallError> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| CallError::LookupFailure(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, unordered
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTable")
            .field("entries", &self.entries.len())
            .field("libraries", &self.libraries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    extern "C" fn answer() -> i32 {
        42
    }

    unsafe extern "C" fn fake_get_func(name: *const c_char) -> *mut c_void {
        match CStr::from_ptr(name).to_bytes() {
            b"Answer" => answer as *const () as *mut c_void,
            _ => std::ptr::null_mut(),
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut table = FunctionTable::new();
        unsafe {
            table
                .register("Answer", answer as *const () as *const c_void)
                .unwrap();
        }

        assert!(table.contains("Answer"));
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup("Answer").unwrap().as_ptr(),
            answer as *const () as *const c_void
        );
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut table = FunctionTable::new();
        unsafe {
            table
                .register("Answer", answer as *const () as *const c_void)
                .unwrap();
        }

        assert!(matches!(
            table.lookup("answer"),
            Err(CallError::LookupFailure(ref n)) if n == "answer"
        ));
    }

    #[test]
    fn test_register_null_rejected() {
        let mut table = FunctionTable::new();
        let result = unsafe { table.register("Nothing", std::ptr::null()) };
        assert_eq!(result, Err(LoadError::NullEntryPoint("Nothing".to_string())));
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_get_func_skips_unknown() {
        let table = unsafe { FunctionTable::from_get_func(fake_get_func, ["Answer", "Missing"]) }
            .unwrap();

        assert!(table.contains("Answer"));
        assert!(!table.contains("Missing"));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Answer"]);
    }

    #[test]
    fn test_from_get_func_rejects_nul_in_name() {
        let result = unsafe { FunctionTable::from_get_func(fake_get_func, ["An\0swer"]) };
        assert!(matches!(result, Err(LoadError::InvalidName(_))));
    }

    #[test]
    fn test_load_missing_library() {
        let mut table = FunctionTable::new();
        let result = unsafe {
            table.load_library(Path::new("/nonexistent/librpr_host_shim.so"), ["Answer"])
        };
        assert!(matches!(result, Err(LoadError::LoadFailed { .. })));
    }
}
