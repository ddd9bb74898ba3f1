//! Dynamic loading of binding libraries
//!
//! A binding library is a shared object exporting
//! `extern "C" fn tether_register_bindings()`, which runs the same binding
//! DSL an in-process module would. `load_bindings` opens the library,
//! invokes that symbol once and parks the handle for the lifetime of the
//! process so the registered invokers stay valid.

use std::ffi::CString;
use std::sync::LazyLock;

use parking_lot::Mutex;
use thiserror::Error;

/// Errors raised while opening a binding library.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The library could not be opened.
    #[error("Problem loading bindings: {0}")]
    Open(String),

    /// The registration symbol is missing.
    #[error("Symbol not found: {symbol} in {library}")]
    SymbolNotFound {
        /// Symbol name looked up
        symbol: String,
        /// Library path
        library: String,
    },

    /// The path could not be encoded for the platform loader.
    #[error("Invalid library path: {0}")]
    InvalidPath(String),
}

const REGISTER_SYMBOL: &str = "tether_register_bindings";

// Handles stay open for the process lifetime; dropping one would unload the
// code behind registered invokers.
static LOADED: LazyLock<Mutex<Vec<Library>>> = LazyLock::new(|| Mutex::new(Vec::new()));

/// Open a binding library and run its registration entry point.
pub fn load_bindings(path: &str) -> Result<(), LoadError> {
    let library = Library::open(path)?;
    let register: extern "C" fn() = unsafe { library.symbol(REGISTER_SYMBOL)? };
    register();
    LOADED.lock().push(library);
    Ok(())
}

/// An open shared-library handle.
pub struct Library {
    handle: *mut std::ffi::c_void,
    path: String,
}

// The raw handle is only ever used for symbol lookup, which the platform
// loaders allow from any thread.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

#[cfg(unix)]
impl Library {
    /// Open a shared library with lazy symbol resolution.
    pub fn open(path: &str) -> Result<Self, LoadError> {
        let c_path =
            CString::new(path).map_err(|_| LoadError::InvalidPath(path.to_string()))?;
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY) };
        if handle.is_null() {
            return Err(LoadError::Open(format!("{path}: {}", last_dl_error())));
        }
        Ok(Library {
            handle,
            path: path.to_string(),
        })
    }

    /// Resolve a symbol.
    ///
    /// # Safety
    ///
    /// The caller must name a symbol whose actual signature matches `T`, and
    /// must not use the result after the library is dropped.
    pub unsafe fn symbol<T>(&self, name: &str) -> Result<T, LoadError> {
        let c_name = CString::new(name).map_err(|_| LoadError::InvalidPath(name.to_string()))?;
        libc::dlerror(); // clear any stale error
        let symbol = libc::dlsym(self.handle, c_name.as_ptr());
        if symbol.is_null() {
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{}: {}", self.path, last_dl_error()),
            });
        }
        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(unix)]
fn last_dl_error() -> String {
    unsafe {
        let err = libc::dlerror();
        if err.is_null() {
            "unknown error".to_string()
        } else {
            std::ffi::CStr::from_ptr(err).to_string_lossy().into_owned()
        }
    }
}

#[cfg(unix)]
impl Drop for Library {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

#[cfg(windows)]
impl Library {
    /// Open a shared library.
    pub fn open(path: &str) -> Result<Self, LoadError> {
        use std::os::windows::ffi::OsStrExt;
        let wide: Vec<u16> = std::ffi::OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();
        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };
        if handle.is_null() {
            let code = unsafe { GetLastError() };
            return Err(LoadError::Open(format!("{path} (error code: {code})")));
        }
        Ok(Library {
            handle,
            path: path.to_string(),
        })
    }

    /// Resolve a symbol; see the unix variant for the safety contract.
    pub unsafe fn symbol<T>(&self, name: &str) -> Result<T, LoadError> {
        let c_name = CString::new(name).map_err(|_| LoadError::InvalidPath(name.to_string()))?;
        let symbol = GetProcAddress(self.handle, c_name.as_ptr());
        if symbol.is_null() {
            let code = GetLastError();
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{} (error code: {code})", self.path),
            });
        }
        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(windows)]
impl Drop for Library {
    fn drop(&mut self) {
        unsafe {
            FreeLibrary(self.handle);
        }
    }
}

#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut std::ffi::c_void;
    fn GetProcAddress(module: *mut std::ffi::c_void, name: *const i8) -> *mut std::ffi::c_void;
    fn FreeLibrary(module: *mut std::ffi::c_void) -> i32;
    fn GetLastError() -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_reports_the_path() {
        let err = load_bindings("/nonexistent/libtether_demo.so").expect_err("no such library");
        match err {
            LoadError::Open(message) => assert!(message.contains("/nonexistent")),
            other => panic!("expected Open error, got {other:?}"),
        }
    }
}
