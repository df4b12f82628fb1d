//! Macros for handler module development

/// Export a handler module from a `cdylib` crate.
///
/// Takes a function (or closure) returning the module's
/// [`ModuleNamespace`](crate::ModuleNamespace) and generates the two symbols
/// [`DynamicLibraryLoader`](crate::DynamicLibraryLoader) looks up. Panics in
/// the builder are caught at the FFI boundary and reported as a null module.
///
/// ```rust,ignore
/// use handler_loader::{export_handler_module, Execute, HandlerCandidate, ModuleNamespace};
///
/// fn module() -> ModuleNamespace {
///     ModuleNamespace::new().with_default(
///         HandlerCandidate::new()
///             .with("name", "greet")
///             .with("execute", Execute::sync(|_| Ok(()))),
///     )
/// }
///
/// export_handler_module!(module);
/// ```
#[macro_export]
macro_rules! export_handler_module {
    ($builder:expr) => {
        /// ABI version this module was built against
        #[no_mangle]
        pub extern "C" fn handler_loader_abi_version() -> *const ::std::os::raw::c_char {
            $crate::HANDLER_LOADER_ABI_VERSION.as_ptr()
        }

        /// Module constructor; ownership of the namespace passes to the loader
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn handler_module() -> *mut $crate::ModuleNamespace {
            use ::std::panic::{catch_unwind, AssertUnwindSafe};

            match catch_unwind(AssertUnwindSafe(|| -> $crate::ModuleNamespace { ($builder)() })) {
                Ok(namespace) => ::std::boxed::Box::into_raw(::std::boxed::Box::new(namespace)),
                Err(panic_info) => {
                    eprintln!("Handler module construction panicked: {:?}", panic_info);
                    ::std::ptr::null_mut()
                }
            }
        }
    };
}
