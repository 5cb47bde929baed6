//! Safe wrappers around the host's raw JavaVM and jvmtiEnv pointers.
//!
//! Every wrapper carries a lifetime tied to the callback that produced it:
//!
//! - [`JavaVm`] wraps the `JavaVM*` handed to an agent entry point.
//! - [`Jvmti`] is obtained from a `JavaVm` and borrows it.
//! - [`HostArray`] and [`HostString`] are views over memory the host allocated
//!   for a JVMTI call. They borrow the `Jvmti` that returned them and hand the
//!   memory back through `Deallocate` when dropped.
//!
//! ```rust,ignore
//! let vm = unsafe { JavaVm::from_raw(vm_ptr) }.ok_or(jni::JNI_ERR)?;
//! let jvmti = vm.jvmti(jvmti::JVMTI_VERSION_1_2)?;
//!
//! for &klass in jvmti.get_loaded_classes()?.iter() {
//!     if let Some(sig) = jvmti.get_class_signature(klass)? {
//!         println!("{}", sig);
//!     }
//! }
//! // class array and signatures are deallocated here, then the environment
// is disposed when `jvmti` goes out of scope
//! ```

use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::os::raw::c_char;
use std::ptr::{self, NonNull};

use tracing::warn;

use crate::sys::jni;
use crate::sys::jvmti;

/// A borrowed `JavaVM*`, valid for the duration of one agent callback.
pub struct JavaVm<'vm> {
    vm: NonNull<jni::JavaVM>,
    _host: PhantomData<&'vm jni::JavaVM>,
}

impl<'vm> JavaVm<'vm> {
    /// Wraps the raw handle passed to `Agent_OnLoad` / `Agent_OnAttach`.
    ///
    /// Returns `None` if the handle or its function table is null.
    ///
    /// # Safety
    /// A non-null `vm` must point to a live JavaVM for the whole of `'vm`.
    pub unsafe fn from_raw(vm: *mut jni::JavaVM) -> Option<Self> {
        if vm.is_null() || (*vm).is_null() {
            return None;
        }
        NonNull::new(vm).map(|vm| JavaVm { vm, _host: PhantomData })
    }

    /// Get the raw JavaVM pointer
    pub fn raw(&self) -> *mut jni::JavaVM {
        self.vm.as_ptr()
    }

    /// Retrieves a JVMTI environment at the requested interface version.
    ///
    /// On failure the host's `GetEnv` status is returned unchanged
    /// (typically `JNI_EDETACHED` or `JNI_EVERSION`).
    pub fn jvmti(&self, version: jni::jint) -> Result<Jvmti<'_>, jni::jint> {
        let mut env_ptr: *mut c_void = ptr::null_mut();

        let res = unsafe { crate::jvm_call!(self.raw(), GetEnv, &mut env_ptr, version) };
        if res != jni::JNI_OK {
            return Err(res);
        }

        // GetEnv reported success but handed back nothing usable.
        NonNull::new(env_ptr as *mut jvmti::jvmtiEnv)
            .map(|env| Jvmti { env, _vm: PhantomData })
            .ok_or(jni::JNI_ERR)
    }
}

/// A JVMTI environment obtained from a [`JavaVm`].
///
/// Each `GetEnv` call creates a fresh environment in the host, so the wrapper
/// owns it and hands it back through `DisposeEnvironment` when dropped.
pub struct Jvmti<'vm> {
    env: NonNull<jvmti::jvmtiEnv>,
    _vm: PhantomData<&'vm ()>,
}

impl<'vm> Jvmti<'vm> {
    /// Get the raw jvmtiEnv pointer
    pub fn raw(&self) -> *mut jvmti::jvmtiEnv {
        self.env.as_ptr()
    }

    fn functions(&self) -> &jvmti::jvmtiInterface_1_ {
        unsafe { &*(*self.env.as_ptr()).functions }
    }

    /// Lists every class currently loaded in the VM, in host order.
    pub fn get_loaded_classes(&self) -> Result<HostArray<'_, jni::jclass>, jvmti::jvmtiError> {
        let get_loaded_classes_fn = self
            .functions()
            .GetLoadedClasses
            .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;

        let mut class_count: jni::jint = 0;
        let mut classes_ptr: *mut jni::jclass = ptr::null_mut();

        let err = unsafe { get_loaded_classes_fn(self.raw(), &mut class_count, &mut classes_ptr) };
        if err != jvmti::jvmtiError::NONE {
            return Err(err);
        }

        Ok(HostArray {
            jvmti: self,
            ptr: classes_ptr,
            len: usize::try_from(class_count).unwrap_or(0),
        })
    }

    /// Returns the type signature of `klass` (e.g. `Ljava/lang/String;`).
    ///
    /// The generic signature is released straight away. `Ok(None)` means the
    /// host reported success without a signature.
    pub fn get_class_signature(&self, klass: jni::jclass) -> Result<Option<HostString<'_>>, jvmti::jvmtiError> {
        let get_class_sig_fn = self
            .functions()
            .GetClassSignature
            .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;

        let mut sig_ptr: *mut c_char = ptr::null_mut();
        let mut gen_ptr: *mut c_char = ptr::null_mut();

        let err = unsafe { get_class_sig_fn(self.raw(), klass, &mut sig_ptr, &mut gen_ptr) };
        if err != jvmti::jvmtiError::NONE {
            return Err(err);
        }

        if let Err(err) = self.deallocate(gen_ptr as *mut u8) {
            warn!(%err, "failed to release generic class signature");
        }

        Ok(NonNull::new(sig_ptr).map(|ptr| HostString { jvmti: self, ptr }))
    }

    /// Returns memory allocated by a JVMTI call to the host. Null is a no-op.
    pub fn deallocate(&self, mem: *mut u8) -> Result<(), jvmti::jvmtiError> {
        if mem.is_null() {
            return Ok(());
        }

        let deallocate_fn = self
            .functions()
            .Deallocate
            .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;

        let err = unsafe { deallocate_fn(self.raw(), mem) };
        if err != jvmti::jvmtiError::NONE {
            return Err(err);
        }
        Ok(())
    }
}

impl Drop for Jvmti<'_> {
    fn drop(&mut self) {
        let Some(dispose_fn) = self.functions().DisposeEnvironment else {
            warn!("host has no DisposeEnvironment, jvmti environment not released");
            return;
        };
        let err = unsafe { dispose_fn(self.raw()) };
        if err != jvmti::jvmtiError::NONE {
            warn!(%err, "failed to dispose jvmti environment");
        }
    }
}

/// A host-allocated array returned by a JVMTI call.
pub struct HostArray<'env, T> {
    jvmti: &'env Jvmti<'env>,
    ptr: *mut T,
    len: usize,
}

impl<T> Deref for HostArray<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        if self.ptr.is_null() || self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl<T> Drop for HostArray<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.jvmti.deallocate(self.ptr as *mut u8) {
            warn!(%err, len = self.len, "failed to release host array");
        }
    }
}

/// A host-allocated, NUL-terminated modified-UTF-8 string.
pub struct HostString<'env> {
    jvmti: &'env Jvmti<'env>,
    ptr: NonNull<c_char>,
}

impl HostString<'_> {
    pub fn as_c_str(&self) -> &CStr {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        self.as_c_str().to_string_lossy()
    }
}

impl fmt::Display for HostString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl Drop for HostString<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.jvmti.deallocate(self.ptr.as_ptr() as *mut u8) {
            warn!(%err, "failed to release host string");
        }
    }
}
