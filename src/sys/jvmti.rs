// loaded-classes-agent/src/sys/jvmti.rs
//
// JVMTI (JVM Tool Interface) declarations used by the class listing agent.
//
// The jvmtiEnv function table has 156 slots (JDK 11+). Only Deallocate (47),
// GetClassSignature (48) and GetLoadedClasses (78) are typed here; every other
// slot is a reserved pointer so the typed slots sit at the C offsets.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::fmt;
use std::os::raw::{c_char, c_uchar, c_void};

use crate::sys::jni::{jclass, jint};

// --- Constants ---
pub const JVMTI_VERSION_1_2: jint = 0x30010200;

// --- Error Codes ---
//
// jvmtiError is a C enum, but the host may hand back values added by newer
// JDKs. A transparent newtype keeps every value representable.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct jvmtiError(pub u32);

impl jvmtiError {
    pub const NONE: jvmtiError = jvmtiError(0);
    pub const INVALID_CLASS: jvmtiError = jvmtiError(21);
    pub const NOT_AVAILABLE: jvmtiError = jvmtiError(98);
    pub const ILLEGAL_ARGUMENT: jvmtiError = jvmtiError(103);
    pub const WRONG_PHASE: jvmtiError = jvmtiError(112);
    pub const INVALID_ENVIRONMENT: jvmtiError = jvmtiError(116);

    /// The raw code as the `jint` an agent entry point returns.
    pub fn as_jint(self) -> jint {
        self.0 as jint
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::NONE => "NONE",
            Self::INVALID_CLASS => "INVALID_CLASS",
            Self::NOT_AVAILABLE => "NOT_AVAILABLE",
            Self::ILLEGAL_ARGUMENT => "ILLEGAL_ARGUMENT",
            Self::WRONG_PHASE => "WRONG_PHASE",
            Self::INVALID_ENVIRONMENT => "INVALID_ENVIRONMENT",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "JVMTI_ERROR_{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

// --- Function Types ---
pub type JvmtiDeallocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError;
pub type JvmtiGetClassSignatureFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetLoadedClassesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, class_count_ptr: *mut jint, classes_ptr: *mut *mut jclass) -> jvmtiError;
pub type JvmtiDisposeEnvironmentFn = unsafe extern "system" fn(env: *mut jvmtiEnv) -> jvmtiError;

#[repr(C)]
pub struct jvmtiInterface_1_ {
    /*   1-46: not used by this agent */
    pub reserved1_46: [*mut c_void; 46],
    /*   47: Deallocate */
    pub Deallocate: Option<JvmtiDeallocateFn>,
    /*   48: Get Class Signature */
    pub GetClassSignature: Option<JvmtiGetClassSignatureFn>,
    /*   49-77: not used by this agent */
    pub reserved49_77: [*mut c_void; 29],
    /*   78: Get Loaded Classes */
    pub GetLoadedClasses: Option<JvmtiGetLoadedClassesFn>,
    /*   79-126: not used by this agent */
    pub reserved79_126: [*mut c_void; 48],
    /*   127: Dispose Environment */
    pub DisposeEnvironment: Option<JvmtiDisposeEnvironmentFn>,
    /*   128-156: not used by this agent */
    pub reserved128_156: [*mut c_void; 29],
}

impl Default for jvmtiInterface_1_ {
    fn default() -> Self {
        jvmtiInterface_1_ {
            reserved1_46: [std::ptr::null_mut(); 46],
            Deallocate: None,
            GetClassSignature: None,
            reserved49_77: [std::ptr::null_mut(); 29],
            GetLoadedClasses: None,
            reserved79_126: [std::ptr::null_mut(); 48],
            DisposeEnvironment: None,
            reserved128_156: [std::ptr::null_mut(); 29],
        }
    }
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}
