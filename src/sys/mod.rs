//! Raw FFI declarations for the parts of JNI and JVMTI this agent touches.
//!
//! Layouts follow the C headers (`jni.h`, `jvmti.h`). Function-table slots the
//! agent never calls are kept as reserved pointers so field offsets still match.

pub mod jni;
pub mod jvmti;
