//! The boundary between the class lister and the host VM.
//!
//! [`Host`] hands out a [`Tooling`] interface for one listing; both are
//! implemented for the real wrappers in [`crate::env`], and tests implement
//! them over plain Rust data.

use std::fmt;
use std::ops::Deref;

use crate::env::{HostArray, HostString, JavaVm, Jvmti};
use crate::sys::jni;
use crate::sys::jvmti::jvmtiError;

/// A running VM that can provide a tooling interface.
pub trait Host {
    type Tooling<'a>: Tooling
    where
        Self: 'a;

    /// Acquires the tooling interface at `version`, or the host's raw status.
    fn tooling(&self, version: jni::jint) -> Result<Self::Tooling<'_>, jni::jint>;
}

/// The introspection calls the class lister needs.
pub trait Tooling {
    /// Opaque class reference, only meaningful to this tooling instance.
    type Class: Copy;

    type Classes<'a>: Deref<Target = [Self::Class]>
    where
        Self: 'a;

    type Signature<'a>: fmt::Display
    where
        Self: 'a;

    fn loaded_classes(&self) -> Result<Self::Classes<'_>, jvmtiError>;

    /// `Ok(None)` when the host succeeds but returns no signature.
    fn class_signature(&self, class: Self::Class) -> Result<Option<Self::Signature<'_>>, jvmtiError>;
}

impl Host for JavaVm<'_> {
    type Tooling<'a> = Jvmti<'a> where Self: 'a;

    fn tooling(&self, version: jni::jint) -> Result<Jvmti<'_>, jni::jint> {
        self.jvmti(version)
    }
}

impl Tooling for Jvmti<'_> {
    type Class = jni::jclass;
    type Classes<'a> = HostArray<'a, jni::jclass> where Self: 'a;
    type Signature<'a> = HostString<'a> where Self: 'a;

    fn loaded_classes(&self) -> Result<HostArray<'_, jni::jclass>, jvmtiError> {
        self.get_loaded_classes()
    }

    fn class_signature(&self, class: jni::jclass) -> Result<Option<HostString<'_>>, jvmtiError> {
        self.get_class_signature(class)
    }
}
