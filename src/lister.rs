//! Prints the type signature of every class loaded in the host.
//!
//! The listing is three host calls in sequence: acquire JVMTI, fetch the
//! loaded classes, then ask for each class's signature. A failure in the
//! first two abandons the listing and hands back the host's own status.
//!
//! Output is one line per class:
//!
//! ```text
//! class signature = Ljava/lang/String;
//! class signature = [I
//! ```

use std::io::Write;

use thiserror::Error;
use tracing::{debug, warn};

use crate::host::{Host, Tooling};
use crate::sys::jni;
use crate::sys::jvmti::{self, jvmtiError};

/// JVMTI version the lister asks the host for.
pub const REQUIRED_JVMTI_VERSION: jni::jint = jvmti::JVMTI_VERSION_1_2;

/// Why a listing was abandoned. The `Display` text is the diagnostic line.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    /// `GetEnv` rejected the request; carries its `jint` status.
    #[error("Unable to access jvm env")]
    EnvUnavailable(jni::jint),

    #[error("JVMTI GetLoadedClasses failed")]
    LoadedClasses(jvmtiError),
}

impl ListError {
    /// The host status code, unchanged.
    pub fn status(&self) -> jni::jint {
        match self {
            ListError::EnvUnavailable(status) => *status,
            ListError::LoadedClasses(err) => err.as_jint(),
        }
    }
}

/// Lists loaded classes into `out` and returns the agent status: `JNI_OK`,
/// or the host's code if the listing was abandoned.
pub fn list_loaded_classes<H, W>(host: &H, out: &mut W) -> jni::jint
where
    H: Host + ?Sized,
    W: Write + ?Sized,
{
    match try_list_loaded_classes(host, out) {
        Ok(_) => jni::JNI_OK,
        Err(err) => {
            debug!(status = err.status(), "class listing abandoned");
            // Console write failures never change the status.
            let _ = writeln!(out, "{}", err);
            err.status()
        }
    }
}

/// Like [`list_loaded_classes`] but leaves reporting of the failure to the
/// caller. Returns the number of classes printed.
pub fn try_list_loaded_classes<H, W>(host: &H, out: &mut W) -> Result<usize, ListError>
where
    H: Host + ?Sized,
    W: Write + ?Sized,
{
    let tooling = host
        .tooling(REQUIRED_JVMTI_VERSION)
        .map_err(ListError::EnvUnavailable)?;

    let classes = tooling.loaded_classes().map_err(ListError::LoadedClasses)?;
    debug!(count = classes.len(), "loaded classes");

    for (index, &class) in classes.iter().enumerate() {
        let written = match tooling.class_signature(class) {
            Ok(Some(signature)) => writeln!(out, "class signature = {}", signature),
            Ok(None) => writeln!(out, "class signature = <unknown>"),
            Err(err) => {
                warn!(index, %err, "GetClassSignature failed");
                writeln!(out, "class signature = <unavailable: error {}>", err.0)
            }
        };
        if let Err(err) = written {
            debug!(index, %err, "console write failed");
        }
    }

    Ok(classes.len())
}
