//! Agent lifecycle: the [`Agent`] trait, the process-wide agent instance and
//! the [`export_agent!`](crate::export_agent) macro that generates the JVM
//! entry points.
//!
//! [`ClassListerAgent`] is the agent this library exports.

use std::ffi::CStr;
use std::io::{self, Write};
use std::os::raw::c_char;
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::env::JavaVm;
use crate::lister::{self, ListError};
use crate::logging;
use crate::options::AgentOptions;
use crate::sys::jni;

/// Lifecycle callbacks of a JVM agent.
///
/// The JVM never calls these concurrently for the same agent, but the
/// instance lives in a global, so implementations must be `Sync + Send`.
pub trait Agent: Sync + Send {
    /// Called from `Agent_OnLoad` when the agent is named on the command line.
    ///
    /// Return `JNI_OK` (0) on success; anything else aborts VM startup.
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint;

    /// Called from `Agent_OnAttach` when the agent is loaded into a running VM.
    ///
    /// The returned status is reported back to the attaching tool.
    fn on_attach(&self, _vm: *mut jni::JavaVM, _options: &str) -> jni::jint {
        jni::JNI_OK
    }

    /// Called from `Agent_OnUnload` just before the library is unloaded.
    fn on_unload(&self) {}
}

// The single agent instance, shared by all entry points of the library.
static GLOBAL_AGENT: OnceLock<Box<dyn Agent>> = OnceLock::new();

/// Returns the global agent, creating it with `T::default()` on first use.
pub fn global_agent<T: Agent + Default + 'static>() -> &'static dyn Agent {
    GLOBAL_AGENT.get_or_init(|| Box::new(T::default())).as_ref()
}

/// Borrows the options string passed to an entry point.
///
/// Null and non-UTF-8 options both read as `""`.
///
/// # Safety
/// A non-null `options` must point to a NUL-terminated string that outlives `'a`.
pub unsafe fn options_from_raw<'a>(options: *const c_char) -> &'a str {
    if options.is_null() {
        return "";
    }
    CStr::from_ptr(options).to_str().unwrap_or("")
}

/// Exports an [`Agent`] type as the JVM agent entry points.
///
/// Generates `Agent_OnLoad`, `Agent_OnAttach` and `Agent_OnUnload`. The agent
/// is created once with `Default` and shared by all three.
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct MyAgent;
///
/// impl Agent for MyAgent {
///     fn on_load(&self, _vm: *mut jni::JavaVM, _options: &str) -> jni::jint {
///         jni::JNI_OK
///     }
/// }
///
/// export_agent!(MyAgent);
/// ```
#[macro_export]
macro_rules! export_agent {
    ($agent_type:ty) => {
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "system" fn Agent_OnLoad(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::os::raw::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            let options = $crate::agent::options_from_raw(options);
            let agent = $crate::agent::global_agent::<$agent_type>();
            $crate::agent::Agent::on_load(agent, vm, options)
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "system" fn Agent_OnAttach(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::os::raw::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            let options = $crate::agent::options_from_raw(options);
            let agent = $crate::agent::global_agent::<$agent_type>();
            $crate::agent::Agent::on_attach(agent, vm, options)
        }

        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "system" fn Agent_OnUnload(_vm: *mut $crate::sys::jni::JavaVM) {
            $crate::agent::Agent::on_unload($crate::agent::global_agent::<$agent_type>());
        }
    };
}

/// Prints the loaded classes of the VM it is attached to.
///
/// Load and unload only announce themselves; attach runs the listing and
/// returns its status. All output goes to stdout.
#[derive(Default)]
pub struct ClassListerAgent;

impl ClassListerAgent {
    pub fn load_to<W: Write + ?Sized>(&self, options: &str, out: &mut W) -> jni::jint {
        apply_options(options);
        let _ = writeln!(out, "Agent OnLoad");
        jni::JNI_OK
    }

    pub fn attach_to<W: Write + ?Sized>(&self, vm: *mut jni::JavaVM, options: &str, out: &mut W) -> jni::jint {
        apply_options(options);
        let _ = writeln!(out, "Agent OnAttach");

        match unsafe { JavaVm::from_raw(vm) } {
            Some(vm) => lister::list_loaded_classes(&vm, out),
            None => {
                let _ = writeln!(out, "{}", ListError::EnvUnavailable(jni::JNI_ERR));
                jni::JNI_ERR
            }
        }
    }

    pub fn unload_to<W: Write + ?Sized>(&self, out: &mut W) {
        let _ = writeln!(out, "Agent OnUnload");
    }
}

impl Agent for ClassListerAgent {
    fn on_load(&self, _vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        self.load_to(options, &mut io::stdout().lock())
    }

    fn on_attach(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        let status = self.attach_to(vm, options, &mut io::stdout().lock());
        debug!(status, "attach finished");
        status
    }

    fn on_unload(&self) {
        self.unload_to(&mut io::stdout().lock());
    }
}

// Logging is set up before anything about the options is reported, so the
// warnings reach the subscriber the options asked for.
fn apply_options(options: &str) {
    let options = AgentOptions::parse(options);
    if let Some(directive) = options.log.as_deref() {
        if logging::init(directive) {
            debug!(directive, "diagnostic logging enabled");
        }
    }
    for entry in &options.ignored {
        warn!(option = %entry, "ignoring unrecognized agent option");
    }
}
