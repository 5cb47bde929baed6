//! # loaded-classes-agent
//!
//! A JVMTI agent that prints the type signature of every class loaded in a
//! running JVM.
//!
//! ## Usage
//!
//! **Attach to a running VM** (JDK Attach API):
//! ```java
//! VirtualMachine vm = VirtualMachine.attach(pid);
//! vm.loadAgentPath("/path/to/libloaded_classes_agent.so", "log=debug");
//! ```
//!
//! The target VM's stdout then shows:
//! ```text
//! Agent OnAttach
//! class signature = Ljava/lang/Object;
//! class signature = Ljava/lang/String;
//! ...
//! ```
//!
//! **Load at startup** (only announces itself; the listing runs on attach):
//! ```bash
//! java -agentpath:./target/release/libloaded_classes_agent.so MyApp
//! ```
//!
//! ## Options
//!
//! The options string is a comma-separated list of `key=value` pairs; see
//! [`options::AgentOptions`]. `log=<filter>` turns on `tracing` diagnostics
//! on stderr.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │   Agent_OnLoad / Agent_OnAttach / Agent_OnUnload         │
//! │        export_agent!(ClassListerAgent)    (agent)        │
//! ├─────────────────────────────────────────────────────────┤
//! │   list_loaded_classes(&impl Host, &mut impl Write)       │
//! │                                           (lister)       │
//! ├─────────────────────────────────────────────────────────┤
//! │   Host / Tooling traits                   (host)         │
//! │   JavaVm, Jvmti, HostArray, HostString    (env)          │
//! ├─────────────────────────────────────────────────────────┤
//! │   Raw JNI / JVMTI declarations            (sys)          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod sys;
pub mod env;
pub mod host;
pub mod lister;
pub mod options;
pub mod logging;
pub mod agent;

pub use crate::agent::{Agent, ClassListerAgent};
pub use crate::lister::{list_loaded_classes, try_list_loaded_classes, ListError};

crate::export_agent!(crate::agent::ClassListerAgent);
