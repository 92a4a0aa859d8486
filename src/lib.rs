//! # jvmti-stacks
//!
//! Stack sampling for JVM profilers, built on JVMTI.
//!
//! The crate captures what threads inside a running JVM are doing and turns
//! the opaque method identifiers in those stacks into readable names:
//! - Sample one thread's stack into a reusable, pre-sized frame buffer
//! - Snapshot every thread's stack and state in one consistent capture
//! - Resolve batches of method identifiers into one packed metadata blob
//!
//! It builds as a loadable agent (`cdylib`) that binds these operations to the
//! native methods of a profiler's Java-side bridge class, and as a library
//! (`rlib`) exposing [`SamplingSession`] for agents of your own.
//!
//! ## Loading the Agent
//!
//! ```bash
//! cargo build --release
//! java -agentpath:./target/release/libjvmti_stacks.so=frames=2048,log=info MyApp
//! ```
//!
//! See [`config`] for the option keys.
//!
//! ## Embedding
//!
//! Disable the `agent` feature and drive a session from your own [`Agent`]:
//!
//! ```rust,ignore
//! use jvmti_stacks::prelude::*;
//!
//! let session = SamplingSession::new(Jvmti::new(vm)?);
//! session.create_frame_buffer(1024);
//!
//! let snapshot = session.capture_all_stacks();
//! let mut ids: Vec<i64> = snapshot.frames.iter().flatten().copied().collect();
//! ids.sort_unstable();
//! ids.dedup();
//! for record in session.resolve_method_metadata(&ids).records() {
//!     println!("{}.{}{}", record.class_name, record.method_name, record.signature);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            Agent surface (agent, natives)                │
//! │   Agent_OnLoad, VMInit/VMDeath, RegisterNatives          │
//! ├─────────────────────────────────────────────────────────┤
//! │                 SamplingSession (session)                │
//! │   the six sampling operations behind one context object  │
//! ├─────────────────────────────────────────────────────────┤
//! │  Core: frame_buffer, sampler, snapshot, metadata,        │
//! │        byte_store, thread_state                          │
//! ├─────────────────────────────────────────────────────────┤
//! │              Runtime seam (runtime::Runtime)             │
//! │   implemented by env::Jvmti, and by test doubles         │
//! ├─────────────────────────────────────────────────────────┤
//! │              Raw FFI Bindings (sys module)               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`session`] | [`SamplingSession`]: start here |
//! | [`metadata`] | Packed method metadata and its decoder |
//! | [`snapshot`] | All-threads capture |
//! | [`method_table`] | Profiler-side name cache with persistence |
//! | [`runtime`] | The capability trait the core is written against |
//! | [`env`] | JVMTI and JNI wrappers |
//! | [`sys::jni`], [`sys::jvmti`] | Raw FFI declarations |

pub mod sys;
pub mod env;

// Implementation modules (use `env` module for the public API)
#[doc(hidden)]
pub mod jvmti_wrapper;
#[doc(hidden)]
pub mod jni_wrapper;

pub mod byte_store;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod frame_buffer;
pub mod handle;
pub mod metadata;
pub mod method_table;
pub mod mutf8;
pub mod runtime;
pub mod sampler;
pub mod session;
pub mod snapshot;
pub mod thread_state;

pub mod agent;
mod natives;

pub mod prelude;

pub use error::{Error, Result};
pub use session::SamplingSession;

use std::sync::OnceLock;

pub use crate::sys::jni as jni;
use crate::sys::jvmti as jvmti;

/// The core trait for implementing a JVMTI agent.
///
/// Implement this trait and use [`export_agent!`] to create a loadable agent
/// library. Only the VM lifecycle events are dispatched; both have no-op
/// defaults.
///
/// Your agent must be `Sync + Send` because JVMTI events can fire from any thread.
pub trait Agent: Sync + Send {
    /// Called when the agent is loaded into the JVM.
    ///
    /// Return `JNI_OK` (0) on success, or `JNI_ERR` (-1) to abort VM startup.
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint;

    /// Called when the agent is unloaded (JVM shutdown).
    fn on_unload(&self) {}

    /// Called when the VM initialization is complete.
    ///
    /// At this point, JNI is fully functional and application classes can be
    /// found through the system class loader.
    fn vm_init(&self, _jni: *mut jni::JNIEnv, _thread: jni::jthread) {}

    /// Called when the VM is about to terminate.
    fn vm_death(&self, _jni: *mut jni::JNIEnv) {}
}

// This holds the Agent instance so the static C callbacks can find it.
pub static GLOBAL_AGENT: OnceLock<Box<dyn Agent>> = OnceLock::new();

/// Helper to initialize the global agent (called by the macro)
pub fn set_global_agent(agent: Box<dyn Agent>) -> Result<(), Box<dyn Agent>> {
    GLOBAL_AGENT.set(agent)
}

/// Reads the `-agentpath` option string (called by the macro).
///
/// A null pointer means no options. Bytes that are not UTF-8 yield `None`,
/// which aborts loading like any other malformed option string.
///
/// # Safety
/// `options` must be null or point to a NUL-terminated string.
pub unsafe fn agent_options<'a>(options: *const std::ffi::c_char) -> Option<&'a str> {
    if options.is_null() {
        return Some("");
    }
    std::ffi::CStr::from_ptr(options).to_str().ok()
}

unsafe extern "system" fn trampoline_vm_init(_env: *mut jvmti::jvmtiEnv, jni: *mut jni::JNIEnv, thread: jni::jthread) {
    if let Some(agent) = GLOBAL_AGENT.get() { agent.vm_init(jni, thread); }
}

unsafe extern "system" fn trampoline_vm_death(_env: *mut jvmti::jvmtiEnv, jni: *mut jni::JNIEnv) {
    if let Some(agent) = GLOBAL_AGENT.get() { agent.vm_death(jni); }
}

/// Event callbacks routing `VMInit` and `VMDeath` to the global [`Agent`].
///
/// Pass the result to [`env::Jvmti::set_event_callbacks`], then enable the
/// events with `set_event_notification_mode`.
pub fn get_default_callbacks() -> jvmti::jvmtiEventCallbacks {
    let mut callbacks = jvmti::jvmtiEventCallbacks::default();

    callbacks.VMInit = Some(trampoline_vm_init);
    callbacks.VMDeath = Some(trampoline_vm_death);

    callbacks
}

/// Exports your agent type as a loadable JVMTI agent library.
///
/// Generates `Agent_OnLoad`, which creates the agent with `Default`, registers
/// it globally and calls [`Agent::on_load`] with the option string, and
/// `Agent_OnUnload`, which calls [`Agent::on_unload`]. An option string that is
/// not UTF-8 fails the load before any agent is created.
///
/// The crate invokes this itself for [`agent::StackSamplerAgent`] when the
/// `agent` feature is on; disable the feature to export your own agent.
#[macro_export]
macro_rules! export_agent {
    ($agent_type:ty) => {
        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnLoad(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::ffi::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            let Some(options_str) = $crate::agent_options(options) else {
                return $crate::sys::jni::JNI_ERR;
            };

            let agent = Box::new(<$agent_type>::default());
            if $crate::set_global_agent(agent).is_err() {
                return $crate::sys::jni::JNI_ERR;
            }

            if let Some(global_agent) = $crate::GLOBAL_AGENT.get() {
                return global_agent.on_load(vm, options_str);
            }

            $crate::sys::jni::JNI_ERR
        }

        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnUnload(_vm: *mut $crate::sys::jni::JavaVM) {
            if let Some(agent) = $crate::GLOBAL_AGENT.get() {
                agent.on_unload();
            }
        }
    };
}

#[cfg(feature = "agent")]
export_agent!(agent::StackSamplerAgent);
