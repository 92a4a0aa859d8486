//! Environment wrappers for JVMTI and JNI.
//!
//! [`Jvmti`] wraps the JVMTI environment. It covers the calls the sampler
//! makes (frame counts, stack walks, the all-threads capture, method and class
//! introspection, event setup) and implements [`Runtime`](crate::runtime::Runtime).
//! [`StackTraces`] owns the block returned by `GetAllStackTraces`.
//!
//! [`JniEnv`] wraps the per-thread JNI environment for the native bridge, and
//! [`LocalRef`] deletes a local reference when dropped:
//!
//! ```rust,ignore
//! use jvmti_stacks::prelude::*;
//!
//! fn bind(jni: &JniEnv) {
//!     let class = LocalRef::new(jni, jni.find_class("java/lang/Thread").unwrap());
//!     // class is deleted here
//! }
//! ```

// Re-export the JVMTI wrapper
mod jvmti_impl {
    pub use crate::jvmti_wrapper::{Jvmti, StackTraces};
}

// Re-export the JNI wrapper
mod jni_impl {
    pub use crate::jni_wrapper::{JniEnv, LocalRef};
}

pub use jvmti_impl::{Jvmti, StackTraces};
pub use jni_impl::{JniEnv, LocalRef};
