//! Raw FFI declarations for the parts of JNI and JVMTI this crate calls.
//!
//! Function tables keep every slot position of the JDK headers; slots the
//! crate never calls are declared as opaque padding.

pub mod jni;
pub mod jvmti;
