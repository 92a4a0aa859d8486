//! Opaque handle types for JVM-owned identifiers.
//!
//! A [`MethodHandle`] travels to the profiler as a 64-bit integer (the Java
//! side keeps them in `long[]`). The conversion is explicit and lossless in
//! both directions; the handle type itself carries no arithmetic.

use std::fmt;
use std::ptr;

use crate::sys::jni;
use crate::sys::jvmti;

/// A `jmethodID`: identifies one method of one loaded class.
///
/// The JVM owns its validity. This crate never dereferences, allocates or frees
/// one; it only hands it back to JVMTI or reinterprets it for transport.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct MethodHandle(jni::jmethodID);

impl MethodHandle {
    /// Wraps a raw `jmethodID`.
    pub const fn from_raw(raw: jni::jmethodID) -> Self {
        MethodHandle(raw)
    }

    /// Rebuilds a handle from its transport integer.
    ///
    /// Only integers previously produced by [`MethodHandle::to_transport`] for a
    /// still-loaded method name a valid method.
    pub fn from_transport(id: jni::jlong) -> Self {
        MethodHandle(id as usize as jni::jmethodID)
    }

    /// The 64-bit transport form stored in the profiler's `long[]` arrays.
    pub fn to_transport(self) -> jni::jlong {
        self.0 as usize as jni::jlong
    }

    pub fn as_raw(self) -> jni::jmethodID {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl Default for MethodHandle {
    fn default() -> Self {
        MethodHandle(ptr::null_mut())
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodHandle({:#x})", self.to_transport())
    }
}

/// A `jthread` reference as handed out by JVMTI or passed in through JNI.
///
/// Usually a JNI local reference, valid only on the thread that received it,
/// so the handle is neither `Send` nor `Sync`:
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<jvmti_stacks::handle::ThreadHandle>();
/// ```
///
/// The same holds for anything carrying one, such as a snapshot:
///
/// ```compile_fail
/// fn assert_send<T: Send>() {}
/// assert_send::<jvmti_stacks::snapshot::ThreadSnapshotSet>();
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ThreadHandle(jni::jthread);

impl ThreadHandle {
    pub const fn from_raw(raw: jni::jthread) -> Self {
        ThreadHandle(raw)
    }

    pub fn as_raw(self) -> jni::jthread {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadHandle({:p})", self.0)
    }
}

/// A `jclass` reference, returned by declaring-class lookups.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClassHandle(jni::jclass);

impl ClassHandle {
    pub const fn from_raw(raw: jni::jclass) -> Self {
        ClassHandle(raw)
    }

    pub fn as_raw(self) -> jni::jclass {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassHandle({:p})", self.0)
    }
}

// SAFETY: a jmethodID is an opaque token that stays valid on every thread
// while its class is loaded, and this crate never dereferences it.
unsafe impl Send for MethodHandle {}
unsafe impl Sync for MethodHandle {}

/// One stack entry: the executing method and its bytecode location.
///
/// Layout-identical to `jvmtiFrameInfo`, so `GetStackTrace` writes straight
/// into a slice of these.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CallFrame {
    pub method: MethodHandle,
    pub location: jvmti::jlocation,
}

impl CallFrame {
    pub fn new(method: MethodHandle, location: jvmti::jlocation) -> Self {
        CallFrame { method, location }
    }
}

const _: () = assert!(std::mem::size_of::<CallFrame>() == std::mem::size_of::<jvmti::jvmtiFrameInfo>());
const _: () = assert!(std::mem::align_of::<CallFrame>() == std::mem::align_of::<jvmti::jvmtiFrameInfo>());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_round_trip_is_lossless() {
        for id in [0x7f00_dead_beef_i64, 0x1000, 1, 0] {
            let handle = MethodHandle::from_transport(id);
            assert_eq!(handle.to_transport(), id);
            assert_eq!(MethodHandle::from_raw(handle.as_raw()), handle);
        }
    }

    #[test]
    fn method_handles_cross_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MethodHandle>();
        assert_send_sync::<CallFrame>();
    }

    #[test]
    fn default_frame_is_null() {
        let frame = CallFrame::default();
        assert!(frame.method.is_null());
        assert_eq!(frame.location, 0);
    }
}
