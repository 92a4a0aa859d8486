//! Safe wrapper around the JNI environment.
//!
//! Covers what the native bridge needs: class lookup, primitive and object
//! arrays, exception checks and `RegisterNatives`.
//!
//! # Example
//!
//! ```rust,ignore
//! use jvmti_stacks::env::JniEnv;
//!
//! fn fill(jni: *mut jni::JNIEnv, ids: &[i64]) {
//!     let env = unsafe { JniEnv::from_raw(jni) };
//!     if let Some(array) = env.new_long_array(ids.len() as i32) {
//!         env.set_long_array_region(array, 0, ids);
//!     }
//! }
//! ```

use crate::sys::jni;
use std::ffi::CString;

/// Safe wrapper around a JNI environment pointer.
///
/// # Thread Safety
///
/// A `JniEnv` is tied to a specific thread and cannot be sent across threads.
/// Each JVM thread has its own JNI environment.
pub struct JniEnv {
    env: *mut jni::JNIEnv,
}

impl JniEnv {
    /// Creates a JniEnv wrapper from a raw pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure the pointer is valid and comes from the current thread.
    pub unsafe fn from_raw(env: *mut jni::JNIEnv) -> Self {
        JniEnv { env }
    }

    // =========================================================================
    // Class Operations
    // =========================================================================

    /// Finds a class by its fully qualified name.
    ///
    /// The name should use '/' as package separator (e.g., "java/lang/Thread").
    /// A failed lookup leaves `NoClassDefFoundError` pending; callers clear it.
    pub fn find_class(&self, name: &str) -> Option<jni::jclass> {
        let c_name = CString::new(name).ok()?;
        unsafe {
            let vtable = *self.env;
            let cls = ((*vtable).FindClass)(self.env, c_name.as_ptr());
            if cls.is_null() { None } else { Some(cls) }
        }
    }

    // =========================================================================
    // Exception Handling
    // =========================================================================

    /// Checks if an exception is pending.
    pub fn exception_check(&self) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionCheck)(self.env) != 0
        }
    }

    /// Clears any pending exception.
    pub fn exception_clear(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionClear)(self.env);
        }
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Creates a new global reference to an object.
    ///
    /// The bridge keeps its global references for the lifetime of the VM.
    pub fn new_global_ref(&self, obj: jni::jobject) -> Option<jni::jobject> {
        unsafe {
            let vtable = *self.env;
            let global = ((*vtable).NewGlobalRef)(self.env, obj);
            if global.is_null() { None } else { Some(global) }
        }
    }

    /// Deletes a local reference.
    pub fn delete_local_ref(&self, obj: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteLocalRef)(self.env, obj);
        }
    }

    // =========================================================================
    // Array Operations
    // =========================================================================

    /// Gets the length of an array. A null array has length 0.
    pub fn get_array_length(&self, array: jni::jarray) -> jni::jsize {
        if array.is_null() {
            return 0;
        }
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetArrayLength)(self.env, array)
        }
    }

    /// Creates a new object array with every element null.
    pub fn new_object_array(&self, length: jni::jsize, cls: jni::jclass) -> Option<jni::jobjectArray> {
        unsafe {
            let vtable = *self.env;
            let arr = ((*vtable).NewObjectArray)(self.env, length, cls, std::ptr::null_mut());
            if arr.is_null() { None } else { Some(arr) }
        }
    }

    /// Sets an element in an object array.
    pub fn set_object_array_element(&self, array: jni::jobjectArray, index: jni::jsize, value: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).SetObjectArrayElement)(self.env, array, index, value);
        }
    }

    /// Creates a new byte array.
    pub fn new_byte_array(&self, length: jni::jsize) -> Option<jni::jbyteArray> {
        unsafe {
            let vtable = *self.env;
            let arr = ((*vtable).NewByteArray)(self.env, length);
            if arr.is_null() { None } else { Some(arr) }
        }
    }

    /// Copies `buf` into a byte array starting at `start`.
    pub fn set_byte_array_region(&self, array: jni::jbyteArray, start: jni::jsize, buf: &[u8]) {
        if buf.is_empty() {
            return;
        }
        unsafe {
            let vtable = *self.env;
            ((*vtable).SetByteArrayRegion)(self.env, array, start, buf.len() as jni::jsize, buf.as_ptr() as *const jni::jbyte);
        }
    }

    /// Creates a new int array.
    pub fn new_int_array(&self, length: jni::jsize) -> Option<jni::jintArray> {
        unsafe {
            let vtable = *self.env;
            let arr = ((*vtable).NewIntArray)(self.env, length);
            if arr.is_null() { None } else { Some(arr) }
        }
    }

    /// Copies `buf` into an int array starting at `start`.
    pub fn set_int_array_region(&self, array: jni::jintArray, start: jni::jsize, buf: &[jni::jint]) {
        if buf.is_empty() {
            return;
        }
        unsafe {
            let vtable = *self.env;
            ((*vtable).SetIntArrayRegion)(self.env, array, start, buf.len() as jni::jsize, buf.as_ptr());
        }
    }

    /// Creates a new long array.
    pub fn new_long_array(&self, length: jni::jsize) -> Option<jni::jlongArray> {
        unsafe {
            let vtable = *self.env;
            let arr = ((*vtable).NewLongArray)(self.env, length);
            if arr.is_null() { None } else { Some(arr) }
        }
    }

    /// Fills `buf` from a long array starting at `start`.
    pub fn get_long_array_region(&self, array: jni::jlongArray, start: jni::jsize, buf: &mut [jni::jlong]) {
        if buf.is_empty() {
            return;
        }
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetLongArrayRegion)(self.env, array, start, buf.len() as jni::jsize, buf.as_mut_ptr());
        }
    }

    /// Copies `buf` into a long array starting at `start`.
    pub fn set_long_array_region(&self, array: jni::jlongArray, start: jni::jsize, buf: &[jni::jlong]) {
        if buf.is_empty() {
            return;
        }
        unsafe {
            let vtable = *self.env;
            ((*vtable).SetLongArrayRegion)(self.env, array, start, buf.len() as jni::jsize, buf.as_ptr());
        }
    }

    // =========================================================================
    // Native Method Registration
    // =========================================================================

    /// Registers native methods for a class.
    pub fn register_natives(&self, cls: jni::jclass, methods: &[jni::JNINativeMethod]) -> Result<(), jni::jint> {
        unsafe {
            let vtable = *self.env;
            let result = ((*vtable).RegisterNatives)(self.env, cls, methods.as_ptr(), methods.len() as jni::jint);
            if result == jni::JNI_OK { Ok(()) } else { Err(result) }
        }
    }
}

// =========================================================================
// Reference Guards (RAII wrappers)
// =========================================================================

/// A guard that automatically deletes a local reference when dropped.
///
/// The bridge creates one local reference per thread when marshalling an
/// all-threads snapshot; the guard keeps the local reference table from
/// filling up on processes with many threads.
pub struct LocalRef<'a> {
    env: &'a JniEnv,
    obj: jni::jobject,
}

impl<'a> LocalRef<'a> {
    /// Creates a new LocalRef guard.
    pub fn new(env: &'a JniEnv, obj: jni::jobject) -> Self {
        LocalRef { env, obj }
    }

    /// Returns the underlying jobject.
    pub fn get(&self) -> jni::jobject {
        self.obj
    }
}

impl<'a> Drop for LocalRef<'a> {
    fn drop(&mut self) {
        if !self.obj.is_null() {
            self.env.delete_local_ref(self.obj);
        }
    }
}
