// jvmti-stacks/src/sys/jni.rs
//
// JNI (Java Native Interface) declarations used by the native bridge.
//
// Only the functions the bridge calls are typed. The table itself keeps the
// exact slot layout of jni.h (236 pointers, JDK 8 through 27): untyped slots
// are padding so every typed entry sits at its header index.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::os::raw::c_char;

// =============================================================================
// Primitive Types
// =============================================================================

pub type jint = i32;
pub type jlong = i64;
pub type jbyte = i8;
pub type jboolean = u8;
pub type jsize = jint;

// =============================================================================
// Reference Types (opaque pointers)
// =============================================================================

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jarray = jobject;
pub type jthread = jobject;

pub type jobjectArray = jarray;
pub type jbyteArray = jarray;
pub type jintArray = jarray;
pub type jlongArray = jarray;

pub type jmethodID = *mut c_void;

// =============================================================================
// Constants
// =============================================================================

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;

// =============================================================================
// RegisterNatives entry
// =============================================================================

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct JNINativeMethod {
    pub name: *mut c_char,
    pub signature: *mut c_char,
    pub fnPtr: *mut c_void,
}

// =============================================================================
// JNINativeInterface_ - The JNIEnv function table
// =============================================================================

#[repr(C)]
pub struct JNINativeInterface_ {
    // 0-3: reserved, 4: GetVersion, 5: DefineClass
    _slots0_5: [*mut c_void; 6],

    // 6
    pub FindClass: unsafe extern "system" fn(env: *mut JNIEnv, name: *const c_char) -> jclass,

    // 7-16: reflection, Throw/ThrowNew/ExceptionOccurred/ExceptionDescribe
    _slots7_16: [*mut c_void; 10],

    // 17
    pub ExceptionClear: unsafe extern "system" fn(env: *mut JNIEnv),

    // 18-20: FatalError, PushLocalFrame, PopLocalFrame
    _slots18_20: [*mut c_void; 3],

    // 21
    pub NewGlobalRef: unsafe extern "system" fn(env: *mut JNIEnv, lobj: jobject) -> jobject,
    // 22: DeleteGlobalRef
    _slot22: *mut c_void,
    // 23
    pub DeleteLocalRef: unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject),

    // 24-170: object, method, field and string operations
    _slots24_170: [*mut c_void; 147],

    // 171-172
    pub GetArrayLength: unsafe extern "system" fn(env: *mut JNIEnv, array: jarray) -> jsize,
    pub NewObjectArray: unsafe extern "system" fn(
        env: *mut JNIEnv,
        len: jsize,
        clazz: jclass,
        init: jobject,
    ) -> jobjectArray,
    // 173: GetObjectArrayElement
    _slot173: *mut c_void,
    // 174
    pub SetObjectArrayElement: unsafe extern "system" fn(
        env: *mut JNIEnv,
        array: jobjectArray,
        index: jsize,
        val: jobject,
    ),
    // 175: NewBooleanArray
    _slot175: *mut c_void,
    // 176
    pub NewByteArray: unsafe extern "system" fn(env: *mut JNIEnv, len: jsize) -> jbyteArray,
    // 177-178: NewCharArray, NewShortArray
    _slots177_178: [*mut c_void; 2],
    // 179-180
    pub NewIntArray: unsafe extern "system" fn(env: *mut JNIEnv, len: jsize) -> jintArray,
    pub NewLongArray: unsafe extern "system" fn(env: *mut JNIEnv, len: jsize) -> jlongArray,

    // 181-203: New{Float,Double}Array, Get/Release<Type>ArrayElements, Get{Boolean..Int}ArrayRegion
    _slots181_203: [*mut c_void; 23],

    // 204
    pub GetLongArrayRegion: unsafe extern "system" fn(
        env: *mut JNIEnv,
        array: jlongArray,
        start: jsize,
        len: jsize,
        buf: *mut jlong,
    ),
    // 205-207: Get{Float,Double}ArrayRegion, SetBooleanArrayRegion
    _slots205_207: [*mut c_void; 3],
    // 208
    pub SetByteArrayRegion: unsafe extern "system" fn(
        env: *mut JNIEnv,
        array: jbyteArray,
        start: jsize,
        len: jsize,
        buf: *const jbyte,
    ),
    // 209-210: Set{Char,Short}ArrayRegion
    _slots209_210: [*mut c_void; 2],
    // 211-212
    pub SetIntArrayRegion: unsafe extern "system" fn(
        env: *mut JNIEnv,
        array: jintArray,
        start: jsize,
        len: jsize,
        buf: *const jint,
    ),
    pub SetLongArrayRegion: unsafe extern "system" fn(
        env: *mut JNIEnv,
        array: jlongArray,
        start: jsize,
        len: jsize,
        buf: *const jlong,
    ),
    // 213-214: Set{Float,Double}ArrayRegion
    _slots213_214: [*mut c_void; 2],
    // 215
    pub RegisterNatives: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        methods: *const JNINativeMethod,
        nMethods: jint,
    ) -> jint,

    // 216-227: UnregisterNatives, monitors, GetJavaVM, string regions, critical, weak refs
    _slots216_227: [*mut c_void; 12],

    // 228
    pub ExceptionCheck: unsafe extern "system" fn(env: *mut JNIEnv) -> jboolean,

    // 229-235: direct buffers, GetObjectRefType, GetModule, IsVirtualThread, GetStringUTFLengthAsLong
    _slots229_235: [*mut c_void; 7],
}

/// JNIEnv is directly the vtable pointer (C ABI definition)
pub type JNIEnv = *const JNINativeInterface_;

// =============================================================================
// JNIInvokeInterface_ - The JavaVM function table
// =============================================================================

#[repr(C)]
pub struct JNIInvokeInterface_ {
    pub reserved0: *mut c_void,
    pub reserved1: *mut c_void,
    pub reserved2: *mut c_void,

    pub DestroyJavaVM: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub AttachCurrentThread:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint,
    pub DetachCurrentThread: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub GetEnv:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint,
    pub AttachCurrentThreadAsDaemon:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint,
}

/// JavaVM is directly the vtable pointer (C ABI definition)
pub type JavaVM = *const JNIInvokeInterface_;

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn function_tables_match_header_slot_counts() {
        let ptr = size_of::<*mut c_void>();
        assert_eq!(size_of::<JNINativeInterface_>(), 236 * ptr);
        assert_eq!(size_of::<JNIInvokeInterface_>(), 8 * ptr);
    }
}
