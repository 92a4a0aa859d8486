// jvmti-stacks/src/sys/jvmti.rs
//
// JVMTI (JVM Tool Interface) declarations used by the sampling bridge.
//
// The function table keeps the full jvmti.h layout (156 slots, JDK 8 through
// 27). Slots for functions this crate never calls are opaque padding; the
// numbered comments use the 1-based slot numbers of the header.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::fmt;
use std::os::raw::{c_char, c_void};
use crate::sys::jni::{jboolean, jclass, jint, jlong, jmethodID, jthread, JNIEnv};

// --- Versions ---
pub const JVMTI_VERSION_1_2: jint = 0x30010200;

// --- Events ---
pub const JVMTI_EVENT_VM_INIT: u32 = 50;
pub const JVMTI_EVENT_VM_DEATH: u32 = 51;

pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;

// --- Thread state bits (GetThreadState / jvmtiStackInfo.state) ---
pub const JVMTI_THREAD_STATE_ALIVE: jint = 0x0001;
pub const JVMTI_THREAD_STATE_TERMINATED: jint = 0x0002;
pub const JVMTI_THREAD_STATE_RUNNABLE: jint = 0x0004;
pub const JVMTI_THREAD_STATE_SLEEPING: jint = 0x0040;
pub const JVMTI_THREAD_STATE_WAITING: jint = 0x0080;
pub const JVMTI_THREAD_STATE_IN_OBJECT_WAIT: jint = 0x0100;
pub const JVMTI_THREAD_STATE_PARKED: jint = 0x0200;
pub const JVMTI_THREAD_STATE_BLOCKED_ON_MONITOR_ENTER: jint = 0x0400;

// --- Error Codes ---
//
// A transparent newtype rather than a Rust enum: the JVM may hand back codes
// this crate does not name, and those must stay representable.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct jvmtiError(pub u32);

impl jvmtiError {
    pub const NONE: jvmtiError = jvmtiError(0);
    pub const INVALID_THREAD: jvmtiError = jvmtiError(10);
    pub const INVALID_METHODID: jvmtiError = jvmtiError(23);
    pub const NOT_AVAILABLE: jvmtiError = jvmtiError(98);
    pub const ABSENT_INFORMATION: jvmtiError = jvmtiError(101);
    pub const WRONG_PHASE: jvmtiError = jvmtiError(112);

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::NONE => "NONE",
            Self::INVALID_THREAD => "INVALID_THREAD",
            Self::INVALID_METHODID => "INVALID_METHODID",
            Self::NOT_AVAILABLE => "NOT_AVAILABLE",
            Self::ABSENT_INFORMATION => "ABSENT_INFORMATION",
            Self::WRONG_PHASE => "WRONG_PHASE",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "JVMTI_ERROR_{name}"),
            None => write!(f, "JVMTI_ERROR({})", self.0),
        }
    }
}

impl fmt::Display for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub type jlocation = jlong;

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiFrameInfo {
    pub method: jmethodID,
    pub location: jlocation,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiStackInfo {
    pub thread: jthread,
    pub state: jint,
    pub frame_buffer: *mut jvmtiFrameInfo,
    pub frame_count: jint,
}

// --- Event callbacks ---

pub type JvmtiVMInitFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread);
pub type JvmtiVMDeathFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv);

/// Leading part of `jvmtiEventCallbacks`.
///
/// `SetEventCallbacks` is passed the struct size, and the VM leaves every
/// callback past that size unset, so only the events the agent handles are
/// declared.
#[repr(C)]
#[derive(Copy, Clone, Default, Debug)]
pub struct jvmtiEventCallbacks {
    pub VMInit: Option<JvmtiVMInitFn>,
    pub VMDeath: Option<JvmtiVMDeathFn>,
}

// --- Function types ---

pub type JvmtiSetEventNotificationModeFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mode: jint, event_type: u32, event_thread: jthread) -> jvmtiError;
pub type JvmtiGetFrameCountFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, count_ptr: *mut jint) -> jvmtiError;
pub type JvmtiDeallocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut u8) -> jvmtiError;
pub type JvmtiGetClassSignatureFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetMethodNameFn = unsafe extern "system" fn(env: *mut jvmtiEnv, method: jmethodID, name_ptr: *mut *mut c_char, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetMethodDeclaringClassFn = unsafe extern "system" fn(env: *mut jvmtiEnv, method: jmethodID, declaring_class_ptr: *mut jclass) -> jvmtiError;
pub type JvmtiIsMethodNativeFn = unsafe extern "system" fn(env: *mut jvmtiEnv, method: jmethodID, is_native_ptr: *mut jboolean) -> jvmtiError;
pub type JvmtiGetAllStackTracesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, max_frame_count: jint, stack_info_ptr: *mut *mut jvmtiStackInfo, thread_count_ptr: *mut jint) -> jvmtiError;
pub type JvmtiGetStackTraceFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, start_depth: jint, max_frame_count: jint, frame_buffer: *mut jvmtiFrameInfo, count_ptr: *mut jint) -> jvmtiError;
pub type JvmtiSetEventCallbacksFn = unsafe extern "system" fn(env: *mut jvmtiEnv, callbacks: *const jvmtiEventCallbacks, size_of_callbacks: jint) -> jvmtiError;

#[repr(C)]
pub struct jvmtiInterface_1_ {
    /*   1:  RESERVED */
    _reserved1: *mut c_void,
    /*   2: Set Event Notification Mode */
    pub SetEventNotificationMode: Option<JvmtiSetEventNotificationModeFn>,
    /*   3-15: threads, thread groups, monitors info */
    _slots3_15: [*mut c_void; 13],
    /*  16: Get Frame Count */
    pub GetFrameCount: Option<JvmtiGetFrameCountFn>,
    /*  17-46: thread state, locals, raw monitors, breakpoints, watches, Allocate */
    _slots17_46: [*mut c_void; 30],
    /*  47: Deallocate */
    pub Deallocate: Option<JvmtiDeallocateFn>,
    /*  48: Get Class Signature */
    pub GetClassSignature: Option<JvmtiGetClassSignatureFn>,
    /*  49-63: class and field queries */
    _slots49_63: [*mut c_void; 15],
    /*  64: Get Method Name (and Signature) */
    pub GetMethodName: Option<JvmtiGetMethodNameFn>,
    /*  65: Get Method Declaring Class */
    pub GetMethodDeclaringClass: Option<JvmtiGetMethodDeclaringClassFn>,
    /*  66-75: method modifiers, locals, line numbers, bytecodes */
    _slots66_75: [*mut c_void; 10],
    /*  76: Is Method Native */
    pub IsMethodNative: Option<JvmtiIsMethodNativeFn>,
    /*  77-99: synthetic, loaded classes, early return, redefine, modules */
    _slots77_99: [*mut c_void; 23],
    /* 100: Get All Stack Traces */
    pub GetAllStackTraces: Option<JvmtiGetAllStackTracesFn>,
    /* 101-103: thread list stack traces, thread local storage */
    _slots101_103: [*mut c_void; 3],
    /* 104: Get Stack Trace */
    pub GetStackTrace: Option<JvmtiGetStackTraceFn>,
    /* 105-121: tags, heap iteration, virtual threads, JNI function table */
    _slots105_121: [*mut c_void; 17],
    /* 122: Set Event Callbacks */
    pub SetEventCallbacks: Option<JvmtiSetEventCallbacksFn>,
    /* 123-156: extensions, properties, timers, capabilities, class search */
    _slots123_156: [*mut c_void; 34],
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}
