//! JNI implementations of the bridge class's `native` methods.
//!
//! The methods are static on the bridge class and are bound with
//! `RegisterNatives` when the VM finishes initializing. The functions carry
//! the JNI symbol names for the default bridge class
//! ([`DEFAULT_BRIDGE_CLASS`](crate::config::DEFAULT_BRIDGE_CLASS)) and, with
//! the `agent` feature, are exported under them, so the VM can also link them
//! lazily when that class was not loadable at `VMInit`.
//!
//! | Java method | Descriptor |
//! |---|---|
//! | `getCurrentJavaStackDepth` | `(Ljava/lang/Thread;)I` |
//! | `createNativeStackFrameBuffer` | `(I)V` |
//! | `clearNativeStackFrameBuffer` | `()V` |
//! | `getCurrentStackFrameIds` | `(Ljava/lang/Thread;I[J)I` |
//! | `getMethodNamesForJMethodIds` | `(I[J[I)[B` |
//! | `getAllStackTraces` | `([[Ljava/lang/Thread;[[I[[[J)V` |
//!
//! None of them throws: failures come back as 0, `null` or empty arrays and
//! are logged.

#![allow(non_snake_case)]

use std::os::raw::c_char;
use std::ptr;
use std::sync::OnceLock;

use crate::agent;
use crate::env::{JniEnv, LocalRef};
use crate::error::{Error, Result};
use crate::handle::ThreadHandle;
use crate::snapshot::ThreadSnapshotSet;
use crate::sys::jni;

/// Global references to the element classes of the snapshot arrays.
struct BridgeClasses {
    thread: jni::jclass,
    long_array: jni::jclass,
}

// SAFETY: global references are valid on every thread until deleted, and these
// are never deleted.
unsafe impl Send for BridgeClasses {}
unsafe impl Sync for BridgeClasses {}

static CLASSES: OnceLock<BridgeClasses> = OnceLock::new();

fn global_class(env: &JniEnv, name: &str) -> Result<jni::jclass> {
    let local = env.find_class(name).ok_or_else(|| {
        env.exception_clear();
        Error::ClassNotFound(name.to_owned())
    })?;
    let local = LocalRef::new(env, local);
    env.new_global_ref(local.get()).ok_or(Error::Jni("NewGlobalRef"))
}

fn cache_classes(env: &JniEnv) -> Result<()> {
    if CLASSES.get().is_some() {
        return Ok(());
    }
    let classes = BridgeClasses {
        thread: global_class(env, "java/lang/Thread")?,
        long_array: global_class(env, "[J")?,
    };
    let _ = CLASSES.set(classes);
    Ok(())
}

macro_rules! native {
    ($name:literal, $sig:literal, $f:expr) => {
        jni::JNINativeMethod {
            name: concat!($name, "\0").as_ptr() as *mut c_char,
            signature: concat!($sig, "\0").as_ptr() as *mut c_char,
            fnPtr: $f as *mut std::ffi::c_void,
        }
    };
}

fn native_methods() -> [jni::JNINativeMethod; 6] {
    [
        native!(
            "getCurrentJavaStackDepth",
            "(Ljava/lang/Thread;)I",
            Java_org_netbeans_lib_profiler_server_system_Stacks_getCurrentJavaStackDepth
        ),
        native!(
            "createNativeStackFrameBuffer",
            "(I)V",
            Java_org_netbeans_lib_profiler_server_system_Stacks_createNativeStackFrameBuffer
        ),
        native!(
            "clearNativeStackFrameBuffer",
            "()V",
            Java_org_netbeans_lib_profiler_server_system_Stacks_clearNativeStackFrameBuffer
        ),
        native!(
            "getCurrentStackFrameIds",
            "(Ljava/lang/Thread;I[J)I",
            Java_org_netbeans_lib_profiler_server_system_Stacks_getCurrentStackFrameIds
        ),
        native!(
            "getMethodNamesForJMethodIds",
            "(I[J[I)[B",
            Java_org_netbeans_lib_profiler_server_system_Stacks_getMethodNamesForJMethodIds
        ),
        native!(
            "getAllStackTraces",
            "([[Ljava/lang/Thread;[[I[[[J)V",
            Java_org_netbeans_lib_profiler_server_system_Stacks_getAllStackTraces
        ),
    ]
}

/// Binds the six native methods on `class_name` (slashed form).
pub fn register(env: &JniEnv, class_name: &str) -> Result<()> {
    cache_classes(env)?;

    let class = env.find_class(class_name).ok_or_else(|| {
        env.exception_clear();
        Error::ClassNotFound(class_name.to_owned())
    })?;
    let class = LocalRef::new(env, class);

    env.register_natives(class.get(), &native_methods()).map_err(|_| {
        if env.exception_check() {
            env.exception_clear();
        }
        Error::Jni("RegisterNatives")
    })
}

#[cfg_attr(feature = "agent", no_mangle)]
pub unsafe extern "system" fn Java_org_netbeans_lib_profiler_server_system_Stacks_getCurrentJavaStackDepth(
    _env: *mut jni::JNIEnv,
    _class: jni::jclass,
    thread: jni::jthread,
) -> jni::jint {
    match agent::session() {
        Some(session) => session.get_stack_depth(ThreadHandle::from_raw(thread)),
        None => 0,
    }
}

#[cfg_attr(feature = "agent", no_mangle)]
pub unsafe extern "system" fn Java_org_netbeans_lib_profiler_server_system_Stacks_createNativeStackFrameBuffer(
    _env: *mut jni::JNIEnv,
    _class: jni::jclass,
    size: jni::jint,
) {
    if let Some(session) = agent::session() {
        session.create_frame_buffer(size.max(0) as usize);
    }
}

#[cfg_attr(feature = "agent", no_mangle)]
pub unsafe extern "system" fn Java_org_netbeans_lib_profiler_server_system_Stacks_clearNativeStackFrameBuffer(_env: *mut jni::JNIEnv, _class: jni::jclass) {
    if let Some(session) = agent::session() {
        session.clear_frame_buffer();
    }
}

#[cfg_attr(feature = "agent", no_mangle)]
pub unsafe extern "system" fn Java_org_netbeans_lib_profiler_server_system_Stacks_getCurrentStackFrameIds(
    env: *mut jni::JNIEnv,
    _class: jni::jclass,
    thread: jni::jthread,
    depth: jni::jint,
    ids: jni::jlongArray,
) -> jni::jint {
    let Some(session) = agent::session() else {
        return 0;
    };
    let env = JniEnv::from_raw(env);
    let max_depth = (depth.max(0) as usize).min(env.get_array_length(ids).max(0) as usize);

    session.with_stack_sample(ThreadHandle::from_raw(thread), max_depth, |frames| {
        env.set_long_array_region(ids, 0, frames);
        frames.len() as jni::jint
    })
}

#[cfg_attr(feature = "agent", no_mangle)]
pub unsafe extern "system" fn Java_org_netbeans_lib_profiler_server_system_Stacks_getMethodNamesForJMethodIds(
    env: *mut jni::JNIEnv,
    _class: jni::jclass,
    count: jni::jint,
    method_ids: jni::jlongArray,
    packed_offsets: jni::jintArray,
) -> jni::jbyteArray {
    let env = JniEnv::from_raw(env);
    match method_names(&env, count, method_ids, packed_offsets) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("getMethodNamesForJMethodIds: {err}");
            ptr::null_mut()
        }
    }
}

fn method_names(
    env: &JniEnv,
    count: jni::jint,
    method_ids: jni::jlongArray,
    packed_offsets: jni::jintArray,
) -> Result<jni::jbyteArray> {
    let session = agent::session().ok_or(Error::Jni("agent not loaded"))?;
    let count = (count.max(0) as usize).min(env.get_array_length(method_ids).max(0) as usize);

    let mut ids = vec![0i64; count];
    env.get_long_array_region(method_ids, 0, &mut ids);
    let blob = session.resolve_method_metadata(&ids);

    let offsets = blob.offsets();
    let room = env.get_array_length(packed_offsets).max(0) as usize;
    if room < offsets.len() {
        log::warn!("offset array holds {room} entries, {} needed; truncating", offsets.len());
    }
    env.set_int_array_region(packed_offsets, 0, &offsets[..offsets.len().min(room)]);

    let bytes = blob.bytes();
    let array = env.new_byte_array(bytes.len() as jni::jsize).ok_or(Error::Jni("NewByteArray"))?;
    env.set_byte_array_region(array, 0, bytes);
    Ok(array)
}

#[cfg_attr(feature = "agent", no_mangle)]
pub unsafe extern "system" fn Java_org_netbeans_lib_profiler_server_system_Stacks_getAllStackTraces(
    env: *mut jni::JNIEnv,
    _class: jni::jclass,
    threads_holder: jni::jobjectArray,
    states_holder: jni::jobjectArray,
    frames_holder: jni::jobjectArray,
) {
    let env = JniEnv::from_raw(env);
    let snapshot = match agent::session() {
        Some(session) => session.capture_all_stacks(),
        None => ThreadSnapshotSet::default(),
    };
    if let Err(err) = store_snapshot(&env, &snapshot, threads_holder, states_holder, frames_holder) {
        if env.exception_check() {
            env.exception_clear();
        }
        log::warn!("getAllStackTraces: {err}");
    }
}

/// Stores `Thread[]`, `int[]` and `long[][]` into element 0 of the holders.
fn store_snapshot(
    env: &JniEnv,
    snapshot: &ThreadSnapshotSet,
    threads_holder: jni::jobjectArray,
    states_holder: jni::jobjectArray,
    frames_holder: jni::jobjectArray,
) -> Result<()> {
    cache_classes(env)?;
    let classes = CLASSES.get().ok_or(Error::Jni("bridge classes not cached"))?;
    let count = snapshot.len() as jni::jsize;

    let threads = env
        .new_object_array(count, classes.thread)
        .ok_or(Error::Jni("NewObjectArray"))?;
    let threads = LocalRef::new(env, threads);
    let states = env.new_int_array(count).ok_or(Error::Jni("NewIntArray"))?;
    let states = LocalRef::new(env, states);
    let frames = env
        .new_object_array(count, classes.long_array)
        .ok_or(Error::Jni("NewObjectArray"))?;
    let frames = LocalRef::new(env, frames);

    env.set_int_array_region(states.get(), 0, &snapshot.states);
    for (i, (thread, _, ids)) in snapshot.iter().enumerate() {
        let index = i as jni::jsize;
        let thread = LocalRef::new(env, thread.as_raw());
        env.set_object_array_element(threads.get(), index, thread.get());

        let array = env.new_long_array(ids.len() as jni::jsize).ok_or(Error::Jni("NewLongArray"))?;
        let array = LocalRef::new(env, array);
        env.set_long_array_region(array.get(), 0, ids);
        env.set_object_array_element(frames.get(), index, array.get());
    }

    env.set_object_array_element(threads_holder, 0, threads.get());
    env.set_object_array_element(states_holder, 0, states.get());
    env.set_object_array_element(frames_holder, 0, frames.get());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::ffi::{c_void, CStr};

    use super::*;
    use crate::config::DEFAULT_BRIDGE_CLASS;

    // JNI short-name mangling, enough for ASCII class and method names
    fn jni_symbol(class: &str, method: &str) -> String {
        let mangle = |name: &str| name.replace('_', "_1").replace('/', "_");
        format!("Java_{}_{}", mangle(class), mangle(method))
    }

    macro_rules! symbol {
        ($f:ident) => {
            (stringify!($f), $f as *mut c_void)
        };
    }

    #[test]
    fn registered_functions_carry_their_jni_symbol_names() {
        let symbols = [
            symbol!(Java_org_netbeans_lib_profiler_server_system_Stacks_getCurrentJavaStackDepth),
            symbol!(Java_org_netbeans_lib_profiler_server_system_Stacks_createNativeStackFrameBuffer),
            symbol!(Java_org_netbeans_lib_profiler_server_system_Stacks_clearNativeStackFrameBuffer),
            symbol!(Java_org_netbeans_lib_profiler_server_system_Stacks_getCurrentStackFrameIds),
            symbol!(Java_org_netbeans_lib_profiler_server_system_Stacks_getMethodNamesForJMethodIds),
            symbol!(Java_org_netbeans_lib_profiler_server_system_Stacks_getAllStackTraces),
        ];

        let methods = native_methods();
        assert_eq!(methods.len(), symbols.len());
        for method in methods {
            let name = unsafe { CStr::from_ptr(method.name) }.to_str().unwrap();
            let expected = jni_symbol(DEFAULT_BRIDGE_CLASS, name);
            let (_, function) = symbols
                .iter()
                .find(|(symbol, _)| *symbol == expected)
                .unwrap_or_else(|| panic!("no function named {expected}"));
            assert_eq!(method.fnPtr, *function, "{name} is registered with another function");
        }
    }

    #[test]
    fn mangling_escapes_underscores() {
        assert_eq!(jni_symbol("a/b_c/D", "run_it"), "Java_a_b_1c_D_run_1it");
    }
}
