// jvmti-stacks/src/jvmti_wrapper.rs
use crate::error::{Error, Result};
use crate::handle::{CallFrame, ClassHandle, MethodHandle, ThreadHandle};
use crate::runtime::{MethodName, Runtime, ThreadStack, ThreadStacks};
use crate::sys::jni;
use crate::sys::jvmti;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

/// A safe wrapper around the raw JVMTI Environment pointer.
///
/// A JVMTI environment is valid on every thread for the lifetime of the VM, so
/// the wrapper is `Copy` and may be shared freely.
#[derive(Clone, Copy)]
pub struct Jvmti {
    env: *mut jvmti::jvmtiEnv,
}

// SAFETY: JVMTI functions may be called from any thread attached to the VM.
unsafe impl Send for Jvmti {}
unsafe impl Sync for Jvmti {}

impl Jvmti {
    /// Connects to the JVM and retrieves the JVMTI environment.
    pub fn new(vm: *mut jni::JavaVM) -> Result<Self, jni::jint> {
        let mut env_ptr: *mut std::ffi::c_void = ptr::null_mut();

        unsafe {
            // vm -> vtable pointer -> JNIInvokeInterface_
            let get_env_fn = (**vm).GetEnv;

            let res = get_env_fn(vm, &mut env_ptr, jvmti::JVMTI_VERSION_1_2);

            if res != jni::JNI_OK {
                return Err(res);
            }
        }

        Ok(Jvmti {
            env: env_ptr as *mut jvmti::jvmtiEnv,
        })
    }

    fn functions(&self) -> &jvmti::jvmtiInterface_1_ {
        unsafe { &*(*self.env).functions }
    }

    pub fn deallocate(&self, mem: *mut u8) -> Result<(), jvmti::jvmtiError> {
        if mem.is_null() {
            return Ok(());
        }
        unsafe {
            let deallocate_fn = self.functions().Deallocate.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = deallocate_fn(self.env, mem);

            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Copies a JVMTI-allocated string's modified UTF-8 bytes and releases it.
    unsafe fn take_string(&self, raw: *mut c_char) -> Result<Vec<u8>, jvmti::jvmtiError> {
        if raw.is_null() {
            return Ok(Vec::new());
        }
        let value = CStr::from_ptr(raw).to_bytes().to_vec();
        self.deallocate(raw as *mut u8)?;
        Ok(value)
    }

    pub fn set_event_callbacks(&self, callbacks: jvmti::jvmtiEventCallbacks) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let set_callbacks_fn = self.functions().SetEventCallbacks.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let size = std::mem::size_of::<jvmti::jvmtiEventCallbacks>() as jni::jint;

            let err = set_callbacks_fn(self.env, &callbacks, size);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn set_event_notification_mode(&self, enable: bool, event_type: u32, thread: jni::jthread) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let set_mode_fn = self.functions().SetEventNotificationMode.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let mode = if enable { jvmti::JVMTI_ENABLE } else { jvmti::JVMTI_DISABLE };

            // a null thread means all threads
            let err = set_mode_fn(self.env, mode, event_type, thread);

            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn get_frame_count(&self, thread: jni::jthread) -> Result<jni::jint, jvmti::jvmtiError> {
        let mut count: jni::jint = 0;
        unsafe {
            let get_count_fn = self.functions().GetFrameCount.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = get_count_fn(self.env, thread, &mut count);
            if err != jvmti::jvmtiError::NONE { return Err(err); }
            Ok(count)
        }
    }

    /// Walks `thread`'s stack into a caller-owned buffer, innermost frame
    /// first, and returns the number of frames written.
    pub fn get_stack_trace_into(&self, thread: jni::jthread, start_depth: jni::jint, frames: &mut [CallFrame]) -> Result<usize, jvmti::jvmtiError> {
        let max_frame_count = jni::jint::try_from(frames.len()).unwrap_or(jni::jint::MAX);
        let mut count: jni::jint = 0;
        unsafe {
            let get_stack_fn = self.functions().GetStackTrace.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            // CallFrame is layout-identical to jvmtiFrameInfo
            let buffer = frames.as_mut_ptr() as *mut jvmti::jvmtiFrameInfo;
            let err = get_stack_fn(self.env, thread, start_depth, max_frame_count, buffer, &mut count);
            if err != jvmti::jvmtiError::NONE { return Err(err); }
        }
        Ok((count.max(0) as usize).min(frames.len()))
    }

    /// Captures every live thread's stack in one call.
    ///
    /// The returned guard borrows nothing from `self` and releases the
    /// VM-owned block when dropped.
    pub fn get_all_stack_traces(&self, max_frame_count: jni::jint) -> Result<StackTraces, jvmti::jvmtiError> {
        let mut stack_info_ptr: *mut jvmti::jvmtiStackInfo = ptr::null_mut();
        let mut thread_count: jni::jint = 0;
        unsafe {
            let get_all_fn = self.functions().GetAllStackTraces.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = get_all_fn(self.env, max_frame_count, &mut stack_info_ptr, &mut thread_count);
            if err != jvmti::jvmtiError::NONE { return Err(err); }
        }
        Ok(StackTraces {
            jvmti: *self,
            info: stack_info_ptr,
            count: thread_count.max(0) as usize,
        })
    }

    pub fn get_method_declaring_class(&self, method: jni::jmethodID) -> Result<jni::jclass, jvmti::jvmtiError> {
        let mut declaring_class: jni::jclass = ptr::null_mut();
        unsafe {
            let get_fn = self.functions().GetMethodDeclaringClass.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = get_fn(self.env, method, &mut declaring_class);
            if err != jvmti::jvmtiError::NONE { return Err(err); }
            Ok(declaring_class)
        }
    }

    /// Type signature of `klass`. The generic signature is not requested.
    pub fn get_class_signature(&self, klass: jni::jclass) -> Result<Vec<u8>, jvmti::jvmtiError> {
        let mut sig_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            let get_class_sig_fn = self.functions().GetClassSignature.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = get_class_sig_fn(self.env, klass, &mut sig_ptr, ptr::null_mut());

            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }

            self.take_string(sig_ptr)
        }
    }

    /// Name and signature of `method`. The generic signature is not requested.
    pub fn get_method_name(&self, method: jni::jmethodID) -> Result<(Vec<u8>, Vec<u8>), jvmti::jvmtiError> {
        let mut name_ptr: *mut c_char = ptr::null_mut();
        let mut sig_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            let get_method_name_fn = self.functions().GetMethodName.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = get_method_name_fn(self.env, method, &mut name_ptr, &mut sig_ptr, ptr::null_mut());

            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }

            // release both strings even if the first release fails
            let name = self.take_string(name_ptr);
            let signature = self.take_string(sig_ptr);
            Ok((name?, signature?))
        }
    }

    pub fn is_method_native(&self, method: jni::jmethodID) -> Result<bool, jvmti::jvmtiError> {
        let mut res: jni::jboolean = 0;
        unsafe {
            let get_fn = self.functions().IsMethodNative.ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = get_fn(self.env, method, &mut res);
            if err != jvmti::jvmtiError::NONE { return Err(err); }
            Ok(res != 0)
        }
    }
}

/// The VM-owned block returned by `GetAllStackTraces`.
///
/// The `jvmtiStackInfo` array and every frame array it points to live in one
/// allocation, released by a single `Deallocate` when the guard drops.
pub struct StackTraces {
    jvmti: Jvmti,
    info: *mut jvmti::jvmtiStackInfo,
    count: usize,
}

impl StackTraces {
    fn infos(&self) -> &[jvmti::jvmtiStackInfo] {
        if self.info.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.info, self.count) }
    }
}

impl ThreadStacks for StackTraces {
    fn thread_count(&self) -> usize {
        self.infos().len()
    }

    fn thread(&self, index: usize) -> Option<ThreadStack<'_>> {
        let info = self.infos().get(index)?;
        let frame_count = info.frame_count.max(0) as usize;
        let frames = if info.frame_buffer.is_null() || frame_count == 0 {
            &[][..]
        } else {
            // CallFrame is layout-identical to jvmtiFrameInfo
            unsafe { std::slice::from_raw_parts(info.frame_buffer as *const CallFrame, frame_count) }
        };
        Some(ThreadStack {
            thread: ThreadHandle::from_raw(info.thread),
            state: info.state,
            frames,
        })
    }
}

impl Drop for StackTraces {
    fn drop(&mut self) {
        if let Err(err) = self.jvmti.deallocate(self.info as *mut u8) {
            log::error!("failed to release GetAllStackTraces block: {err}");
        }
    }
}

impl Runtime for Jvmti {
    type StackTraces = StackTraces;

    fn frame_count(&self, thread: ThreadHandle) -> Result<usize> {
        let count = self
            .get_frame_count(thread.as_raw())
            .map_err(Error::jvmti("GetFrameCount"))?;
        Ok(count.max(0) as usize)
    }

    fn stack_trace(&self, thread: ThreadHandle, frames: &mut [CallFrame]) -> Result<usize> {
        self.get_stack_trace_into(thread.as_raw(), 0, frames)
            .map_err(Error::jvmti("GetStackTrace"))
    }

    fn declaring_class(&self, method: MethodHandle) -> Result<ClassHandle> {
        let class = self
            .get_method_declaring_class(method.as_raw())
            .map_err(Error::jvmti("GetMethodDeclaringClass"))?;
        if class.is_null() {
            return Err(Error::NullHandle("GetMethodDeclaringClass"));
        }
        Ok(ClassHandle::from_raw(class))
    }

    fn class_signature(&self, class: ClassHandle) -> Result<Vec<u8>> {
        self.get_class_signature(class.as_raw())
            .map_err(Error::jvmti("GetClassSignature"))
    }

    fn method_name(&self, method: MethodHandle) -> Result<MethodName> {
        let (name, signature) = self
            .get_method_name(method.as_raw())
            .map_err(Error::jvmti("GetMethodName"))?;
        Ok(MethodName { name, signature })
    }

    fn is_native(&self, method: MethodHandle) -> Result<bool> {
        self.is_method_native(method.as_raw())
            .map_err(Error::jvmti("IsMethodNative"))
    }

    fn all_stack_traces(&self, max_frames: usize) -> Result<StackTraces> {
        let max_frame_count = jni::jint::try_from(max_frames).unwrap_or(jni::jint::MAX);
        self.get_all_stack_traces(max_frame_count)
            .map_err(Error::jvmti("GetAllStackTraces"))
    }
}
