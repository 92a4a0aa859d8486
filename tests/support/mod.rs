#![allow(dead_code)]

//! An in-memory `Runtime` for exercising the sampling core without a JVM.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jvmti_stacks::diagnostics::{DiagnosticSink, SkipReason};
use jvmti_stacks::error::{Error, Result};
use jvmti_stacks::handle::{CallFrame, ClassHandle, MethodHandle, ThreadHandle};
use jvmti_stacks::metadata::ResolutionStage;
use jvmti_stacks::mutf8;
use jvmti_stacks::runtime::{MethodName, Runtime, ThreadStack, ThreadStacks};
use jvmti_stacks::sys::jvmti::jvmtiError;
use parking_lot::Mutex;

pub fn thread_handle(n: usize) -> ThreadHandle {
    ThreadHandle::from_raw(n as *mut c_void)
}

fn failure(call: &'static str, code: jvmtiError) -> Error {
    Error::Jvmti { call, code }
}

#[derive(Clone)]
struct FakeMethod {
    class_signature: Vec<u8>,
    name: Vec<u8>,
    signature: Vec<u8>,
    native: bool,
    fail_at: Option<ResolutionStage>,
    null_class: bool,
}

#[derive(Clone)]
struct FakeThread {
    // a plain number so the fake stays shareable across test threads
    id: usize,
    state: i32,
    frames: Vec<CallFrame>,
}

#[derive(Default)]
pub struct FakeRuntime {
    methods: HashMap<i64, FakeMethod>,
    threads: Vec<FakeThread>,
    failing_snapshots: bool,
    releases: Arc<AtomicUsize>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(self, id: i64, class_signature: &str, name: &str, signature: &str, native: bool) -> Self {
        self.add_bytes(
            id,
            &mutf8::encode(class_signature),
            &mutf8::encode(name),
            &mutf8::encode(signature),
            native,
        )
    }

    fn add_bytes(mut self, id: i64, class_signature: &[u8], name: &[u8], signature: &[u8], native: bool) -> Self {
        self.methods.insert(
            id,
            FakeMethod {
                class_signature: class_signature.to_vec(),
                name: name.to_vec(),
                signature: signature.to_vec(),
                native,
                fail_at: None,
                null_class: false,
            },
        );
        self
    }

    pub fn method(self, id: i64, class_signature: &str, name: &str, signature: &str) -> Self {
        self.add(id, class_signature, name, signature, false)
    }

    pub fn native_method(self, id: i64, class_signature: &str, name: &str, signature: &str) -> Self {
        self.add(id, class_signature, name, signature, true)
    }

    /// A method whose strings are given as the VM's raw modified UTF-8 bytes.
    pub fn raw_method(self, id: i64, class_signature: &[u8], name: &[u8], signature: &[u8]) -> Self {
        self.add_bytes(id, class_signature, name, signature, false)
    }

    /// A method whose lookup fails at `stage`.
    pub fn failing_method(self, id: i64, stage: ResolutionStage) -> Self {
        let mut runtime = self.method(id, "Lbroken/Type;", "broken", "()V");
        if let Some(m) = runtime.methods.get_mut(&id) {
            m.fail_at = Some(stage);
        }
        runtime
    }

    /// A method whose declaring-class lookup succeeds but yields null.
    pub fn classless_method(self, id: i64) -> Self {
        let mut runtime = self.method(id, "Lghost/Type;", "ghost", "()V");
        if let Some(m) = runtime.methods.get_mut(&id) {
            m.null_class = true;
        }
        runtime
    }

    /// A thread whose stack holds `method_ids`, innermost first.
    pub fn thread(mut self, n: usize, state: i32, method_ids: &[i64]) -> Self {
        let frames = method_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| CallFrame::new(MethodHandle::from_transport(id), i as i64))
            .collect();
        self.threads.push(FakeThread {
            id: n,
            state,
            frames,
        });
        self
    }

    pub fn failing_snapshots(mut self) -> Self {
        self.failing_snapshots = true;
        self
    }

    /// How many snapshot results have been released so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn find_thread(&self, thread: ThreadHandle, call: &'static str) -> Result<&FakeThread> {
        self.threads
            .iter()
            .find(|t| thread_handle(t.id) == thread)
            .ok_or_else(|| failure(call, jvmtiError::INVALID_THREAD))
    }

    fn find_method(&self, id: i64, call: &'static str, stage: ResolutionStage) -> Result<&FakeMethod> {
        let method = self
            .methods
            .get(&id)
            .ok_or_else(|| failure(call, jvmtiError::INVALID_METHODID))?;
        if method.fail_at == Some(stage) {
            return Err(failure(call, jvmtiError::ABSENT_INFORMATION));
        }
        Ok(method)
    }
}

pub struct FakeStacks {
    threads: Vec<FakeThread>,
    releases: Arc<AtomicUsize>,
}

impl ThreadStacks for FakeStacks {
    fn thread_count(&self) -> usize {
        self.threads.len()
    }

    fn thread(&self, index: usize) -> Option<ThreadStack<'_>> {
        self.threads.get(index).map(|t| ThreadStack {
            thread: thread_handle(t.id),
            state: t.state,
            frames: &t.frames,
        })
    }
}

impl Drop for FakeStacks {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl Runtime for FakeRuntime {
    type StackTraces = FakeStacks;

    fn frame_count(&self, thread: ThreadHandle) -> Result<usize> {
        Ok(self.find_thread(thread, "GetFrameCount")?.frames.len())
    }

    fn stack_trace(&self, thread: ThreadHandle, frames: &mut [CallFrame]) -> Result<usize> {
        let source = &self.find_thread(thread, "GetStackTrace")?.frames;
        let count = source.len().min(frames.len());
        frames[..count].copy_from_slice(&source[..count]);
        Ok(count)
    }

    fn declaring_class(&self, method: MethodHandle) -> Result<ClassHandle> {
        let id = method.to_transport();
        let found = self.find_method(id, "GetMethodDeclaringClass", ResolutionStage::DeclaringClass)?;
        if found.null_class {
            return Ok(ClassHandle::from_raw(std::ptr::null_mut()));
        }
        // each method gets its own class handle, numerically equal to its id
        Ok(ClassHandle::from_raw(id as usize as *mut c_void))
    }

    fn class_signature(&self, class: ClassHandle) -> Result<Vec<u8>> {
        let id = class.as_raw() as usize as i64;
        let found = self.find_method(id, "GetClassSignature", ResolutionStage::ClassSignature)?;
        Ok(found.class_signature.clone())
    }

    fn method_name(&self, method: MethodHandle) -> Result<MethodName> {
        let found = self.find_method(method.to_transport(), "GetMethodName", ResolutionStage::MethodName)?;
        Ok(MethodName {
            name: found.name.clone(),
            signature: found.signature.clone(),
        })
    }

    fn is_native(&self, method: MethodHandle) -> Result<bool> {
        let found = self.find_method(method.to_transport(), "IsMethodNative", ResolutionStage::NativeFlag)?;
        Ok(found.native)
    }

    fn all_stack_traces(&self, max_frames: usize) -> Result<FakeStacks> {
        if self.failing_snapshots {
            return Err(failure("GetAllStackTraces", jvmtiError::WRONG_PHASE));
        }
        let threads = self
            .threads
            .iter()
            .map(|t| FakeThread {
                frames: t.frames.iter().take(max_frames).copied().collect(),
                ..t.clone()
            })
            .collect();
        Ok(FakeStacks {
            threads,
            releases: Arc::clone(&self.releases),
        })
    }
}

/// Keeps every skipped sample together with the rendered cause.
#[derive(Default)]
pub struct RecordingSink {
    skips: Mutex<Vec<(SkipReason, Option<String>)>>,
}

impl RecordingSink {
    pub fn skips(&self) -> Vec<(SkipReason, Option<String>)> {
        self.skips.lock().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn resolution_failed(&self, _method: MethodHandle, _stage: ResolutionStage, _error: &Error) {}

    fn sample_skipped(&self, reason: SkipReason, error: Option<&Error>) {
        self.skips.lock().push((reason, error.map(ToString::to_string)));
    }
}
