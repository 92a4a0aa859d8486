//! The instrumentation capability the sampler is built on.
//!
//! [`Runtime`] is the seam between the sampling core and a live JVM. The
//! production implementation is [`Jvmti`](crate::env::Jvmti); tests plug in
//! an in-memory double.

use crate::error::Result;
use crate::handle::{CallFrame, ClassHandle, MethodHandle, ThreadHandle};

/// Name and JVM signature of one method, e.g. `("run", "()V")`, as the
/// modified UTF-8 bytes the VM reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodName {
    pub name: Vec<u8>,
    pub signature: Vec<u8>,
}

/// One thread's entry in an all-threads capture.
#[derive(Debug, Clone, Copy)]
pub struct ThreadStack<'a> {
    pub thread: ThreadHandle,
    /// Raw JVMTI thread state bits.
    pub state: i32,
    /// Innermost frame first.
    pub frames: &'a [CallFrame],
}

/// Result of an all-threads capture.
///
/// Implementors own whatever memory the runtime handed out and release it
/// when dropped, exactly once.
pub trait ThreadStacks {
    fn thread_count(&self) -> usize;

    fn thread(&self, index: usize) -> Option<ThreadStack<'_>>;

    fn iter(&self) -> ThreadStacksIter<'_, Self>
    where
        Self: Sized,
    {
        ThreadStacksIter { stacks: self, next: 0 }
    }
}

pub struct ThreadStacksIter<'a, S> {
    stacks: &'a S,
    next: usize,
}

impl<'a, S: ThreadStacks> Iterator for ThreadStacksIter<'a, S> {
    type Item = ThreadStack<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stacks.thread(self.next)?;
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.stacks.thread_count().saturating_sub(self.next);
        (left, Some(left))
    }
}

/// Stack-walking and method-introspection queries against a running VM.
pub trait Runtime {
    type StackTraces: ThreadStacks;

    /// Number of frames currently on `thread`'s stack.
    fn frame_count(&self, thread: ThreadHandle) -> Result<usize>;

    /// Walks `thread`'s stack from the innermost frame into `frames`, returning
    /// how many entries were written. Never writes past `frames.len()`.
    fn stack_trace(&self, thread: ThreadHandle, frames: &mut [CallFrame]) -> Result<usize>;

    fn declaring_class(&self, method: MethodHandle) -> Result<ClassHandle>;

    /// JVM type signature of `class`, e.g. `Ljava/lang/String;`, in modified
    /// UTF-8 exactly as the VM reported it.
    fn class_signature(&self, class: ClassHandle) -> Result<Vec<u8>>;

    fn method_name(&self, method: MethodHandle) -> Result<MethodName>;

    fn is_native(&self, method: MethodHandle) -> Result<bool>;

    /// Captures every live thread's stack in one atomic call, at most
    /// `max_frames` frames deep.
    fn all_stack_traces(&self, max_frames: usize) -> Result<Self::StackTraces>;
}
