//! Common imports for driving a sampling session.
//!
//! This prelude is intentionally small. It covers the types most embedders use
//! while avoiding over-broad re-exports.

pub use crate::diagnostics::{CountingSink, DiagnosticSink, LogSink, SkipReason};
pub use crate::env::{JniEnv, Jvmti, LocalRef};
pub use crate::export_agent;
pub use crate::get_default_callbacks;
pub use crate::handle::{CallFrame, MethodHandle, ThreadHandle};
pub use crate::metadata::{MethodMetadataRecord, PackedMetadataBlob};
pub use crate::method_table::MethodIdTable;
pub use crate::session::SamplingSession;
pub use crate::snapshot::ThreadSnapshotSet;
pub use crate::sys::{jni, jvmti};
pub use crate::thread_state::{ThreadStateMapper, ThreadStatus};
pub use crate::Agent;
