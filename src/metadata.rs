//! Resolution of method handles into packed, human-readable metadata.
//!
//! A batch of N handles becomes one [`PackedMetadataBlob`]: a byte buffer
//! holding `4 × N` fields back to back and a parallel array of `4 × N` start
//! offsets. Per method the fields are, in order: declaring type name, method
//! name, method signature, and the native flag (`"1"` or `"0"`). Strings are
//! the JVM's modified UTF-8 bytes, copied through unchanged; they are only
//! decoded when read back with [`PackedMetadataBlob::field`].
//!
//! ```text
//! bytes:   java/lang/Threadsleep(J)V1java/lang/Objectwait()V0
//! offsets: [0, 16, 21, 25, 26, 42, 46, 49]
//! ```

use std::fmt;

use crate::byte_store::GrowableByteStore;
use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::handle::MethodHandle;
use crate::mutf8;
use crate::runtime::{MethodName, Runtime};

/// Fields written per method.
pub const FIELDS_PER_METHOD: usize = 4;

/// Initial byte-store sizing guess per field.
pub const INITIAL_BYTES_PER_FIELD: usize = 10;

/// Record substituted for a method that cannot be resolved.
pub const PLACEHOLDER: [&str; FIELDS_PER_METHOD] = ["<unknown class>", "<unknown method>", "()V", "0"];

/// The lookups performed per method, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStage {
    DeclaringClass,
    ClassSignature,
    MethodName,
    NativeFlag,
}

impl ResolutionStage {
    pub const COUNT: usize = 4;

    pub const ALL: [ResolutionStage; Self::COUNT] = [
        ResolutionStage::DeclaringClass,
        ResolutionStage::ClassSignature,
        ResolutionStage::MethodName,
        ResolutionStage::NativeFlag,
    ];

    pub fn index(self) -> usize {
        match self {
            ResolutionStage::DeclaringClass => 0,
            ResolutionStage::ClassSignature => 1,
            ResolutionStage::MethodName => 2,
            ResolutionStage::NativeFlag => 3,
        }
    }
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolutionStage::DeclaringClass => "declaring class",
            ResolutionStage::ClassSignature => "class signature",
            ResolutionStage::MethodName => "method name",
            ResolutionStage::NativeFlag => "native flag",
        })
    }
}

/// Strips the object-type wrapper from a JVM type signature.
///
/// `Lcom/example/Foo;` becomes `com/example/Foo`. Primitive and array
/// signatures (`I`, `[I`, `[Ljava/lang/String;`) are returned unchanged.
pub fn demangle_type_name(signature: &[u8]) -> &[u8] {
    signature
        .strip_prefix(b"L")
        .and_then(|rest| rest.strip_suffix(b";"))
        .unwrap_or(signature)
}

/// One field position within a method's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    ClassName = 0,
    MethodName = 1,
    Signature = 2,
    NativeFlag = 3,
}

/// A decoded method record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodMetadataRecord {
    /// Slashed binary name, e.g. `java/lang/String`.
    pub class_name: String,
    pub method_name: String,
    /// Method descriptor, e.g. `(I)Ljava/lang/String;`.
    pub signature: String,
    pub is_native: bool,
}

impl MethodMetadataRecord {
    pub fn placeholder() -> Self {
        MethodMetadataRecord {
            class_name: PLACEHOLDER[0].to_owned(),
            method_name: PLACEHOLDER[1].to_owned(),
            signature: PLACEHOLDER[2].to_owned(),
            is_native: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }
}

/// Packed metadata for a batch of methods.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackedMetadataBlob {
    bytes: Vec<u8>,
    offsets: Vec<i32>,
}

impl PackedMetadataBlob {
    /// Validates a blob received from elsewhere.
    ///
    /// Offsets must come in groups of four, start within the buffer and never
    /// decrease.
    pub fn from_parts(bytes: Vec<u8>, offsets: Vec<i32>) -> Result<Self> {
        if offsets.len() % FIELDS_PER_METHOD != 0 {
            return Err(Error::MalformedBlob(format!(
                "{} offsets is not a multiple of {FIELDS_PER_METHOD}",
                offsets.len()
            )));
        }
        let mut previous = 0i32;
        for (i, &offset) in offsets.iter().enumerate() {
            if offset < previous {
                return Err(Error::MalformedBlob(format!("offset {i} decreases to {offset}")));
            }
            if offset as usize > bytes.len() {
                return Err(Error::MalformedBlob(format!(
                    "offset {i} ({offset}) is past the end of {} bytes",
                    bytes.len()
                )));
            }
            previous = offset;
        }
        Ok(PackedMetadataBlob { bytes, offsets })
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<i32>) {
        (self.bytes, self.offsets)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    pub fn method_count(&self) -> usize {
        self.offsets.len() / FIELDS_PER_METHOD
    }

    /// Raw bytes of one field. Its length is the distance to the next offset,
    /// or to the end of the buffer for the very last field.
    pub fn field_bytes(&self, method: usize, field: MetadataField) -> Option<&[u8]> {
        let index = method.checked_mul(FIELDS_PER_METHOD)? + field as usize;
        let start = *self.offsets.get(index)? as usize;
        let end = match self.offsets.get(index + 1) {
            Some(&next) => next as usize,
            None => self.bytes.len(),
        };
        self.bytes.get(start..end)
    }

    /// One field decoded to a `String`. Sequences that are not valid modified
    /// UTF-8 come back as U+FFFD; use [`field_bytes`](Self::field_bytes) for
    /// the exact bytes.
    pub fn field(&self, method: usize, field: MetadataField) -> Option<String> {
        self.field_bytes(method, field).map(mutf8::decode)
    }

    pub fn record(&self, method: usize) -> Option<MethodMetadataRecord> {
        Some(MethodMetadataRecord {
            class_name: self.field(method, MetadataField::ClassName)?,
            method_name: self.field(method, MetadataField::MethodName)?,
            signature: self.field(method, MetadataField::Signature)?,
            is_native: self.field_bytes(method, MetadataField::NativeFlag)? == b"1",
        })
    }

    pub fn records(&self) -> impl Iterator<Item = MethodMetadataRecord> + '_ {
        (0..self.method_count()).filter_map(move |i| self.record(i))
    }
}

/// One method's lookups, as the VM reported them.
struct ResolvedMethod {
    class_signature: Vec<u8>,
    name: MethodName,
    is_native: bool,
}

/// Resolves batches of method handles against a [`Runtime`].
pub struct MethodMetadataEncoder<'a, R> {
    runtime: &'a R,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, R: Runtime> MethodMetadataEncoder<'a, R> {
    pub fn new(runtime: &'a R, sink: &'a dyn DiagnosticSink) -> Self {
        MethodMetadataEncoder { runtime, sink }
    }

    /// Packs metadata for every handle in `methods`.
    ///
    /// Always yields exactly `4 × methods.len()` fields. A handle that fails
    /// any lookup is reported to the sink and gets the placeholder record; the
    /// rest of the batch is unaffected.
    pub fn resolve_batch(&self, methods: &[MethodHandle]) -> PackedMetadataBlob {
        let mut store =
            GrowableByteStore::with_capacity(methods.len() * FIELDS_PER_METHOD * INITIAL_BYTES_PER_FIELD);
        let mut offsets = Vec::with_capacity(methods.len() * FIELDS_PER_METHOD);

        for &method in methods {
            match self.resolve_one(method) {
                Ok(resolved) => {
                    let fields: [&[u8]; FIELDS_PER_METHOD] = [
                        demangle_type_name(&resolved.class_signature),
                        &resolved.name.name,
                        &resolved.name.signature,
                        if resolved.is_native { b"1" } else { b"0" },
                    ];
                    for field in fields {
                        offsets.push(to_offset(store.append(field)));
                    }
                }
                Err((stage, err)) => {
                    self.sink.resolution_failed(method, stage, &err);
                    for field in PLACEHOLDER {
                        offsets.push(to_offset(store.append(field.as_bytes())));
                    }
                }
            }
        }

        log::trace!("resolved {} methods into {} bytes", methods.len(), store.len());
        PackedMetadataBlob {
            bytes: store.into_bytes(),
            offsets,
        }
    }

    fn resolve_one(&self, method: MethodHandle) -> Result<ResolvedMethod, (ResolutionStage, Error)> {
        let class = self
            .runtime
            .declaring_class(method)
            .map_err(|e| (ResolutionStage::DeclaringClass, e))?;
        if class.is_null() {
            return Err((
                ResolutionStage::DeclaringClass,
                Error::NullHandle("declaring class lookup"),
            ));
        }
        let class_signature = self
            .runtime
            .class_signature(class)
            .map_err(|e| (ResolutionStage::ClassSignature, e))?;
        let name = self
            .runtime
            .method_name(method)
            .map_err(|e| (ResolutionStage::MethodName, e))?;
        let is_native = self
            .runtime
            .is_native(method)
            .map_err(|e| (ResolutionStage::NativeFlag, e))?;

        Ok(ResolvedMethod {
            class_signature,
            name,
            is_native,
        })
    }
}

// Java arrays cannot hold more than i32::MAX bytes.
fn to_offset(offset: usize) -> i32 {
    i32::try_from(offset).unwrap_or(i32::MAX)
}
