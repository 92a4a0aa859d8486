//! Profiler-side cache of method names keyed by transport identifier.
//!
//! Identifiers arrive in stack samples long before anyone needs their names.
//! The table records each new identifier as an incomplete entry, resolves all
//! incomplete entries in one batch when asked, and can persist itself in the
//! Java `DataOutputStream` layout:
//!
//! ```text
//! i32 count
//! count × { i64 id, utf class name, utf method name, utf signature }
//! ```
//!
//! where `utf` is a big-endian `u16` byte length followed by modified UTF-8.
//! Native methods carry the suffix `[native]` on their name on the wire.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::metadata::{MethodMetadataRecord, PackedMetadataBlob};
use crate::mutf8;

/// Appended to a native method's name in the persisted form.
pub const NATIVE_SUFFIX: &str = "[native]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodIdEntry {
    pub method_id: i64,
    /// `None` until the names have been resolved.
    pub metadata: Option<MethodMetadataRecord>,
}

impl MethodIdEntry {
    pub fn is_complete(&self) -> bool {
        self.metadata.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MethodIdTable {
    entries: BTreeMap<i64, MethodIdEntry>,
    frozen: bool,
}

impl MethodIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `method_id` as an incomplete entry unless it is already known.
    pub fn check_method_id(&mut self, method_id: i64) {
        self.entries.entry(method_id).or_insert(MethodIdEntry {
            method_id,
            metadata: None,
        });
    }

    pub fn get(&self, method_id: i64) -> Option<&MethodIdEntry> {
        self.entries.get(&method_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &MethodIdEntry> {
        self.entries.values()
    }

    pub fn incomplete_ids(&self) -> Vec<i64> {
        self.entries
            .values()
            .filter(|e| !e.is_complete())
            .map(|e| e.method_id)
            .collect()
    }

    pub fn has_incomplete_entries(&self) -> bool {
        self.entries.values().any(|e| !e.is_complete())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Resolves every incomplete entry with a single call to `resolver`.
    ///
    /// `resolver` receives the incomplete identifiers and must return one record
    /// per identifier, in order; a session's `resolve_method_metadata` does.
    /// Returns the number of entries filled in.
    pub fn resolve_incomplete<F>(&mut self, resolver: F) -> Result<usize>
    where
        F: FnOnce(&[i64]) -> PackedMetadataBlob,
    {
        if self.frozen {
            return Err(Error::FrozenTable);
        }
        let ids = self.incomplete_ids();
        if ids.is_empty() {
            return Ok(0);
        }

        let blob = resolver(&ids);
        if blob.method_count() != ids.len() {
            return Err(Error::MalformedBlob(format!(
                "asked for {} methods, got {}",
                ids.len(),
                blob.method_count()
            )));
        }

        for (id, record) in ids.iter().zip(blob.records()) {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.metadata = Some(record);
            }
        }
        log::debug!("resolved names for {} method ids", ids.len());
        Ok(ids.len())
    }

    /// An independent copy that refuses further resolution, for snapshots.
    pub fn frozen_copy(&self) -> MethodIdTable {
        MethodIdTable {
            entries: self.entries.clone(),
            frozen: true,
        }
    }

    /// Writes every complete entry. Incomplete entries have no names to write
    /// and are left out.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        let complete: Vec<(i64, &MethodMetadataRecord)> = self
            .entries
            .values()
            .filter_map(|e| e.metadata.as_ref().map(|m| (e.method_id, m)))
            .collect();

        out.write_i32::<BigEndian>(complete.len() as i32)?;
        for (method_id, record) in complete {
            out.write_i64::<BigEndian>(method_id)?;
            write_utf(&mut out, &record.class_name)?;
            if record.is_native {
                write_utf(&mut out, &format!("{}{NATIVE_SUFFIX}", record.method_name))?;
            } else {
                write_utf(&mut out, &record.method_name)?;
            }
            write_utf(&mut out, &record.signature)?;
        }
        Ok(())
    }

    /// Reads a table written by [`write_to`](Self::write_to) or by the Java
    /// profiler. The result is not frozen.
    pub fn read_from<R: Read>(mut input: R) -> Result<Self> {
        let count = input.read_i32::<BigEndian>()?;
        if count < 0 {
            return Err(Error::MalformedBlob(format!("negative entry count {count}")));
        }

        let mut table = MethodIdTable::new();
        for _ in 0..count {
            let method_id = input.read_i64::<BigEndian>()?;
            let class_name = read_utf(&mut input)?;
            let mut method_name = read_utf(&mut input)?;
            let signature = read_utf(&mut input)?;

            let is_native = method_name.ends_with(NATIVE_SUFFIX);
            if is_native {
                method_name.truncate(method_name.len() - NATIVE_SUFFIX.len());
            }
            table.entries.insert(
                method_id,
                MethodIdEntry {
                    method_id,
                    metadata: Some(MethodMetadataRecord {
                        class_name,
                        method_name,
                        signature,
                        is_native,
                    }),
                },
            );
        }
        Ok(table)
    }
}

impl fmt::Display for MethodIdTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} method ids, incomplete entries: {}",
            self.entries.len(),
            self.has_incomplete_entries()
        )
    }
}

fn write_utf<W: Write>(out: &mut W, s: &str) -> Result<()> {
    let bytes = mutf8::encode(s);
    let len = u16::try_from(bytes.len()).map_err(|_| Error::StringTooLong(bytes.len()))?;
    out.write_u16::<BigEndian>(len)?;
    out.write_all(&bytes)?;
    Ok(())
}

fn read_utf<R: Read>(input: &mut R) -> Result<String> {
    let len = input.read_u16::<BigEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    input.read_exact(&mut bytes)?;
    Ok(mutf8::decode(&bytes))
}
