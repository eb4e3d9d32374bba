#![forbid(unsafe_code)]

//! The event record and its fixed wire layout.
//!
//! ```text
//!  offset  size  field
//!       0     4  kind tag
//!       4     4  process id
//!       8  1024  process path (512 UTF-16 units)
//!    1032  2048  file path (1024 UTF-16 units)
//!    3080     8  bytes read
//!    3088     8  bytes written
//!    3096     8  timestamp (ns since the Unix epoch)
//!    3104     4  result code
//!    3108    16  entropy preview
//! ```
//!
//! Every integer is little-endian. There is no framing: a consumer reads
//! exactly [`RECORD_SIZE`] bytes per record.

use crate::{
    Error,
    entropy::{EntropyPreview, PREVIEW_LEN},
    text::{FILE_PATH_CAPACITY, FilePath, PROCESS_PATH_CAPACITY, ProcessPath},
};
use std::fmt;

pub const RECORD_SIZE: usize = 4 + 4 + PROCESS_PATH_CAPACITY * 2 + FILE_PATH_CAPACITY * 2 + 8 * 3 + 4 + PREVIEW_LEN;

const PROCESS_PATH_OFFSET: usize = 8;
const FILE_PATH_OFFSET: usize = PROCESS_PATH_OFFSET + PROCESS_PATH_CAPACITY * 2;
const BYTES_READ_OFFSET: usize = FILE_PATH_OFFSET + FILE_PATH_CAPACITY * 2;
const BYTES_WRITTEN_OFFSET: usize = BYTES_READ_OFFSET + 8;
const TIMESTAMP_OFFSET: usize = BYTES_WRITTEN_OFFSET + 8;
const RESULT_OFFSET: usize = TIMESTAMP_OFFSET + 8;
const PREVIEW_OFFSET: usize = RESULT_OFFSET + 4;

/// Security-relevant kinds of activity. New kinds are appended; tags never move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum EventKind {
    Create = 0,
    Read = 1,
    Write = 2,
    Rename = 3,
    Delete = 4,
    DirectoryEnum = 5,
    ShadowCopyDelete = 6,
    ProcessCreate = 7,
    RegistryChange = 8,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        Self::Create,
        Self::Read,
        Self::Write,
        Self::Rename,
        Self::Delete,
        Self::DirectoryEnum,
        Self::ShadowCopyDelete,
        Self::ProcessCreate,
        Self::RegistryChange,
    ];

    pub const fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Result<Self, Error> {
        Self::ALL
            .get(tag as usize)
            .copied()
            .ok_or(Error::UnknownEventKind(tag))
    }

    /// Kinds whose records carry byte counts.
    pub const fn carries_byte_counts(self) -> bool {
        matches!(self, Self::Read | Self::Write)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Write => "write",
            Self::Rename => "rename",
            Self::Delete => "delete",
            Self::DirectoryEnum => "directory-enum",
            Self::ShadowCopyDelete => "shadow-copy-delete",
            Self::ProcessCreate => "process-create",
            Self::RegistryChange => "registry-change",
        };
        f.write_str(name)
    }
}

/// Nanoseconds since the Unix epoch, captured at interception time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }
}

/// Outcome of the underlying operation when known at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(u32);

impl ResultCode {
    pub const UNKNOWN: Self = Self(u32::MAX);

    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    pub fn is_known(self) -> bool {
        self != Self::UNKNOWN
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Default for ResultCode {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// One classified operation, self-contained and immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub(crate) kind: EventKind,
    pub(crate) process_id: u32,
    pub(crate) process_path: ProcessPath,
    pub(crate) file_path: FilePath,
    pub(crate) bytes_read: u64,
    pub(crate) bytes_written: u64,
    pub(crate) timestamp: Timestamp,
    pub(crate) result: ResultCode,
    pub(crate) entropy_preview: EntropyPreview,
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    pub fn process_path(&self) -> &ProcessPath {
        &self.process_path
    }

    pub fn file_path(&self) -> &FilePath {
        &self.file_path
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn result(&self) -> ResultCode {
        self.result
    }

    pub fn entropy_preview(&self) -> &EntropyPreview {
        &self.entropy_preview
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.kind.tag().to_le_bytes());
        buf[4..8].copy_from_slice(&self.process_id.to_le_bytes());
        write_units(&mut buf[PROCESS_PATH_OFFSET..FILE_PATH_OFFSET], self.process_path.raw());
        write_units(&mut buf[FILE_PATH_OFFSET..BYTES_READ_OFFSET], self.file_path.raw());
        buf[BYTES_READ_OFFSET..BYTES_WRITTEN_OFFSET].copy_from_slice(&self.bytes_read.to_le_bytes());
        buf[BYTES_WRITTEN_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&self.bytes_written.to_le_bytes());
        buf[TIMESTAMP_OFFSET..RESULT_OFFSET].copy_from_slice(&self.timestamp.as_nanos().to_le_bytes());
        buf[RESULT_OFFSET..PREVIEW_OFFSET].copy_from_slice(&self.result.raw().to_le_bytes());
        buf[PREVIEW_OFFSET..].copy_from_slice(self.entropy_preview.as_bytes());
        buf
    }

    pub fn decode(raw: &[u8]) -> Result<Self, Error> {
        let raw: &[u8; RECORD_SIZE] = raw.try_into().map_err(|_| Error::MalformedRecord {
            expected: RECORD_SIZE,
            actual: raw.len(),
        })?;

        let kind = EventKind::from_tag(read_u32(raw, 0))?;
        let mut preview = [0u8; PREVIEW_LEN];
        preview.copy_from_slice(&raw[PREVIEW_OFFSET..]);

        Ok(Self {
            kind,
            process_id: read_u32(raw, 4),
            process_path: ProcessPath::from_terminated(&read_units(&raw[PROCESS_PATH_OFFSET..FILE_PATH_OFFSET])),
            file_path: FilePath::from_terminated(&read_units(&raw[FILE_PATH_OFFSET..BYTES_READ_OFFSET])),
            bytes_read: read_u64(raw, BYTES_READ_OFFSET),
            bytes_written: read_u64(raw, BYTES_WRITTEN_OFFSET),
            timestamp: Timestamp::from_nanos(read_u64(raw, TIMESTAMP_OFFSET)),
            result: ResultCode::new(read_u32(raw, RESULT_OFFSET)),
            entropy_preview: EntropyPreview::from_bytes(preview),
        })
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} pid={} image={:?} file={:?} read={} written={} entropy={}",
            self.timestamp.as_nanos(),
            self.kind,
            self.process_id,
            self.process_path.to_string_lossy(),
            self.file_path.to_string_lossy(),
            self.bytes_read,
            self.bytes_written,
            self.entropy_preview.score(),
        )
    }
}

fn write_units(dst: &mut [u8], units: &[u16]) {
    for (chunk, unit) in dst.chunks_exact_mut(2).zip(units) {
        chunk.copy_from_slice(&unit.to_le_bytes());
    }
}

fn read_units(src: &[u8]) -> Vec<u16> {
    src.chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn read_u32(raw: &[u8; RECORD_SIZE], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&raw[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(raw: &[u8; RECORD_SIZE], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&raw[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}
