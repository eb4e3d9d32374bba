#![forbid(unsafe_code)]

use crate::{
    classifier::OperationCategory,
    clock::Clock,
    entropy::EntropyPreview,
    event::{EventKind, EventRecord, ResultCode},
    resolver::{NameContext, ProcessTable, resolve_file_path, resolve_process_path},
    telemetry::TelemetryEvent,
    text::{FilePath, ProcessPath},
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Everything the interception point knows about one file operation.
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    pub category: OperationCategory,
    /// Requesting process at the instant of interception.
    pub process_id: u32,
    pub name: NameContext<'a>,
    /// Transfer length for reads and writes.
    pub length: u64,
    /// Buffer about to be written. Borrowed, so it is sampled before the
    /// write is issued and can never be observed after it is freed.
    pub buffer: Option<&'a [u8]>,
    /// Completion status when the operation has already finished.
    pub result: Option<u32>,
}

impl<'a> Operation<'a> {
    pub fn new(category: OperationCategory, process_id: u32, name: NameContext<'a>) -> Self {
        Self {
            category,
            process_id,
            name,
            length: 0,
            buffer: None,
            result: None,
        }
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = length;
        self
    }

    pub fn with_buffer(mut self, buffer: &'a [u8]) -> Self {
        self.buffer = Some(buffer);
        self
    }

    pub fn with_result(mut self, result: u32) -> Self {
        self.result = Some(result);
        self
    }
}

/// Composes resolver and entropy output into event records.
#[derive(Clone)]
pub struct EventBuilder {
    processes: Arc<dyn ProcessTable>,
    clock: Arc<dyn Clock>,
    preview_budget: usize,
}

impl EventBuilder {
    pub fn new(processes: Arc<dyn ProcessTable>, clock: Arc<dyn Clock>, preview_budget: usize) -> Self {
        Self {
            processes,
            clock,
            preview_budget,
        }
    }

    /// Build the record for a classified operation. Never fails: a field
    /// that cannot be resolved is left empty.
    pub fn build(&self, kind: EventKind, op: &Operation<'_>) -> EventRecord {
        // captured before any resolution so slow lookups cannot reorder events
        let timestamp = self.clock.now();

        let process_path = resolve_process_path(self.processes.as_ref(), op.process_id)
            .unwrap_or_else(|err| {
                debug!(pid = op.process_id, %err, "process path unresolved");
                ProcessPath::empty()
            });
        let file_path = resolve_file_path(&op.name).unwrap_or_else(|err| {
            debug!(pid = op.process_id, %kind, %err, "file path unresolved");
            FilePath::empty()
        });

        let (bytes_read, bytes_written) = match kind {
            EventKind::Read => (op.length, 0),
            EventKind::Write => (0, op.length),
            _ => (0, 0),
        };

        let entropy_preview = match (kind, op.buffer) {
            (EventKind::Write, Some(buffer)) if op.length > 0 => {
                let visible = usize::try_from(op.length).unwrap_or(usize::MAX).min(buffer.len());
                EntropyPreview::compute(&buffer[..visible], self.preview_budget)
            }
            _ => EntropyPreview::zeroed(),
        };

        trace!(pid = op.process_id, %kind, bytes_read, bytes_written, "built event");
        EventRecord {
            kind,
            process_id: op.process_id,
            process_path,
            file_path,
            bytes_read,
            bytes_written,
            timestamp,
            result: op.result.map_or(ResultCode::UNKNOWN, ResultCode::new),
            entropy_preview,
        }
    }

    /// Record for a secondary telemetry signal, if it maps to an event kind.
    pub fn build_telemetry(&self, event: &TelemetryEvent) -> Option<EventRecord> {
        let timestamp = self.clock.now();
        let (kind, pid, image, target) = match event {
            TelemetryEvent::ProcessCreate { pid, image, .. } => {
                (EventKind::ProcessCreate, *pid, image.to_string_lossy(), image.to_string_lossy())
            }
            TelemetryEvent::ShadowCopyDelete { pid, image, cmdline } => (
                EventKind::ShadowCopyDelete,
                *pid,
                image.to_string_lossy(),
                cmdline.as_str().into(),
            ),
            TelemetryEvent::RegistryChange { pid, key } => {
                let image = self
                    .processes
                    .image_path(*pid)
                    .map(|path| path.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (EventKind::RegistryChange, *pid, image.into(), key.as_str().into())
            }
            TelemetryEvent::NetworkConnect { .. } => return None,
        };

        Some(EventRecord {
            kind,
            process_id: pid,
            process_path: ProcessPath::from_str_truncated(&image),
            file_path: FilePath::from_str_truncated(&target),
            bytes_read: 0,
            bytes_written: 0,
            timestamp,
            result: ResultCode::UNKNOWN,
            entropy_preview: EntropyPreview::zeroed(),
        })
    }
}

impl std::fmt::Debug for EventBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBuilder")
            .field("preview_budget", &self.preview_budget)
            .finish_non_exhaustive()
    }
}
