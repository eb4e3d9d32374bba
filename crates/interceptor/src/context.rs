#![forbid(unsafe_code)]

//! The per-system interception state.
//!
//! One [`FilterContext`] exists for the lifetime of the interceptor. Every
//! callback, from any thread, goes through [`FilterContext::on_operation`],
//! which never fails and never alters the operation.

use crate::{
    Error,
    builder::{EventBuilder, Operation},
    channel::DeliveryChannel,
    classifier::{Classification, classify},
    clock::SystemClock,
    event::EventRecord,
    resolver::ProcfsProcessTable,
};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tracing::{info, trace};

/// What the interceptor tells the host to do with an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Let the operation proceed unchanged.
    Continue,
}

#[derive(Debug, Default)]
struct Counters {
    observed: AtomicU64,
    classified: AtomicU64,
    delivered: AtomicU64,
    dropped_disconnected: AtomicU64,
    dropped_transport: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub observed: u64,
    pub classified: u64,
    pub delivered: u64,
    pub dropped_disconnected: u64,
    pub dropped_transport: u64,
}

impl StatsSnapshot {
    pub fn dropped(&self) -> u64 {
        self.dropped_disconnected + self.dropped_transport
    }
}

#[derive(Debug)]
pub struct FilterContext {
    builder: EventBuilder,
    channel: Arc<DeliveryChannel>,
    counters: Counters,
}

impl FilterContext {
    pub fn new(builder: EventBuilder, channel: Arc<DeliveryChannel>) -> Self {
        Self {
            builder,
            channel,
            counters: Counters::default(),
        }
    }

    /// Live process table, wall clock and a fresh channel.
    pub fn from_config(config: &config::Config) -> Self {
        let builder = EventBuilder::new(
            Arc::new(ProcfsProcessTable),
            Arc::new(SystemClock),
            config.entropy.preview_budget,
        );
        Self::new(builder, Arc::new(DeliveryChannel::new()))
    }

    pub fn on_operation(&self, op: &Operation<'_>) -> Disposition {
        self.counters.observed.fetch_add(1, Ordering::Relaxed);

        let Classification::Classified(kind) = classify(op.category) else {
            return Disposition::Continue;
        };
        self.counters.classified.fetch_add(1, Ordering::Relaxed);

        let record = self.builder.build(kind, op);
        // delivery failures are counted in emit and never reach the host
        let _ = self.emit(record);
        Disposition::Continue
    }

    /// Send an already-built record, keeping the counters.
    pub fn emit(&self, record: EventRecord) -> Result<(), Error> {
        let kind = record.kind();
        match self.channel.send(record) {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                let counter = match err {
                    Error::ChannelDisconnected => &self.counters.dropped_disconnected,
                    _ => &self.counters.dropped_transport,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                trace!(%kind, %err, "record dropped");
                Err(err)
            }
        }
    }

    pub fn builder(&self) -> &EventBuilder {
        &self.builder
    }

    pub fn channel(&self) -> &Arc<DeliveryChannel> {
        &self.channel
    }

    pub fn stats(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            observed: load(&self.counters.observed),
            classified: load(&self.counters.classified),
            delivered: load(&self.counters.delivered),
            dropped_disconnected: load(&self.counters.dropped_disconnected),
            dropped_transport: load(&self.counters.dropped_transport),
        }
    }

    pub fn dump_info(&self) {
        let stats = self.stats();
        info!(
            observed = stats.observed,
            classified = stats.classified,
            delivered = stats.delivered,
            dropped = stats.dropped(),
            channel = ?self.channel.state(),
            "interceptor statistics"
        );
    }

    /// Drop the consumer. Operations arriving afterwards are still observed
    /// and let through.
    pub fn teardown(&self) {
        self.channel.disconnect();
        self.dump_info();
    }
}
