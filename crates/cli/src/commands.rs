//! One function per subcommand.

use crate::{
    error::Error,
    signals::{SignalEvent, wait_for_signal},
};
use config::Config;
use interceptor::{
    EventRecord, FilterContext,
    channel::ChannelServer,
    event::RECORD_SIZE,
    quarantine::QuarantineActor,
    telemetry::{ProcfsTraceSession, TraceCallback, TraceFilter, TraceSession},
};
use std::{
    io::{self, ErrorKind, Write},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::{io::AsyncReadExt, net::UnixStream, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run until SIGTERM or Ctrl-C.
///
/// Only telemetry records originate here. File events reach the consumer
/// once an external interception shim drives [`FilterContext::on_operation`].
pub async fn serve(config: Config) -> Result<(), Error> {
    let context = Arc::new(FilterContext::from_config(&config));
    let server = ChannelServer::from_config(&config.channel, Arc::clone(context.channel()))?;
    let cancel = CancellationToken::new();

    let server_task = tokio::spawn(server.serve(cancel.clone()));
    let telemetry_task = config.telemetry.enabled.then(|| {
        tokio::spawn(run_telemetry(
            Arc::clone(&context),
            config.telemetry.clone(),
            cancel.clone(),
        ))
    });
    info!(
        socket = %config.channel.socket_path.display(),
        telemetry = config.telemetry.enabled,
        "sentinelguard started"
    );

    let (events_tx, events_rx) = flume::bounded(8);
    let mut listener = tokio::spawn(async move { wait_for_signal(&events_tx).await });

    let outcome = loop {
        tokio::select! {
            res = &mut listener => {
                break match res {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(err),
                    Err(err) => Err(err.into()),
                };
            }
            res = events_rx.recv_async() => match res {
                Ok(SignalEvent::DumpStats) => context.dump_info(),
                Ok(SignalEvent::DropConsumer) => {
                    if !context.channel().disconnect() {
                        debug!("no consumer to drop");
                    }
                }
                Ok(SignalEvent::Terminate) => {
                    info!("terminating");
                    break Ok(());
                }
                Err(err) => break Err(err.into()),
            },
        }
    };

    listener.abort();
    cancel.cancel();
    if let Err(err) = server_task.await? {
        error!(%err, "channel server failed");
    }
    if let Some(task) = telemetry_task {
        task.await?;
    }
    context.teardown();
    outcome
}

/// Poll procfs for secondary signals and forward them as event records.
async fn run_telemetry(
    context: Arc<FilterContext>,
    config: config::Telemetry,
    cancel: CancellationToken,
) {
    let forward = Arc::clone(&context);
    let callback: TraceCallback = Arc::new(move |event| {
        if let Some(record) = forward.builder().build_telemetry(&event) {
            // dropped records are counted by the context
            let _ = forward.emit(record);
        }
    });

    let mut session = ProcfsTraceSession::new();
    let filter = TraceFilter::from(config.filter.as_slice());
    if let Err(err) = session.register(filter, callback).and_then(|()| session.start()) {
        warn!(%err, "telemetry session failed to start");
        return;
    }

    let mut ticker = tokio::time::interval(config.poll_interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let polled = tokio::task::spawn_blocking(move || {
                    let res = session.poll();
                    (session, res)
                })
                .await;
                let (returned, res) = match polled {
                    Ok(polled) => polled,
                    Err(err) => {
                        error!(%err, "telemetry poll panicked");
                        return;
                    }
                };
                session = returned;
                match res {
                    Ok(0) => {}
                    Ok(delivered) => debug!(delivered, "telemetry events"),
                    Err(err) => warn!(%err, "telemetry poll failed"),
                }
            }
        }
    }
    session.stop();
    info!("telemetry stopped");
}

/// Read records from the event socket and print one line per record.
pub async fn consume(path: PathBuf, count: Option<usize>) -> Result<(), Error> {
    let mut stream = UnixStream::connect(&path)
        .await
        .map_err(|source| Error::Connect {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), "connected");

    let mut buf = vec![0u8; RECORD_SIZE];
    let mut seen = 0usize;
    while count.is_none_or(|count| seen < count) {
        match stream.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                info!(seen, "interceptor closed the connection");
                break;
            }
            Err(err) => return Err(err.into()),
        }
        let record = EventRecord::decode(&buf)?;
        seen += 1;

        let mut out = io::stdout().lock();
        if let Err(err) = writeln!(out, "{record}") {
            if err.kind() == ErrorKind::BrokenPipe {
                break;
            }
            return Err(err.into());
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarantineCommand {
    Suspend,
    Resume,
    Kill,
}

pub fn quarantine(config: &Config, command: QuarantineCommand, pid: u32) -> Result<(), Error> {
    let actor = QuarantineActor::resolve(&config.quarantine);
    match command {
        QuarantineCommand::Suspend => actor.suspend(pid)?,
        QuarantineCommand::Resume => actor.resume(pid)?,
        QuarantineCommand::Kill => actor.terminate(pid)?,
    }
    Ok(())
}

pub fn print_config(config: &Config) -> Result<(), Error> {
    let mut out = io::stdout().lock();
    out.write_all(config.to_toml_string()?.as_bytes())?;
    Ok(())
}
