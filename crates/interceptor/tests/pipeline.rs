use interceptor::{
    DeliveryChannel, Disposition, Error, EventBuilder, EventKind, FilterContext, Operation,
    channel::InProcessEndpoint,
    classifier::{InformationClass, OperationCategory},
    clock::FixedClock,
    event::Timestamp,
    resolver::{NameContext, ProcessTable},
};
use pretty_assertions::assert_eq;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

const PID: u32 = 4321;

struct OneProcess;

impl ProcessTable for OneProcess {
    fn image_path(&self, pid: u32) -> Result<PathBuf, Error> {
        match pid {
            PID => Ok(PathBuf::from("/usr/bin/encryptor")),
            _ => Err(Error::ProcessLookupFailed { pid }),
        }
    }
}

fn context() -> FilterContext {
    let builder = EventBuilder::new(
        Arc::new(OneProcess),
        Arc::new(FixedClock(Timestamp::from_nanos(1_700_000_000_000_000_000))),
        4096,
    );
    FilterContext::new(builder, Arc::new(DeliveryChannel::new()))
}

fn consumer(ctx: &FilterContext, capacity: usize) -> flume::Receiver<interceptor::EventRecord> {
    let (endpoint, rx) = InProcessEndpoint::pair(capacity, Duration::from_millis(50));
    ctx.channel().connect(Arc::new(endpoint));
    rx
}

#[test]
fn create_yields_create_record() {
    let ctx = context();
    let rx = consumer(&ctx, 8);
    let path = Path::new(r"C:\data\file.txt");

    let op = Operation::new(OperationCategory::Create, PID, NameContext::Path(path));
    assert_eq!(ctx.on_operation(&op), Disposition::Continue);

    let record = rx.try_recv().unwrap();
    assert_eq!(record.kind(), EventKind::Create);
    assert_eq!(record.process_id(), PID);
    assert_eq!(record.process_path().to_string_lossy(), "/usr/bin/encryptor");
    assert!(record.file_path().to_string_lossy().ends_with("file.txt"));
    assert_eq!(record.bytes_read(), 0);
    assert_eq!(record.bytes_written(), 0);
}

#[test]
fn zero_write_has_zero_entropy() {
    let ctx = context();
    let rx = consumer(&ctx, 8);
    let data = vec![0u8; 4096];
    let path = Path::new("/srv/data/file.bin");

    let op = Operation::new(OperationCategory::Write, PID, NameContext::Path(path))
        .with_length(4096)
        .with_buffer(&data);
    ctx.on_operation(&op);

    let record = rx.try_recv().unwrap();
    assert_eq!(record.kind(), EventKind::Write);
    assert_eq!(record.bytes_written(), 4096);
    assert_eq!(record.bytes_read(), 0);
    assert_eq!(record.entropy_preview().score(), 0);
}

#[test]
fn random_looking_write_scores_high() {
    let ctx = context();
    let rx = consumer(&ctx, 8);
    let mut state = 0x2545_f491u32;
    let data: Vec<u8> = (0..4096)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect();

    let op = Operation::new(OperationCategory::Write, PID, NameContext::Unnamed)
        .with_length(4096)
        .with_buffer(&data);
    ctx.on_operation(&op);

    let record = rx.try_recv().unwrap();
    assert!(record.entropy_preview().score() > 200);
    // file name missing, record still produced
    assert!(record.file_path().is_empty());
}

#[test]
fn set_information_sub_classes() {
    let ctx = context();
    let rx = consumer(&ctx, 8);
    let path = Path::new("/srv/data/file.txt");
    let set = |class| {
        Operation::new(OperationCategory::SetInformation(class), PID, NameContext::Path(path))
    };

    assert_eq!(ctx.on_operation(&set(InformationClass::Rename)), Disposition::Continue);
    assert_eq!(rx.try_recv().unwrap().kind(), EventKind::Rename);

    assert_eq!(ctx.on_operation(&set(InformationClass::DispositionEx)), Disposition::Continue);
    assert_eq!(rx.try_recv().unwrap().kind(), EventKind::Delete);

    assert_eq!(ctx.on_operation(&set(InformationClass::Basic)), Disposition::Continue);
    assert!(rx.try_recv().is_err());
    assert_eq!(ctx.stats().observed, 3);
    assert_eq!(ctx.stats().classified, 2);
}

#[test]
fn disconnect_mid_stream_drops_without_buffering() {
    let ctx = context();
    let first = consumer(&ctx, 64);
    let path = Path::new("/srv/data/file.txt");
    let op = Operation::new(OperationCategory::Create, PID, NameContext::Path(path));

    for _ in 0..10 {
        ctx.on_operation(&op);
    }
    assert!(ctx.channel().disconnect());

    for _ in 0..5 {
        let record = ctx.builder().build(EventKind::Create, &op);
        assert!(matches!(ctx.emit(record), Err(Error::ChannelDisconnected)));
    }

    let second = consumer(&ctx, 64);
    assert_eq!(first.len(), 10);
    assert!(second.is_empty());

    let stats = ctx.stats();
    assert_eq!(stats.delivered, 10);
    assert_eq!(stats.dropped_disconnected, 5);
}

#[test]
fn dropped_receiver_releases_endpoint() {
    let ctx = context();
    let rx = consumer(&ctx, 4);
    drop(rx);

    let op = Operation::new(OperationCategory::Create, PID, NameContext::Unnamed);
    assert_eq!(ctx.on_operation(&op), Disposition::Continue);
    assert!(!ctx.channel().is_connected());
    assert_eq!(ctx.stats().dropped_transport, 1);

    ctx.on_operation(&op);
    assert_eq!(ctx.stats().dropped_disconnected, 1);
}
