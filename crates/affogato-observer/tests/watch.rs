//! Watch behaviour against transports defined outside the crate.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use affogato_observer::{
    FrameStream, LogObserver, LogTransport, ObserverConfig, ObserverError, SourceId, TailOptions,
    encode_frame,
};
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;

fn line(i: u64) -> Vec<u8> {
    format!("19538:M 31 Dec 2024 19:04:28.665 * message number {i}").into_bytes()
}

/// Sets a flag when the stream it is moved into is dropped.
struct Closed(Arc<AtomicBool>);

impl Drop for Closed {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Emits `count` framed lines, `delay` apart, then ends (or never ends).
struct TickingTransport {
    count: Option<u64>,
    delay: Duration,
    closed: Arc<AtomicBool>,
}

impl TickingTransport {
    fn new(count: Option<u64>, delay: Duration) -> Self {
        Self {
            count,
            delay,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl LogTransport for TickingTransport {
    fn open<'a>(
        &'a self,
        _source: &'a SourceId,
        _options: &'a TailOptions,
    ) -> Pin<Box<dyn Future<Output = affogato_observer::Result<FrameStream>> + Send + 'a>> {
        Box::pin(async move {
            let delay = self.delay;
            let count = self.count;
            let closed = Closed(Arc::clone(&self.closed));
            let frames = stream::iter(0..)
                .take_while(move |i| {
                    let more = count.is_none_or(|c| *i < c);
                    async move { more }
                })
                .then(move |i| async move {
                    tokio::time::sleep(delay).await;
                    Ok(encode_frame(1, &line(i)))
                })
                .map(move |frame| {
                    let _closed = &closed;
                    frame
                });
            Ok(Box::pin(frames) as FrameStream)
        })
    }
}

/// Always refuses to attach.
struct RefusingTransport;

impl LogTransport for RefusingTransport {
    fn open<'a>(
        &'a self,
        source: &'a SourceId,
        _options: &'a TailOptions,
    ) -> Pin<Box<dyn Future<Output = affogato_observer::Result<FrameStream>> + Send + 'a>> {
        Box::pin(async move {
            Err(ObserverError::Attach {
                id: source.to_string(),
                reason: "No such container: some-redis".to_string(),
            })
        })
    }
}

fn source() -> SourceId {
    SourceId::new("some-redis").expect("valid source id")
}

#[tokio::test]
async fn five_lines_then_close() {
    let transport = Arc::new(TickingTransport::new(Some(5), Duration::from_millis(1)));
    let observer = LogObserver::new(
        Arc::clone(&transport) as Arc<dyn LogTransport>,
        ObserverConfig::default(),
    );
    let mut watch = observer.watch(&CancellationToken::new(), source());

    let mut lines = Vec::new();
    let finished = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(l) = watch.recv_line().await {
            lines.push(l);
        }
    })
    .await;

    assert!(finished.is_ok());
    assert_eq!(lines, (0..5).map(line).collect::<Vec<_>>());
    assert!(watch.recv_error().await.is_none());
    assert!(transport.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancelled_mid_stream() {
    let transport = Arc::new(TickingTransport::new(None, Duration::from_millis(2)));
    let observer = LogObserver::new(
        Arc::clone(&transport) as Arc<dyn LogTransport>,
        ObserverConfig::default(),
    );
    let cancel = CancellationToken::new();
    let mut watch = observer.watch(&cancel, source());

    let mut lines = Vec::new();
    for _ in 0..3 {
        if let Some(l) = watch.recv_line().await {
            lines.push(l);
        }
    }
    cancel.cancel();

    let finished = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(l) = watch.recv_line().await {
            lines.push(l);
        }
    })
    .await;
    assert!(finished.is_ok());

    // Whatever arrived is a prefix of the source, every line intact.
    assert!(lines.len() >= 3);
    for (i, l) in lines.iter().enumerate() {
        assert_eq!(*l, line(i as u64));
    }
    assert!(watch.recv_error().await.is_none());
    assert!(transport.closed.load(Ordering::SeqCst));

    // Cancelling again after the watch ended is harmless.
    cancel.cancel();
    watch.cancel();
}

#[tokio::test]
async fn attach_refused() {
    let observer = LogObserver::new(Arc::new(RefusingTransport), ObserverConfig::default());
    let mut watch = observer.watch(&CancellationToken::new(), source());

    assert!(watch.recv_line().await.is_none());
    let err = watch.recv_error().await;
    assert!(matches!(err, Some(ObserverError::Attach { ref id, .. }) if id == "some-redis"));
    assert!(watch.recv_error().await.is_none());
}

#[tokio::test]
async fn cancelled_before_attach() {
    let transport = Arc::new(TickingTransport::new(None, Duration::from_millis(1)));
    let observer = LogObserver::new(
        Arc::clone(&transport) as Arc<dyn LogTransport>,
        ObserverConfig::default(),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut watch = observer.watch(&cancel, source());
    assert!(watch.recv_line().await.is_none());
    assert!(watch.recv_error().await.is_none());
}
