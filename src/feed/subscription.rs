use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::events::FeedEvent;
use super::reconnect::ReconnectPolicy;
use super::sse::SseDecoder;
use super::transport::EventTransport;
use crate::error_handling::types::FeedError;

const EVENT_BUFFER: usize = 100;

/// A live subscription to the event feed.
///
/// Opening a subscription spawns a background task that owns the transport,
/// decodes frames and reconnects after drops. The subscription itself is a
/// lazy [`Stream`] of [`FeedEvent`]s; it ends when cancelled, when dropped,
/// or when a bounded [`ReconnectPolicy`] runs out of attempts. It cannot be
/// restarted: open a new one instead.
pub struct FeedSubscription {
    id: Uuid,
    events: mpsc::Receiver<FeedEvent>,
    task: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    /// Starts consuming `transport`. Must be called within a tokio runtime.
    pub fn open<T: EventTransport>(transport: T, policy: ReconnectPolicy) -> Self {
        let id = Uuid::new_v4();
        let (tx, events) = mpsc::channel(EVENT_BUFFER);

        info!(
            "[{}] Opening feed subscription (retry every {:?}, max attempts {:?})",
            id, policy.delay, policy.max_attempts
        );
        let task = tokio::spawn(run_feed(id, transport, policy, tx));

        Self {
            id,
            events,
            task: Some(task),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits for the next event. `None` once the subscription has ended.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }

    /// Stops the background task and closes its transport. Idempotent; events
    /// still buffered are discarded.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("[{}] Feed subscription cancelled", self.id);
        }
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_none()
    }
}

impl Stream for FeedSubscription {
    type Item = FeedEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<FeedEvent>> {
        self.get_mut().events.poll_recv(cx)
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_feed<T: EventTransport>(
    id: Uuid,
    transport: T,
    policy: ReconnectPolicy,
    tx: mpsc::Sender<FeedEvent>,
) {
    let mut attempts: u32 = 0;

    loop {
        match transport.connect().await {
            Ok(mut body) => {
                info!("[{}] Connected to event feed", id);
                attempts = 0;
                if tx.send(FeedEvent::Connected).await.is_err() {
                    return;
                }

                let mut decoder = SseDecoder::new();
                let reason = loop {
                    match body.next().await {
                        Some(Ok(chunk)) => {
                            for frame in decoder.push(&chunk) {
                                debug!("[{}] '{}' event ({} bytes)", id, frame.event, frame.data.len());
                                let Some(event) = FeedEvent::from_frame(&frame) else {
                                    continue;
                                };
                                if tx.send(event).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Err(e)) => break e,
                        None => break FeedError::StreamClosed,
                    }
                };
                warn!("[{}] Event feed dropped: {}", id, reason);
            }
            Err(e) => warn!("[{}] Unable to reach event feed: {}", id, e),
        }

        if !policy.allows(attempts) {
            error!(
                "[{}] Giving up on event feed after {} reconnect attempts",
                id, attempts
            );
            return;
        }
        attempts += 1;

        if tx
            .send(FeedEvent::Reconnecting {
                attempt: attempts,
                delay: policy.delay,
            })
            .await
            .is_err()
        {
            return;
        }
        tokio::time::sleep(policy.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::stream;

    use crate::feed::transport::ByteStream;

    // Each connect() pops the next scripted connection; an exhausted script refuses
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<Vec<&'static str>, FeedError>>>,
        connects: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Vec<&'static str>, FeedError>>) -> (Self, Arc<AtomicUsize>) {
            let connects = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    script: Mutex::new(script.into_iter().collect()),
                    connects: Arc::clone(&connects),
                },
                connects,
            )
        }
    }

    #[async_trait]
    impl EventTransport for ScriptedTransport {
        async fn connect(&self) -> Result<ByteStream, FeedError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(chunks)) => Ok(stream::iter(
                    chunks
                        .into_iter()
                        .map(|c| Ok(c.as_bytes().to_vec()))
                        .collect::<Vec<_>>(),
                )
                .boxed()),
                Some(Err(e)) => Err(e),
                None => Err(FeedError::ConnectionFailed("refused".to_string())),
            }
        }
    }

    fn record_numbers(events: &[FeedEvent]) -> Vec<u64> {
        events
            .iter()
            .filter_map(|e| match e {
                FeedEvent::Record(r) => r.record_number,
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_drop_with_fixed_delay() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (transport, connects) = ScriptedTransport::new(vec![
            Ok(vec![
                "event: record\ndata: {\"record_number\":1}\n\n",
                "event: record\ndata: {\"record_",
                "number\":2}\n\n",
            ]),
            Err(FeedError::UnexpectedStatus(502)),
            Ok(vec!["event: record\ndata: {\"record_number\":3}\n\n"]),
        ]);
        let policy = ReconnectPolicy::fixed(Duration::from_secs(3)).with_max_attempts(3);

        let started = tokio::time::Instant::now();
        let subscription = FeedSubscription::open(transport, policy);
        let events: Vec<FeedEvent> = subscription.collect().await;

        assert_eq!(record_numbers(&events), vec![1, 2, 3]);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, FeedEvent::Connected))
                .count(),
            2
        );
        let attempts: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                FeedEvent::Reconnecting { attempt, .. } => Some(*attempt),
                _ => None,
            })
            .collect();
        // counter restarts after the successful third connection
        assert_eq!(attempts, vec![1, 2, 1, 2, 3]);
        assert_eq!(connects.load(Ordering::SeqCst), 6);
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_ends_after_first_failure() {
        let (transport, connects) = ScriptedTransport::new(vec![]);
        let mut subscription = FeedSubscription::open(
            transport,
            ReconnectPolicy::default().with_max_attempts(0),
        );

        assert_eq!(subscription.next_event().await, None);
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_ends_stream() {
        let (transport, _) = ScriptedTransport::new(vec![]);
        let mut subscription = FeedSubscription::open(transport, ReconnectPolicy::default());

        assert!(matches!(
            subscription.next_event().await,
            Some(FeedEvent::Reconnecting { attempt: 1, .. })
        ));

        subscription.cancel();
        subscription.cancel();
        assert!(subscription.is_cancelled());
        assert_eq!(subscription.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_do_not_stop_the_feed() {
        let (transport, _) = ScriptedTransport::new(vec![Ok(vec![
            "event: record\ndata: {broken\n\n",
            "event: record\ndata: {\"record_number\":9}\n\n",
        ])]);
        let subscription =
            FeedSubscription::open(transport, ReconnectPolicy::default().with_max_attempts(0));

        let events: Vec<FeedEvent> = subscription.collect().await;
        assert_eq!(record_numbers(&events), vec![9]);
    }
}
