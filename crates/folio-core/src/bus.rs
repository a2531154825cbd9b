//! Process-wide publish/subscribe hub.
//!
//! Subsystems emit and listen without knowing about each other. The bus is an
//! explicitly constructed instance (`Arc<EventBus>`) passed to whoever needs
//! it; nothing here is a global.
//!
//! Delivery contract:
//! - subscribers for one event fire synchronously, in descending priority
//!   order (FIFO within equal priority), inside the `publish` call;
//! - a failing subscriber never stops the remaining ones - the error is
//!   logged and re-published on [`ERROR_EVENT`];
//! - `publish` iterates a snapshot of the subscriber list, so subscribing or
//!   unsubscribing from inside a callback is safe and takes effect on the
//!   next publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::oneshot;

/// Channel that subscriber failures are re-published on.
///
/// Payload: `{"event": <original event>, "error": <message>}`. Failures of
/// `bus:error` subscribers themselves are logged but not re-wrapped.
pub const ERROR_EVENT: &str = "bus:error";

/// Subscriber callback. Returning `Err` marks this delivery as failed;
/// the failure is isolated to this subscriber.
pub type Callback = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// Identity of a single subscription, assigned at subscribe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Options accepted by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscribeOptions {
    /// Invocation order among subscribers of the same event: higher first.
    pub priority: i32,
}

impl SubscribeOptions {
    pub fn with_priority(priority: i32) -> Self {
        Self { priority }
    }
}

/// Handle returned by `subscribe`/`subscribe_once`.
///
/// Removes exactly this subscription via [`Subscription::cancel`]. Dropping
/// the handle does NOT unsubscribe; one-shot subscriptions clean themselves
/// up after firing.
#[derive(Debug, Clone)]
pub struct Subscription {
    bus: Weak<EventBus>,
    event: String,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Removes this subscription. Returns false if it was already gone
    /// (fired as a one-shot, cancelled before, or the bus was dropped).
    pub fn cancel(&self) -> bool {
        match self.bus.upgrade() {
            Some(bus) => bus.unsubscribe(&self.event, self.id),
            None => false,
        }
    }
}

struct Subscriber {
    id: SubscriptionId,
    priority: i32,
    once: bool,
    callback: Callback,
}

/// Publish/subscribe hub. Construct once with [`EventBus::new`] and share.
#[derive(Default)]
pub struct EventBus {
    topics: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscriber>>> {
        // A poisoned lock only means a subscriber panicked mid-publish;
        // the map itself is still consistent (mutations happen outside
        // callback invocation), so keep going.
        self.topics.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Registers `callback` for `event`. Returns a handle that removes
    /// exactly this subscription.
    pub fn subscribe(
        self: &Arc<Self>,
        event: impl Into<String>,
        callback: Callback,
        options: SubscribeOptions,
    ) -> Subscription {
        self.subscribe_inner(event.into(), callback, options, false)
    }

    /// Like [`EventBus::subscribe`], but auto-unsubscribes after the first
    /// invocation.
    pub fn subscribe_once(
        self: &Arc<Self>,
        event: impl Into<String>,
        callback: Callback,
        options: SubscribeOptions,
    ) -> Subscription {
        self.subscribe_inner(event.into(), callback, options, true)
    }

    fn subscribe_inner(
        self: &Arc<Self>,
        event: String,
        callback: Callback,
        options: SubscribeOptions,
        once: bool,
    ) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber {
            id,
            priority: options.priority,
            once,
            callback,
        };

        let mut topics = self.topics();
        let subs = topics.entry(event.clone()).or_default();
        // Keep the list sorted by descending priority; inserting after the
        // last entry with >= priority preserves FIFO among equals.
        let pos = subs
            .iter()
            .position(|s| s.priority < options.priority)
            .unwrap_or(subs.len());
        subs.insert(pos, subscriber);

        Subscription {
            bus: Arc::downgrade(self),
            event,
            id,
        }
    }

    /// Removes a subscription by id. Returns false if not found.
    pub fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool {
        let mut topics = self.topics();
        let Some(subs) = topics.get_mut(event) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.id != id);
        let removed = subs.len() != before;
        if subs.is_empty() {
            topics.remove(event);
        }
        removed
    }

    /// Invokes all current subscribers for `event` in priority order.
    /// Returns whether any existed.
    pub fn publish(&self, event: &str, payload: &Value) -> bool {
        let snapshot: Vec<(SubscriptionId, Callback)> = {
            let mut topics = self.topics();
            let Some(subs) = topics.get_mut(event) else {
                return false;
            };
            let snapshot = subs
                .iter()
                .map(|s| (s.id, Arc::clone(&s.callback)))
                .collect();
            // One-shots are consumed by this publish; drop them before
            // invoking callbacks so a re-entrant publish cannot fire them
            // twice.
            subs.retain(|s| !s.once);
            if subs.is_empty() {
                topics.remove(event);
            }
            snapshot
        };

        if snapshot.is_empty() {
            return false;
        }

        for (id, callback) in &snapshot {
            if let Err(err) = callback(payload) {
                tracing::warn!(event, subscriber = id.0, "subscriber failed: {err:#}");
                if event != ERROR_EVENT {
                    let report = serde_json::json!({
                        "event": event,
                        "error": err.to_string(),
                    });
                    self.publish(ERROR_EVENT, &report);
                }
            }
        }

        true
    }

    /// Defers the publish to the next scheduling tick of the async runtime.
    pub async fn publish_async(&self, event: &str, payload: Value) -> bool {
        tokio::task::yield_now().await;
        self.publish(event, &payload)
    }

    /// Resolves with the payload of the next publish of `event`.
    ///
    /// With a timeout, the pending subscription is removed and
    /// [`WaitError::Timeout`] returned once the deadline passes.
    pub async fn wait_for(
        self: &Arc<Self>,
        event: &str,
        timeout: Option<Duration>,
    ) -> Result<Value, WaitError> {
        let (tx, rx) = oneshot::channel::<Value>();
        let tx = Mutex::new(Some(tx));
        let callback: Callback = Arc::new(move |payload| {
            let sender = tx
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take();
            if let Some(sender) = sender {
                let _ = sender.send(payload.clone());
            }
            Ok(())
        });
        let subscription = self.subscribe_once(event, callback, SubscribeOptions::default());

        match timeout {
            Some(duration) => match tokio::time::timeout(duration, rx).await {
                Ok(Ok(payload)) => Ok(payload),
                Ok(Err(_)) => Err(WaitError::Cancelled),
                Err(_) => {
                    subscription.cancel();
                    Err(WaitError::Timeout)
                }
            },
            None => rx.await.map_err(|_| WaitError::Cancelled),
        }
    }

    /// Number of live subscriptions for an event.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.topics().get(event).map_or(0, Vec::len)
    }
}

/// Failure modes of [`EventBus::wait_for`].
#[derive(Debug, PartialEq, Eq)]
pub enum WaitError {
    /// The deadline passed before the event was published.
    Timeout,
    /// The pending wait was dropped (bus shut down mid-wait).
    Cancelled,
}

impl std::fmt::Display for WaitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitError::Timeout => write!(f, "timed out waiting for event"),
            WaitError::Cancelled => write!(f, "wait cancelled"),
        }
    }
}

impl std::error::Error for WaitError {}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn recording_callback(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Callback {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |_payload| {
            log.lock().unwrap().push(tag.clone());
            Ok(())
        })
    }

    /// Higher priority subscribers run strictly first.
    #[test]
    fn test_publish_respects_priority_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "nav:changed",
            recording_callback(&log, "low"),
            SubscribeOptions::with_priority(5),
        );
        bus.subscribe(
            "nav:changed",
            recording_callback(&log, "high"),
            SubscribeOptions::with_priority(10),
        );

        assert!(bus.publish("nav:changed", &json!({})));
        assert_eq!(*log.lock().unwrap(), vec!["high", "low"]);
    }

    /// Equal priority keeps registration order.
    #[test]
    fn test_equal_priority_is_fifo() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe("e", recording_callback(&log, "first"), SubscribeOptions::default());
        bus.subscribe("e", recording_callback(&log, "second"), SubscribeOptions::default());

        bus.publish("e", &json!({}));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    /// Publishing with no subscribers reports false.
    #[test]
    fn test_publish_without_subscribers_returns_false() {
        let bus = EventBus::new();
        assert!(!bus.publish("nobody:home", &json!({})));
    }

    /// A failing subscriber does not stop lower-priority ones.
    #[test]
    fn test_subscriber_error_is_isolated() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(
            "e",
            Arc::new(|_| anyhow::bail!("boom")),
            SubscribeOptions::with_priority(10),
        );
        bus.subscribe(
            "e",
            recording_callback(&log, "survivor"),
            SubscribeOptions::with_priority(5),
        );

        assert!(bus.publish("e", &json!({})));
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }

    /// Subscriber failures are re-published on the error channel with the
    /// original event name in the payload.
    #[test]
    fn test_subscriber_error_republished_on_error_channel() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_cb = Arc::clone(&seen);
        bus.subscribe(
            ERROR_EVENT,
            Arc::new(move |payload| {
                seen_cb.lock().unwrap().push(payload.clone());
                Ok(())
            }),
            SubscribeOptions::default(),
        );
        bus.subscribe("e", Arc::new(|_| anyhow::bail!("boom")), SubscribeOptions::default());

        bus.publish("e", &json!({}));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["event"], "e");
        assert!(seen[0]["error"].as_str().unwrap().contains("boom"));
    }

    /// Errors raised by error-channel subscribers are not re-wrapped.
    #[test]
    fn test_error_channel_recursion_guard() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(0usize));

        let calls_cb = Arc::clone(&calls);
        bus.subscribe(
            ERROR_EVENT,
            Arc::new(move |_| {
                *calls_cb.lock().unwrap() += 1;
                anyhow::bail!("error handler also fails")
            }),
            SubscribeOptions::default(),
        );
        bus.subscribe("e", Arc::new(|_| anyhow::bail!("boom")), SubscribeOptions::default());

        bus.publish("e", &json!({}));

        // Exactly one delivery: the failure of the error handler itself
        // must not trigger another bus:error publish.
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    /// The handle returned by subscribe removes exactly that subscription.
    #[test]
    fn test_cancel_removes_exactly_one_subscription() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let sub_a = bus.subscribe("e", recording_callback(&log, "a"), SubscribeOptions::default());
        bus.subscribe("e", recording_callback(&log, "b"), SubscribeOptions::default());

        assert!(sub_a.cancel());
        assert!(!sub_a.cancel(), "second cancel is a no-op");

        bus.publish("e", &json!({}));
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    /// unsubscribe with an unknown id is a no-op.
    #[test]
    fn test_unsubscribe_unknown_id_is_noop() {
        let bus = EventBus::new();
        bus.subscribe("e", Arc::new(|_| Ok(())), SubscribeOptions::default());
        assert!(!bus.unsubscribe("e", SubscriptionId(999)));
        assert_eq!(bus.subscriber_count("e"), 1);
    }

    /// One-shot subscriptions fire once and clean themselves up.
    #[test]
    fn test_subscribe_once_fires_once() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe_once("e", recording_callback(&log, "once"), SubscribeOptions::default());

        bus.publish("e", &json!({}));
        bus.publish("e", &json!({}));

        assert_eq!(*log.lock().unwrap(), vec!["once"]);
        assert_eq!(bus.subscriber_count("e"), 0);
    }

    /// Unsubscribing another subscriber from inside a callback must not
    /// disturb the in-flight publish (snapshot iteration).
    #[test]
    fn test_unsubscribe_during_publish_is_safe() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let victim = bus.subscribe("e", recording_callback(&log, "victim"), SubscribeOptions::with_priority(1));

        let victim_clone = victim.clone();
        let log_cb = Arc::clone(&log);
        bus.subscribe(
            "e",
            Arc::new(move |_| {
                log_cb.lock().unwrap().push("killer".to_string());
                victim_clone.cancel();
                Ok(())
            }),
            SubscribeOptions::with_priority(10),
        );

        // This publish still delivers to the victim (snapshot), the next
        // one does not.
        bus.publish("e", &json!({}));
        bus.publish("e", &json!({}));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["killer", "victim", "killer"]
        );
    }

    /// wait_for resolves with the published payload.
    #[tokio::test]
    async fn test_wait_for_receives_payload() {
        let bus = EventBus::new();

        let waiter = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move { bus.wait_for("theme:changed", None).await })
        };

        // Let the waiter install its subscription before publishing.
        tokio::task::yield_now().await;
        while bus.subscriber_count("theme:changed") == 0 {
            tokio::task::yield_now().await;
        }
        bus.publish("theme:changed", &json!({"dark": true}));

        let payload = waiter.await.unwrap().unwrap();
        assert_eq!(payload["dark"], true);
    }

    /// wait_for times out and removes its pending subscription.
    #[tokio::test]
    async fn test_wait_for_timeout() {
        let bus = EventBus::new();

        let result = bus.wait_for("never", Some(Duration::from_millis(10))).await;

        assert_eq!(result.unwrap_err(), WaitError::Timeout);
        assert_eq!(bus.subscriber_count("never"), 0);
    }

    /// publish_async delivers after yielding to the scheduler.
    #[tokio::test]
    async fn test_publish_async_delivers() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe("e", recording_callback(&log, "async"), SubscribeOptions::default());

        assert!(bus.publish_async("e", json!({})).await);
        assert_eq!(*log.lock().unwrap(), vec!["async"]);
    }
}
