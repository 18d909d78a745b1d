//! In-process loopback broker.
//!
//! A minimal bus implementation backing tests and the demo binary: exact
//! topic matching, retained payloads, per-client last-will. Every client
//! created from one [`LoopbackBroker`] sees every other client's publishes
//! on the topics it subscribed to, in publish order.
//!
//! This is deliberately not a broker protocol implementation — just enough
//! black-box behavior (retained delivery on subscribe, last-will on
//! ungraceful death) for the bridge to be exercised end-to-end.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectOptions, IncomingMessage, Transport, TransportError};

/// Per-client registration inside the broker.
#[derive(Debug)]
struct Subscriber {
    topics: HashSet<String>,
    sender: mpsc::UnboundedSender<IncomingMessage>,
}

/// Shared broker state.
#[derive(Debug, Default)]
struct BrokerState {
    retained: HashMap<String, String>,
    subscribers: HashMap<usize, Subscriber>,
    next_client: usize,
}

impl BrokerState {
    fn deliver(&self, topic: &str, payload: &str) {
        for subscriber in self.subscribers.values() {
            if subscriber.topics.contains(topic) {
                // A dropped receiver just means that client went away.
                let _ = subscriber.sender.send(IncomingMessage {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                });
            }
        }
    }
}

/// An in-process pub/sub broker.
#[derive(Debug, Clone, Default)]
pub struct LoopbackBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl LoopbackBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new client of this broker.
    #[must_use]
    pub fn client(&self) -> LoopbackTransport {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = {
            let mut state = lock(&self.state);
            let id = state.next_client;
            state.next_client += 1;
            state.subscribers.insert(
                id,
                Subscriber { topics: HashSet::new(), sender },
            );
            id
        };
        LoopbackTransport {
            state: Arc::clone(&self.state),
            id,
            connected: AtomicBool::new(false),
            incoming: Mutex::new(Some(receiver)),
            last_will: Mutex::new(None),
        }
    }

    /// Retained payload currently stored for `topic`, if any.
    #[must_use]
    pub fn retained(&self, topic: &str) -> Option<String> {
        lock(&self.state).retained.get(topic).cloned()
    }
}

fn lock(state: &Arc<Mutex<BrokerState>>) -> MutexGuard<'_, BrokerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One client session of a [`LoopbackBroker`].
#[derive(Debug)]
pub struct LoopbackTransport {
    state: Arc<Mutex<BrokerState>>,
    id: usize,
    connected: AtomicBool,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<IncomingMessage>>>,
    last_will: Mutex<Option<(String, String)>>,
}

impl LoopbackTransport {
    /// Simulate an ungraceful death: the session drops and the broker
    /// publishes the registered last-will message.
    pub fn kill(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let will = lock_option(&self.last_will).take();
        if let Some((topic, payload)) = will {
            let mut state = lock(&self.state);
            state.retained.insert(topic.clone(), payload.clone());
            state.deliver(&topic, &payload);
        }
    }
}

fn lock_option<T>(mutex: &Mutex<Option<T>>) -> MutexGuard<'_, Option<T>> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn connect(&self, options: ConnectOptions) -> Result<(), TransportError> {
        log::debug!(
            "[Loopback] Client {} connecting to {} as {}",
            self.id,
            options.address,
            options.client_id
        );
        *lock_option(&self.last_will) =
            Some((options.last_will_topic, options.last_will_payload));
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, topics: &[String]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let retained: Vec<IncomingMessage> = {
            let mut state = lock(&self.state);
            let messages = topics
                .iter()
                .filter_map(|topic| {
                    state.retained.get(topic).map(|payload| IncomingMessage {
                        topic: topic.clone(),
                        payload: payload.clone(),
                    })
                })
                .collect();
            let subscriber = state
                .subscribers
                .get_mut(&self.id)
                .ok_or_else(|| TransportError::SubscribeFailed("client gone".to_string()))?;
            subscriber.topics.extend(topics.iter().cloned());
            messages
        };
        // Retained payloads are delivered to fresh subscribers immediately.
        if !retained.is_empty() {
            let state = lock(&self.state);
            if let Some(subscriber) = state.subscribers.get(&self.id) {
                for message in retained {
                    let _ = subscriber.sender.send(message);
                }
            }
        }
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let mut state = lock(&self.state);
        if retain {
            state.retained.insert(topic.to_string(), payload.to_string());
        }
        state.deliver(topic, payload);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<IncomingMessage>> {
        lock_option(&self.incoming).take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(client_id: &str) -> ConnectOptions {
        ConnectOptions {
            address: "loopback".to_string(),
            client_id: client_id.to_string(),
            last_will_topic: format!("status/{client_id}"),
            last_will_payload: "offline".to_string(),
            last_will_retain: true,
        }
    }

    #[tokio::test]
    async fn test_publish_routes_to_subscribers() {
        let broker = LoopbackBroker::new();
        let publisher = broker.client();
        let subscriber = broker.client();

        publisher.connect(options("pub")).await.expect("connect");
        subscriber.connect(options("sub")).await.expect("connect");
        subscriber
            .subscribe(&["a/b".to_string()])
            .await
            .expect("subscribe");

        publisher.publish("a/b", "hello", false).await.expect("publish");

        let mut incoming = subscriber.take_incoming().expect("receiver");
        let message = incoming.recv().await.expect("message");
        assert_eq!(message.topic, "a/b");
        assert_eq!(message.payload, "hello");
    }

    #[tokio::test]
    async fn test_unsubscribed_topics_not_delivered() {
        let broker = LoopbackBroker::new();
        let publisher = broker.client();
        let subscriber = broker.client();

        publisher.connect(options("pub")).await.expect("connect");
        subscriber.connect(options("sub")).await.expect("connect");
        subscriber
            .subscribe(&["a/b".to_string()])
            .await
            .expect("subscribe");

        publisher.publish("a/c", "nope", false).await.expect("publish");
        publisher.publish("a/b", "yes", false).await.expect("publish");

        let mut incoming = subscriber.take_incoming().expect("receiver");
        let message = incoming.recv().await.expect("message");
        assert_eq!(message.payload, "yes");
    }

    #[tokio::test]
    async fn test_retained_payload_delivered_on_subscribe() {
        let broker = LoopbackBroker::new();
        let publisher = broker.client();
        publisher.connect(options("pub")).await.expect("connect");
        publisher
            .publish("state", "retained!", true)
            .await
            .expect("publish");

        let late = broker.client();
        late.connect(options("late")).await.expect("connect");
        late.subscribe(&["state".to_string()]).await.expect("subscribe");

        let mut incoming = late.take_incoming().expect("receiver");
        let message = incoming.recv().await.expect("message");
        assert_eq!(message.payload, "retained!");
    }

    #[tokio::test]
    async fn test_publish_before_connect_fails() {
        let broker = LoopbackBroker::new();
        let client = broker.client();
        let result = client.publish("t", "p", false).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_kill_publishes_last_will() {
        let broker = LoopbackBroker::new();
        let watcher = broker.client();
        watcher.connect(options("watcher")).await.expect("connect");
        watcher
            .subscribe(&["status/doomed".to_string()])
            .await
            .expect("subscribe");

        let doomed = broker.client();
        doomed.connect(options("doomed")).await.expect("connect");
        doomed.kill();

        let mut incoming = watcher.take_incoming().expect("receiver");
        let message = incoming.recv().await.expect("message");
        assert_eq!(message.payload, "offline");
        assert_eq!(broker.retained("status/doomed").as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn test_take_incoming_yields_once() {
        let broker = LoopbackBroker::new();
        let client = broker.client();
        assert!(client.take_incoming().is_some());
        assert!(client.take_incoming().is_none());
    }
}
