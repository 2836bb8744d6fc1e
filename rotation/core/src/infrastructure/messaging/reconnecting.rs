// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Process-wide broker connection with background reconnects.
//!
//! A supervisor task owns reconnect campaigns. It is woken at start-up, by the
//! connector's connection-loss callback, by a failed send, and by a publish
//! that finds no connection. Publishers never drive a campaign themselves;
//! they wait at most `publish_wait` for one to produce a link, and at most
//! `publish_wait` again for the broker to confirm each send. An unconfirmed
//! send is treated as a dead connection.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backoff::BackoffPolicy;
use super::{BrokerConnector, BrokerLink, PublishError};
use crate::application::publisher::NotificationPublisher;
use crate::domain::events::Notification;
use crate::infrastructure::metrics::{BROKER_RECONNECTS_TOTAL, RECONNECT_CAMPAIGNS_EXHAUSTED_TOTAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Last campaign ran out of its elapsed-time budget
    Exhausted,
}

pub struct ReconnectingPublisher {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    connector: Arc<dyn BrokerConnector>,
    policy: BackoffPolicy,
    publish_wait: Duration,
    link: RwLock<Option<Arc<dyn BrokerLink>>>,
    status: watch::Sender<ConnectionStatus>,
    wake: Arc<Notify>,
    shutdown: CancellationToken,
    connected_once: AtomicBool,
}

impl ReconnectingPublisher {
    /// Spawn the supervisor and begin the first connection campaign.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        connector: Arc<dyn BrokerConnector>,
        policy: BackoffPolicy,
        publish_wait: Duration,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let shared = Arc::new(Shared {
            connector,
            policy,
            publish_wait,
            link: RwLock::new(None),
            status,
            wake: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
            connected_once: AtomicBool::new(false),
        });

        let handle = tokio::spawn(supervise(shared.clone()));

        Self {
            shared,
            supervisor: Mutex::new(Some(handle)),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    async fn publish_payload(&self, payload: &[u8]) -> Result<(), PublishError> {
        let mut retried = false;
        loop {
            let link = self.shared.acquire_link().await?;
            let sent = tokio::time::timeout(self.shared.publish_wait, link.send(payload))
                .await
                .unwrap_or(Err(PublishError::SendTimeout(self.shared.publish_wait)));
            match sent {
                Ok(()) => return Ok(()),
                Err(e) if e.is_connection_failure() => {
                    self.shared.mark_lost(&link);
                    if retried {
                        return Err(e);
                    }
                    warn!("Send failed on lost connection, retrying on next link: {}", e);
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl NotificationPublisher for ReconnectingPublisher {
    async fn publish(&self, notification: &Notification) -> Result<(), PublishError> {
        let payload = notification.to_json()?;
        self.publish_payload(&payload).await?;
        info!(
            body = %String::from_utf8_lossy(&payload),
            "Sent notification"
        );
        Ok(())
    }

    async fn close(&self) {
        self.shared.shutdown.cancel();

        let handle = self.supervisor.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Publisher supervisor ended abnormally: {}", e);
            }
        }

        let link = self.shared.link.write().take();
        if let Some(link) = link {
            link.close().await;
        }
        self.shared.status.send_replace(ConnectionStatus::Disconnected);
        info!("Notification publisher closed");
    }
}

impl Shared {
    fn current_link(&self) -> Option<Arc<dyn BrokerLink>> {
        self.link.read().clone()
    }

    /// Drop `link` if it is still the current one. Returns whether it was.
    fn detach(&self, link: &Arc<dyn BrokerLink>) -> bool {
        let mut current = self.link.write();
        let is_current = current
            .as_ref()
            .is_some_and(|existing| Arc::ptr_eq(existing, link));
        if is_current {
            *current = None;
            drop(current);
            self.status.send_replace(ConnectionStatus::Disconnected);
        }
        is_current
    }

    fn mark_lost(&self, link: &Arc<dyn BrokerLink>) {
        if self.detach(link) {
            warn!("Broker connection lost");
            self.wake.notify_one();
        }
    }

    async fn acquire_link(&self) -> Result<Arc<dyn BrokerLink>, PublishError> {
        if self.shutdown.is_cancelled() {
            return Err(PublishError::Closed);
        }

        if let Some(link) = self.current_link() {
            if link.is_open() {
                return Ok(link);
            }
            self.mark_lost(&link);
        }

        let mut status = self.status.subscribe();
        match *status.borrow_and_update() {
            ConnectionStatus::Exhausted => {
                // Fail this call, but start over in the background
                self.wake.notify_one();
                return Err(PublishError::ReconnectExhausted);
            }
            ConnectionStatus::Disconnected => self.wake.notify_one(),
            ConnectionStatus::Connecting | ConnectionStatus::Connected => {}
        }

        let wait = async {
            loop {
                if let Some(link) = self.current_link() {
                    return Ok(link);
                }
                if status.changed().await.is_err() {
                    return Err(PublishError::Closed);
                }
                match *status.borrow_and_update() {
                    ConnectionStatus::Exhausted => return Err(PublishError::ReconnectExhausted),
                    _ if self.shutdown.is_cancelled() => return Err(PublishError::Closed),
                    _ => {}
                }
            }
        };

        match tokio::time::timeout(self.publish_wait, wait).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::NotConnected(self.publish_wait)),
        }
    }

    async fn run_campaign(&self) {
        self.status.send_replace(ConnectionStatus::Connecting);
        let mut backoff = self.policy.start();

        loop {
            let attempt = tokio::select! {
                _ = self.shutdown.cancelled() => return,
                result = self.connector.connect(self.wake.clone()) => result,
            };

            match attempt {
                Ok(link) => {
                    *self.link.write() = Some(link);
                    self.status.send_replace(ConnectionStatus::Connected);
                    if self.connected_once.swap(true, Ordering::SeqCst) {
                        metrics::counter!(BROKER_RECONNECTS_TOTAL).increment(1);
                        info!(attempts = backoff.attempts() + 1, "Reconnected to broker");
                    } else {
                        info!("Connected to broker");
                    }
                    return;
                }
                Err(e) => match backoff.next_backoff() {
                    Some(delay) => {
                        warn!("Broker connection attempt failed: {}. Retrying in {:?}", e, delay);
                        tokio::select! {
                            _ = self.shutdown.cancelled() => return,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    None => {
                        error!(
                            attempts = backoff.attempts() + 1,
                            elapsed = ?backoff.elapsed(),
                            "Giving up on broker reconnect: {}",
                            e
                        );
                        metrics::counter!(RECONNECT_CAMPAIGNS_EXHAUSTED_TOTAL).increment(1);
                        self.status.send_replace(ConnectionStatus::Exhausted);
                        return;
                    }
                },
            }
        }
    }
}

async fn supervise(shared: Arc<Shared>) {
    loop {
        let needs_connect = match shared.current_link() {
            Some(link) if link.is_open() => false,
            Some(link) => {
                shared.detach(&link);
                warn!("Broker connection lost");
                true
            }
            None => true,
        };

        if needs_connect {
            shared.run_campaign().await;
        }

        tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            _ = shared.wake.notified() => {}
        }
    }
    debug!("Publisher supervisor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::banner::{BannerId, SlotId, UserGroupId};
    use crate::domain::events::EventType;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct FakeLink {
        closed: AtomicBool,
        fail_sends: AtomicBool,
        never_confirm: AtomicBool,
        sent: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl BrokerLink for FakeLink {
        async fn send(&self, payload: &[u8]) -> Result<(), PublishError> {
            if self.never_confirm.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_sends.load(Ordering::SeqCst) {
                self.closed.store(true, Ordering::SeqCst);
                return Err(PublishError::Broker("connection reset".to_string()));
            }
            self.sent.lock().push(payload.to_vec());
            Ok(())
        }

        fn is_open(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct FakeConnector {
        refuse: AtomicBool,
        silent_links: AtomicBool,
        attempts: AtomicUsize,
        links: Mutex<Vec<Arc<FakeLink>>>,
        lost: Mutex<Option<Arc<Notify>>>,
    }

    impl FakeConnector {
        fn link(&self, index: usize) -> Arc<FakeLink> {
            self.links.lock()[index].clone()
        }

        fn link_count(&self) -> usize {
            self.links.lock().len()
        }
    }

    #[async_trait]
    impl BrokerConnector for FakeConnector {
        async fn connect(&self, lost: Arc<Notify>) -> Result<Arc<dyn BrokerLink>, PublishError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.refuse.load(Ordering::SeqCst) {
                return Err(PublishError::Broker("connection refused".to_string()));
            }
            let link = Arc::new(FakeLink::default());
            link.never_confirm
                .store(self.silent_links.load(Ordering::SeqCst), Ordering::SeqCst);
            self.links.lock().push(link.clone());
            *self.lost.lock() = Some(lost);
            Ok(link)
        }
    }

    fn fast_policy() -> BackoffPolicy {
        BackoffPolicy {
            initial_interval: Duration::from_millis(5),
            multiplier: 2.0,
            max_interval: Duration::from_millis(20),
            max_elapsed_time: Duration::from_secs(5),
        }
    }

    fn notification() -> Notification {
        Notification {
            type_event: EventType::Impress,
            slot_id: SlotId(1),
            banner_id: BannerId(2),
            usergroup_id: UserGroupId(3),
            date_time: chrono::Utc::now(),
        }
    }

    async fn eventually(mut condition: impl FnMut() -> bool) {
        for _ in 0..400 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met in time");
    }

    #[tokio::test]
    async fn test_publishes_on_established_link() {
        let connector = Arc::new(FakeConnector::default());
        let publisher =
            ReconnectingPublisher::start(connector.clone(), fast_policy(), Duration::from_secs(1));

        publisher.publish(&notification()).await.unwrap();

        assert_eq!(publisher.status(), ConnectionStatus::Connected);
        let sent = connector.link(0).sent.lock().clone();
        assert_eq!(sent.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&sent[0]).unwrap();
        assert_eq!(body["type_event"], "impress");

        publisher.close().await;
    }

    #[tokio::test]
    async fn test_publish_waits_for_in_flight_campaign() {
        let connector = Arc::new(FakeConnector::default());
        connector.refuse.store(true, Ordering::SeqCst);
        let publisher =
            ReconnectingPublisher::start(connector.clone(), fast_policy(), Duration::from_secs(2));

        let refusing = connector.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            refusing.refuse.store(false, Ordering::SeqCst);
        });

        publisher.publish(&notification()).await.unwrap();
        assert!(connector.attempts.load(Ordering::SeqCst) > 1);
        assert_eq!(connector.link(0).sent.lock().len(), 1);

        publisher.close().await;
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_on_new_link() {
        let connector = Arc::new(FakeConnector::default());
        let publisher =
            ReconnectingPublisher::start(connector.clone(), fast_policy(), Duration::from_secs(1));
        eventually(|| publisher.status() == ConnectionStatus::Connected).await;

        connector.link(0).fail_sends.store(true, Ordering::SeqCst);
        publisher.publish(&notification()).await.unwrap();

        assert_eq!(connector.link_count(), 2);
        assert!(connector.link(0).sent.lock().is_empty());
        assert_eq!(connector.link(1).sent.lock().len(), 1);

        publisher.close().await;
    }

    #[tokio::test]
    async fn test_unconfirmed_send_moves_to_new_link() {
        let connector = Arc::new(FakeConnector::default());
        let publisher = ReconnectingPublisher::start(
            connector.clone(),
            fast_policy(),
            Duration::from_millis(50),
        );
        eventually(|| publisher.status() == ConnectionStatus::Connected).await;

        connector.link(0).never_confirm.store(true, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(2), publisher.publish(&notification()))
            .await
            .expect("publish must not hang on an unconfirmed send")
            .unwrap();

        assert_eq!(connector.link_count(), 2);
        assert_eq!(connector.link(1).sent.lock().len(), 1);

        publisher.close().await;
    }

    #[tokio::test]
    async fn test_broker_that_never_confirms_fails_publish_in_bounded_time() {
        let connector = Arc::new(FakeConnector::default());
        connector.silent_links.store(true, Ordering::SeqCst);
        let publisher = ReconnectingPublisher::start(
            connector.clone(),
            fast_policy(),
            Duration::from_millis(50),
        );

        let result = tokio::time::timeout(Duration::from_secs(2), publisher.publish(&notification()))
            .await
            .expect("publish must not hang on an unconfirmed send");
        assert!(matches!(result, Err(PublishError::SendTimeout(_))));

        publisher.close().await;
    }

    #[tokio::test]
    async fn test_lost_callback_triggers_reconnect() {
        let connector = Arc::new(FakeConnector::default());
        let publisher =
            ReconnectingPublisher::start(connector.clone(), fast_policy(), Duration::from_secs(1));
        eventually(|| publisher.status() == ConnectionStatus::Connected).await;

        connector.link(0).closed.store(true, Ordering::SeqCst);
        let lost = connector.lost.lock().clone().unwrap();
        lost.notify_one();

        eventually(|| connector.link_count() == 2).await;
        eventually(|| publisher.status() == ConnectionStatus::Connected).await;

        publisher.publish(&notification()).await.unwrap();
        assert_eq!(connector.link(1).sent.lock().len(), 1);

        publisher.close().await;
    }

    #[tokio::test]
    async fn test_exhausted_campaign_fails_fast_then_restarts() {
        let connector = Arc::new(FakeConnector::default());
        connector.refuse.store(true, Ordering::SeqCst);
        let policy = BackoffPolicy {
            max_elapsed_time: Duration::from_millis(40),
            ..fast_policy()
        };
        let publisher =
            ReconnectingPublisher::start(connector.clone(), policy, Duration::from_secs(1));
        eventually(|| publisher.status() == ConnectionStatus::Exhausted).await;

        // Broker is back, but nothing reconnects until someone publishes
        connector.refuse.store(false, Ordering::SeqCst);
        let attempts_before = connector.attempts.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), attempts_before);

        let result = publisher.publish(&notification()).await;
        assert!(matches!(result, Err(PublishError::ReconnectExhausted)));

        eventually(|| publisher.status() == ConnectionStatus::Connected).await;
        assert_eq!(connector.link_count(), 1);
        publisher.publish(&notification()).await.unwrap();

        publisher.close().await;
    }

    #[tokio::test]
    async fn test_publish_times_out_without_connection() {
        let connector = Arc::new(FakeConnector::default());
        connector.refuse.store(true, Ordering::SeqCst);
        let publisher = ReconnectingPublisher::start(
            connector.clone(),
            fast_policy(),
            Duration::from_millis(30),
        );

        let result = publisher.publish(&notification()).await;
        assert!(matches!(result, Err(PublishError::NotConnected(_))));

        publisher.close().await;
    }

    #[tokio::test]
    async fn test_publish_after_close_fails() {
        let connector = Arc::new(FakeConnector::default());
        let publisher =
            ReconnectingPublisher::start(connector.clone(), fast_policy(), Duration::from_secs(1));
        eventually(|| publisher.status() == ConnectionStatus::Connected).await;

        publisher.close().await;

        assert!(!connector.link(0).is_open());
        assert_eq!(publisher.status(), ConnectionStatus::Disconnected);
        let result = publisher.publish(&notification()).await;
        assert!(matches!(result, Err(PublishError::Closed)));
    }
}
