// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end flow over the in-memory ledger: gateway, recorder, notification
//! bus, dispatcher and reconnecting publisher wired as the daemon wires them,
//! with an in-process broker standing in for AMQP.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use rotation_core::application::notification_dispatcher::DispatchStats;
use rotation_core::application::{
    AssignmentGateway, EventRecorder, NotificationDispatcher, NotificationPublisher, RotationError,
};
use rotation_core::domain::banner::{BannerId, SlotId, UserGroupId};
use rotation_core::domain::events::{EventType, Notification};
use rotation_core::infrastructure::event_bus::NotificationBus;
use rotation_core::infrastructure::messaging::{
    BackoffPolicy, BrokerConnector, BrokerLink, PublishError, ReconnectingPublisher,
};
use rotation_core::infrastructure::repositories::InMemoryRotationRepository;

#[derive(Default)]
struct InProcessBroker {
    refuse: AtomicBool,
    delivered: Arc<Mutex<Vec<Vec<u8>>>>,
}

struct InProcessLink {
    delivered: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait]
impl BrokerConnector for InProcessBroker {
    async fn connect(&self, _lost: Arc<Notify>) -> Result<Arc<dyn BrokerLink>, PublishError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(PublishError::Broker("connection refused".to_string()));
        }
        Ok(Arc::new(InProcessLink {
            delivered: self.delivered.clone(),
        }))
    }
}

#[async_trait]
impl BrokerLink for InProcessLink {
    async fn send(&self, payload: &[u8]) -> Result<(), PublishError> {
        self.delivered.lock().push(payload.to_vec());
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }

    async fn close(&self) {}
}

struct Harness {
    gateway: AssignmentGateway,
    repo: InMemoryRotationRepository,
    publisher: Arc<ReconnectingPublisher>,
    dispatcher: tokio::task::JoinHandle<DispatchStats>,
}

impl Harness {
    fn start(broker: Arc<InProcessBroker>, publish_wait: Duration) -> Self {
        let repo = InMemoryRotationRepository::new();
        repo.register_banner(BannerId(1));
        repo.register_banner(BannerId(2));
        repo.register_slot(SlotId(1));
        repo.register_slot(SlotId(2));
        repo.register_usergroup(UserGroupId(1));

        let policy = BackoffPolicy {
            initial_interval: Duration::from_millis(5),
            multiplier: 2.0,
            max_interval: Duration::from_millis(20),
            max_elapsed_time: Duration::from_secs(10),
        };
        let publisher = Arc::new(ReconnectingPublisher::start(broker, policy, publish_wait));

        let (bus, receiver) = NotificationBus::new();
        let dispatcher = NotificationDispatcher::new(publisher.clone(), receiver)
            .start(CancellationToken::new());

        let shared = Arc::new(repo.clone());
        let gateway = AssignmentGateway::new(
            shared.clone(),
            shared.clone(),
            EventRecorder::new(shared, bus),
        );

        Self {
            gateway,
            repo,
            publisher,
            dispatcher,
        }
    }

    /// Drop the request side, wait for the dispatcher to drain, close the publisher
    async fn finish(self) -> (InMemoryRotationRepository, DispatchStats) {
        drop(self.gateway);
        let stats = self.dispatcher.await.unwrap();
        self.publisher.close().await;
        (self.repo, stats)
    }
}

#[tokio::test]
async fn every_recorded_event_produces_a_matching_notification() {
    let broker = Arc::new(InProcessBroker::default());
    let harness = Harness::start(broker.clone(), Duration::from_secs(2));

    harness.gateway.add_banner(BannerId(1), SlotId(1)).await.unwrap();
    harness.gateway.add_banner(BannerId(2), SlotId(1)).await.unwrap();
    let picked = harness
        .gateway
        .pick_banner(SlotId(1), UserGroupId(1))
        .await
        .unwrap();
    let click = harness
        .gateway
        .click_banner(picked.banner_id, SlotId(1), UserGroupId(1))
        .await
        .unwrap();

    let (repo, stats) = harness.finish().await;
    assert_eq!(stats, DispatchStats { published: 2, failed: 0 });

    let delivered: Vec<Notification> = broker
        .delivered
        .lock()
        .iter()
        .map(|payload| serde_json::from_slice(payload).unwrap())
        .collect();

    let impression = &repo.impressions()[0];
    assert_eq!(delivered[0].type_event, EventType::Impress);
    assert_eq!(delivered[0], Notification::from(impression));

    assert_eq!(delivered[1].type_event, EventType::Click);
    assert_eq!(delivered[1], Notification::from(&click));
    assert_eq!(delivered[1].date_time, repo.clicks()[0].created_at);
}

#[tokio::test]
async fn broker_outage_never_reaches_the_caller() {
    let broker = Arc::new(InProcessBroker::default());
    broker.refuse.store(true, Ordering::SeqCst);
    let harness = Harness::start(broker.clone(), Duration::from_millis(20));

    harness.gateway.add_banner(BannerId(1), SlotId(1)).await.unwrap();
    let picked = harness
        .gateway
        .pick_banner(SlotId(1), UserGroupId(1))
        .await
        .unwrap();
    assert_eq!(picked.banner_id, BannerId(1));

    let (repo, stats) = harness.finish().await;
    assert_eq!(stats, DispatchStats { published: 0, failed: 1 });
    // The committed impression stays
    assert_eq!(repo.impressions().len(), 1);
    assert!(broker.delivered.lock().is_empty());
}

#[tokio::test]
async fn pick_on_slot_without_banners_persists_nothing() {
    let broker = Arc::new(InProcessBroker::default());
    let harness = Harness::start(broker.clone(), Duration::from_secs(1));

    let err = harness
        .gateway
        .pick_banner(SlotId(2), UserGroupId(1))
        .await
        .unwrap_err();
    assert!(matches!(err, RotationError::NoBannersForSlot(SlotId(2))));

    let (repo, stats) = harness.finish().await;
    assert!(repo.impressions().is_empty());
    assert_eq!(stats, DispatchStats::default());
}

#[tokio::test]
async fn removed_banner_is_no_longer_picked() {
    let broker = Arc::new(InProcessBroker::default());
    let harness = Harness::start(broker, Duration::from_secs(1));

    harness.gateway.add_banner(BannerId(1), SlotId(1)).await.unwrap();
    harness.gateway.add_banner(BannerId(2), SlotId(1)).await.unwrap();
    harness.gateway.remove_banner(BannerId(1), SlotId(1)).await.unwrap();
    // Removing twice is still fine
    harness.gateway.remove_banner(BannerId(1), SlotId(1)).await.unwrap();

    for _ in 0..3 {
        let picked = harness
            .gateway
            .pick_banner(SlotId(1), UserGroupId(1))
            .await
            .unwrap();
        assert_eq!(picked.banner_id, BannerId(2));
    }

    let (repo, _) = harness.finish().await;
    assert_eq!(repo.rotations().len(), 1);
}

#[tokio::test]
async fn statistics_are_isolated_per_usergroup() {
    let broker = Arc::new(InProcessBroker::default());
    let harness = Harness::start(broker, Duration::from_secs(1));
    harness.repo.register_usergroup(UserGroupId(2));

    harness.gateway.add_banner(BannerId(1), SlotId(1)).await.unwrap();
    harness.gateway.add_banner(BannerId(2), SlotId(1)).await.unwrap();

    // Two impressions for banner 1 in group 1 push group 1 towards banner 2
    for _ in 0..2 {
        harness.gateway.pick_banner(SlotId(1), UserGroupId(1)).await.unwrap();
    }
    let group_one = harness.gateway.pick_banner(SlotId(1), UserGroupId(1)).await.unwrap();
    assert_eq!(group_one.banner_id, BannerId(2));

    // Group 2 has seen nothing yet
    let group_two = harness.gateway.pick_banner(SlotId(1), UserGroupId(2)).await.unwrap();
    assert_eq!(group_two.banner_id, BannerId(1));

    harness.finish().await;
}
