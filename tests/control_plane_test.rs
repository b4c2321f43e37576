//! Control plane loop tests on a paused tokio clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tickwork::engine::{ControlConfig, ControlPlane, TickScheduler};
use tickwork::error::Result;
use tickwork::model::{Access, Control, Service};
use tickwork::store::{ControlStore, MemoryStore};
use tokio::time::Instant;

/// Counts scheduler steps by counting control reads.
struct CountingStore {
    inner: Arc<MemoryStore>,
    steps: AtomicUsize,
}

#[async_trait]
impl ControlStore for CountingStore {
    async fn control(&self, access: Access) -> Result<Option<Control>> {
        self.steps.fetch_add(1, Ordering::SeqCst);
        self.inner.control(access).await
    }

    async fn service_by_slug(&self, slug: &str, access: Access) -> Result<Service> {
        self.inner.service_by_slug(slug, access).await
    }

    async fn advance_tick(&self, from: i64, access: Access) -> Result<u64> {
        self.inner.advance_tick(from, access).await
    }
}

async fn store_with(start_offset: TimeDelta, tick_duration: TimeDelta) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_service("Service 1", "service1").await;
    store.add_team(101).await;
    store.configure(Utc::now() - start_offset, tick_duration, 480).await;
    store
}

fn plane(store: &Arc<MemoryStore>, config: ControlConfig) -> (ControlPlane<CountingStore>, Arc<CountingStore>) {
    let counting = Arc::new(CountingStore {
        inner: Arc::clone(store),
        steps: AtomicUsize::new(0),
    });
    let plane = ControlPlane::new(TickScheduler::new(Arc::clone(&counting)), config);
    (plane, counting)
}

#[tokio::test(start_paused = true)]
async fn after_end_steps_once_per_poll_interval_and_stops_on_shutdown() {
    // Two days in with one day of valid ticks: past the end.
    let store = store_with(TimeDelta::days(2), TimeDelta::seconds(180)).await;
    store.set_current_tick(479).await.unwrap();
    let (plane, counting) = plane(&store, ControlConfig::default());

    let started = Instant::now();
    let runner = plane.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    // Steps at 0s, 60s and 120s; the third step is sleeping its 60s wait.
    tokio::time::sleep(Duration::from_secs(150)).await;
    assert_eq!(counting.steps.load(Ordering::SeqCst), 3);

    plane.shutdown();
    handle.await.unwrap().unwrap();

    assert!(started.elapsed() < Duration::from_secs(180));
    assert_eq!(counting.steps.load(Ordering::SeqCst), 3);
    assert!(store.tasks().await.is_empty());
    let control = store.control(Access::ReadOnly).await.unwrap().unwrap();
    assert_eq!(control.current_tick, 479);
}

#[tokio::test(start_paused = true)]
async fn failed_step_backs_off_before_retrying() {
    // Zero tick duration fails every step as misconfigured.
    let store = store_with(TimeDelta::seconds(5), TimeDelta::zero()).await;
    let (plane, counting) = plane(
        &store,
        ControlConfig {
            error_backoff: Duration::from_secs(10),
            ..ControlConfig::default()
        },
    );

    let runner = plane.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    // Steps at 0s, 10s, 20s and 30s.
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(counting.steps.load(Ordering::SeqCst), 4);

    plane.shutdown();
    handle.await.unwrap().unwrap();
    assert!(store.tasks().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn catches_up_then_waits_for_next_boundary() {
    // 2.5 ticks elapsed: ticks 0, 1 and 2 are due immediately.
    let store = store_with(TimeDelta::seconds(450), TimeDelta::seconds(180)).await;
    let (plane, counting) = plane(&store, ControlConfig::default());

    let runner = plane.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    // Three advancing steps with zero waits, then one step that waits
    // roughly 90s for tick 3.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(counting.steps.load(Ordering::SeqCst), 4);

    plane.shutdown();
    handle.await.unwrap().unwrap();

    let control = store.control(Access::ReadOnly).await.unwrap().unwrap();
    assert_eq!(control.current_tick, 2);
    assert_eq!(store.tasks().await.len(), 3);
}
