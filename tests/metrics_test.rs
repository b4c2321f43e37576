//! Scheduler and recorder metrics on the in-memory store.
//!
//! Installs a global meter provider, so these tests live in their own
//! test binary.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use tickwork::engine::TickScheduler;
use tickwork::model::*;
use tickwork::store::{MemoryStore, TaskStore};

fn exported_names(exporter: &InMemoryMetricExporter) -> HashSet<String> {
    exporter
        .get_finished_metrics()
        .unwrap()
        .iter()
        .flat_map(|rm| rm.scope_metrics())
        .flat_map(|sm| sm.metrics())
        .map(|m| m.name().to_string())
        .collect()
}

#[tokio::test]
async fn memory_store_records_tick_and_result_metrics() {
    let exporter = InMemoryMetricExporter::default();
    let provider = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(exporter.clone()).build())
        .build();
    opentelemetry::global::set_meter_provider(provider.clone());

    let store = Arc::new(MemoryStore::new());
    store.add_service("Service 1", "service1").await;
    store.add_team(101).await;
    store
        .configure(Utc::now() - TimeDelta::seconds(5), TimeDelta::seconds(180), 480)
        .await;

    TickScheduler::new(Arc::clone(&store))
        .step(Utc::now(), false)
        .await
        .unwrap();
    store
        .commit_result(
            CheckResult::new(ServiceId(1), NetNumber(101), 0, CheckStatus::Ok),
            Access::ReadWrite,
        )
        .await
        .unwrap();
    store
        .commit_result(
            CheckResult::new(ServiceId(1), NetNumber(999), 0, CheckStatus::Ok),
            Access::ReadWrite,
        )
        .await
        .unwrap();

    provider.force_flush().unwrap();
    let names = exported_names(&exporter);
    for name in [
        "tickwork.tick.advanced",
        "tickwork.tasks.created",
        "tickwork.results.committed",
        "tickwork.results.dropped",
    ] {
        assert!(names.contains(name), "{name} missing from {names:?}");
    }
}
