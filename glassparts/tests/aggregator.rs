//! Availability aggregation tests with an in-memory transport

use async_trait::async_trait;
use glassparts::{Credentials, GlassPartsClient, SoapTransport, TransportResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted response for one depot
#[derive(Clone)]
enum DepotReply {
    Available(i64),
    Unavailable,
    TimedOut,
    Refused(&'static str),
}

/// Fake service answering `GetDepots` and `CheckAvailability` from a script
struct ScriptedService {
    depots: Vec<(&'static str, &'static str)>,
    replies: HashMap<&'static str, DepotReply>,
    depots_fail: bool,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn new(depots: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            depots,
            replies: HashMap::new(),
            depots_fail: false,
            delay: Duration::from_millis(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn reply(mut self, depot: &'static str, reply: DepotReply) -> Self {
        self.replies.insert(depot, reply);
        self
    }

    fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == operation)
            .count()
    }

    fn depots_body(&self) -> String {
        let depots: String = self
            .depots
            .iter()
            .map(|(code, name)| {
                format!("<Depot><DepotCode>{code}</DepotCode><DepotName>{name}</DepotName></Depot>")
            })
            .collect();
        format!("<GetDepotsResult><Status>Success</Status>{depots}</GetDepotsResult>")
    }

    async fn availability(&self, envelope: &str) -> TransportResult {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let depot = envelope
            .split("<Depot>")
            .nth(1)
            .and_then(|rest| rest.split("</Depot>").next())
            .unwrap_or_default();

        match self.replies.get(depot).cloned().unwrap_or(DepotReply::Unavailable) {
            DepotReply::Available(qty) => TransportResult::ok(
                200,
                format!(
                    "<Status>Success</Status><IsAvailable>true</IsAvailable><AvailableQty>{qty}</AvailableQty>"
                ),
            ),
            DepotReply::Unavailable => TransportResult::ok(
                200,
                "<Status>Success</Status><IsAvailable>false</IsAvailable><AvailableQty>0</AvailableQty>",
            ),
            DepotReply::TimedOut => TransportResult::timeout(),
            DepotReply::Refused(message) => TransportResult::ok(
                200,
                format!("<Status>Failed</Status><ErrorMessage>{message}</ErrorMessage>"),
            ),
        }
    }
}

#[async_trait]
impl SoapTransport for ScriptedService {
    async fn send(&self, operation: &str, _namespace: &str, envelope: String) -> TransportResult {
        self.calls.lock().unwrap().push(operation.to_string());
        match operation {
            "GetDepots" if self.depots_fail => TransportResult::http_status(503, ""),
            "GetDepots" => TransportResult::ok(200, self.depots_body()),
            "CheckAvailability" => self.availability(&envelope).await,
            other => TransportResult::failed(format!("unexpected operation {other}")),
        }
    }
}

fn credentials() -> Credentials {
    Credentials::new("workshop", "secret", 42)
}

#[tokio::test]
async fn test_total_counts_only_available_depots() {
    let service = ScriptedService::new(vec![
        ("BIR", "Birmingham"),
        ("LDS", "Leeds"),
        ("MAN", "Manchester"),
        ("GLA", "Glasgow"),
    ])
    .reply("BIR", DepotReply::Available(3))
    .reply("LDS", DepotReply::TimedOut)
    .reply("MAN", DepotReply::Unavailable)
    .reply("GLA", DepotReply::Available(4));

    let client = GlassPartsClient::with_transport(service, credentials());
    let aggregate = client
        .aggregate_availability("2448AGNMV1B", 1, None)
        .await
        .unwrap();

    assert_eq!(aggregate.argic_code, "2448AGNMV1B");
    assert_eq!(aggregate.total_qty, 7);

    let codes: Vec<&str> = aggregate
        .depots
        .iter()
        .filter_map(|outcome| outcome.depot.as_ref())
        .map(|depot| depot.depot_code.as_str())
        .collect();
    assert_eq!(codes, vec!["BIR", "GLA"]);
    assert_eq!(aggregate.depots[0].depot.as_ref().unwrap().depot_name, "Birmingham");
    assert!(aggregate.depots.iter().all(|outcome| outcome.is_available));

    assert_eq!(aggregate.failures.len(), 1);
    let failure = &aggregate.failures[0];
    assert_eq!(failure.depot.as_ref().unwrap().depot_code, "LDS");
    assert!(failure.error.as_deref().unwrap().contains("timed out"));

    assert_eq!(client.transport().calls("GetDepots"), 1);
    assert_eq!(client.transport().calls("CheckAvailability"), 4);
}

#[tokio::test]
async fn test_total_saturates_on_huge_quantities() {
    let service = ScriptedService::new(vec![("BIR", "Birmingham"), ("LDS", "Leeds")])
        .reply("BIR", DepotReply::Available(i64::MAX))
        .reply("LDS", DepotReply::Available(i64::MAX));

    let client = GlassPartsClient::with_transport(service, credentials());
    let aggregate = client
        .aggregate_availability("2448AGNMV1B", 1, None)
        .await
        .unwrap();

    assert_eq!(aggregate.total_qty, i64::MAX);
    assert_eq!(aggregate.depots.len(), 2);
    assert!(aggregate.depots.iter().all(|outcome| outcome.qty == i64::MAX));
    assert!(aggregate.failures.is_empty());
}

#[tokio::test]
async fn test_refused_depot_reported_as_failure() {
    let service = ScriptedService::new(vec![("BIR", "Birmingham"), ("LDS", "Leeds")])
        .reply("BIR", DepotReply::Refused("Depot closed"))
        .reply("LDS", DepotReply::Available(2));

    let client = GlassPartsClient::with_transport(service, credentials());
    let aggregate = client
        .aggregate_availability("2448AGNMV1B", 2, None)
        .await
        .unwrap();

    assert_eq!(aggregate.total_qty, 2);
    assert_eq!(aggregate.failures.len(), 1);
    assert_eq!(
        aggregate.failures[0].error.as_deref(),
        Some("CheckAvailability failed: Depot closed")
    );
}

#[tokio::test]
async fn test_depot_filter_skips_depot_list() {
    let service = ScriptedService::new(vec![("BIR", "Birmingham"), ("LDS", "Leeds")])
        .reply("LDS", DepotReply::Available(6));

    let client = GlassPartsClient::with_transport(service, credentials());

    let aggregate = client
        .aggregate_availability("2448AGNMV1B", 1, Some("LDS"))
        .await
        .unwrap();
    assert_eq!(aggregate.total_qty, 6);
    assert_eq!(aggregate.depots.len(), 1);
    assert_eq!(aggregate.depots[0].depot.as_ref().unwrap().depot_code, "LDS");

    let empty = client
        .aggregate_availability("2448AGNMV1B", 1, Some("BIR"))
        .await
        .unwrap();
    assert!(empty.depots.is_empty());
    assert!(empty.failures.is_empty());
    assert_eq!(empty.total_qty, 0);

    assert_eq!(client.transport().calls("GetDepots"), 0);
    assert_eq!(client.transport().calls("CheckAvailability"), 2);
}

#[tokio::test]
async fn test_depot_list_failure_fails_aggregate() {
    let mut service = ScriptedService::new(vec![("BIR", "Birmingham")]);
    service.depots_fail = true;

    let client = GlassPartsClient::with_transport(service, credentials());
    let err = client
        .aggregate_availability("2448AGNMV1B", 1, None)
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(client.transport().calls("CheckAvailability"), 0);
}

#[tokio::test]
async fn test_fan_out_is_bounded() {
    let depots = vec![
        ("D1", "One"),
        ("D2", "Two"),
        ("D3", "Three"),
        ("D4", "Four"),
        ("D5", "Five"),
        ("D6", "Six"),
    ];
    let mut service = ScriptedService::new(depots).delay(Duration::from_millis(20));
    for code in ["D1", "D2", "D3", "D4", "D5", "D6"] {
        service = service.reply(code, DepotReply::Available(1));
    }

    let client = GlassPartsClient::with_transport(service, credentials()).with_max_concurrency(2);
    let aggregate = client
        .aggregate_availability("2448AGNMV1B", 1, None)
        .await
        .unwrap();

    assert_eq!(aggregate.total_qty, 6);
    let max_seen = client.transport().max_in_flight.load(Ordering::SeqCst);
    assert!(max_seen >= 1 && max_seen <= 2, "max in flight was {max_seen}");
}

#[tokio::test]
async fn test_invalid_aggregate_input() {
    let client = GlassPartsClient::with_transport(ScriptedService::new(vec![]), credentials());

    assert!(client.aggregate_availability("", 1, None).await.is_err());
    assert!(client.aggregate_availability("2448AGNMV1B", 0, None).await.is_err());
    assert!(client
        .aggregate_availability("2448AGNMV1B", 1, Some("  "))
        .await
        .is_err());
    assert!(client.transport().calls.lock().unwrap().is_empty());
}
