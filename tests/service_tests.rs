//! # Print Service Tests
//!
//! Job lifecycle against the in-memory spooler: ordering, cancellation,
//! timeouts and link loss.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use recibo::document::{self, ReceiptDocument};
use recibo::encoder::decode_raster;
use recibo::job::{FailureReason, JobState, PrintMode, PrintRequest, PrintService, ServiceConfig};
use recibo::printer::{Capabilities, PrinterEndpoint, PrinterProfile};
use recibo::raster::Threshold;
use recibo::session::{SessionConfig, SessionState};
use recibo::transport::VirtualSpooler;
use recibo::transport::memory::Behavior;
use tokio::time::Instant;

fn service(spooler: &VirtualSpooler, config: ServiceConfig) -> PrintService {
    PrintService::new(Arc::new(spooler.clone()), config)
}

fn receipt(number: &str) -> ReceiptDocument {
    let mut doc = document::demo_sale();
    doc.meta.number = number.to_string();
    doc
}

fn request(number: &str, endpoint: &str) -> PrintRequest {
    PrintRequest::new(receipt(number))
        .with_profile(PrinterProfile::escpos_80())
        .to_endpoint(endpoint)
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}

/// Receipt numbers found in the streams, in arrival order.
fn arrival_order(streams: &[(String, Vec<u8>)], numbers: &[&str]) -> Vec<String> {
    streams
        .iter()
        .filter_map(|(_, data)| numbers.iter().find(|n| contains(data, n)))
        .map(|n| n.to_string())
        .collect()
}

#[tokio::test]
async fn test_job_succeeds() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    let service = service(&spooler, ServiceConfig::default());

    let job = service.print(request("R-1", "front"));
    let outcome = job.wait().await;

    assert_eq!(outcome.state, JobState::Succeeded);
    assert_eq!(outcome.endpoint_id.as_deref(), Some("front"));
    assert_eq!(outcome.id, job.id());

    let received = spooler.received("front");
    assert_eq!(received.len(), 1);
    assert_eq!(outcome.bytes, received[0].len());
    assert!(contains(&received[0], "R-1"));
    assert_eq!(*service.session_state().borrow(), SessionState::Connected);
}

#[tokio::test]
async fn test_jobs_for_one_endpoint_print_in_call_order() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    spooler.set_submit(Behavior::Delay(Duration::from_millis(20)));
    let service = service(&spooler, ServiceConfig::default());

    let numbers = ["R-1", "R-2", "R-3", "R-4", "R-5"];
    let jobs: Vec<_> = numbers
        .iter()
        .enumerate()
        .map(|(i, n)| {
            // alternate text and raster so preparation times differ
            let mut req = request(n, "front");
            if i % 2 == 0 {
                req = req.with_mode(PrintMode::Raster {
                    threshold: Threshold::Fixed,
                });
            }
            service.print(req)
        })
        .collect();

    for job in &jobs {
        assert!(job.wait().await.is_success());
    }

    // Raster streams carry no text, so check the text jobs and the total
    assert_eq!(spooler.received("front").len(), 5);
    assert_eq!(
        arrival_order(&spooler.log(), &numbers),
        vec!["R-2".to_string(), "R-4".to_string()]
    );
    let kinds: Vec<bool> = spooler
        .received("front")
        .iter()
        .map(|data| !decode_raster(data).is_empty())
        .collect();
    assert_eq!(kinds, vec![true, false, true, false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_endpoints_do_not_wait_for_each_other() {
    let spooler = VirtualSpooler::with_endpoints(&["bar", "kitchen"]);
    spooler.set_submit(Behavior::Delay(Duration::from_secs(5)));
    let service = service(&spooler, ServiceConfig::default());

    let start = Instant::now();
    let bar: Vec<_> = ["B-1", "B-2", "B-3"]
        .iter()
        .map(|n| service.print(request(n, "bar")))
        .collect();
    let kitchen = service.print(request("K-1", "kitchen"));

    // the kitchen write overlaps the first bar write
    assert!(kitchen.wait().await.is_success());
    assert_eq!(start.elapsed(), Duration::from_secs(5));

    for job in &bar {
        assert!(job.wait().await.is_success());
    }
    assert_eq!(start.elapsed(), Duration::from_secs(15));
    assert_eq!(spooler.received("bar").len(), 3);
    assert_eq!(spooler.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_queued_jobs_fail_within_device_wait() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    spooler.set_connect(Behavior::Hang);
    let device_wait = Duration::from_secs(5);
    let service = service(
        &spooler,
        ServiceConfig {
            device_wait,
            ..ServiceConfig::default()
        },
    );

    let start = Instant::now();
    let jobs: Vec<_> = ["R-1", "R-2", "R-3"]
        .iter()
        .map(|n| service.print(request(n, "front")))
        .collect();

    for job in &jobs {
        let outcome = job.wait().await;
        assert!(
            matches!(outcome.failure(), Some(FailureReason::DeviceUnavailable(_))),
            "{:?}",
            outcome
        );
    }
    assert!(start.elapsed() <= device_wait, "took {:?}", start.elapsed());
    assert_eq!(spooler.opens(), 0);
}

#[tokio::test]
async fn test_cancel_while_queued_sends_nothing() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    spooler.set_submit(Behavior::Delay(Duration::from_millis(300)));
    let service = service(&spooler, ServiceConfig::default());

    let first = service.print(request("R-1", "front"));
    let second = service.print(request("R-2", "front"));

    let mut states = first.subscribe();
    states
        .wait_for(|s| *s == JobState::Submitting || s.is_terminal())
        .await
        .unwrap();
    assert!(second.cancel());

    let outcome = second.wait().await;
    assert_eq!(outcome.failure(), Some(&FailureReason::Cancelled));
    assert!(first.wait().await.is_success());

    let received = spooler.received("front");
    assert_eq!(received.len(), 1);
    assert!(contains(&received[0], "R-1"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting_for_device() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    spooler.set_connect(Behavior::Hang);
    let service = service(
        &spooler,
        ServiceConfig {
            device_wait: Duration::from_secs(60),
            ..ServiceConfig::default()
        },
    );

    let job = service.print(request("R-1", "front"));
    job.subscribe()
        .wait_for(|s| *s == JobState::Encoding)
        .await
        .unwrap();

    assert!(job.cancel());
    assert_eq!(job.wait().await.failure(), Some(&FailureReason::Cancelled));
    assert_eq!(spooler.opens(), 0);
    assert!(spooler.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ack_timeout() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    spooler.set_submit(Behavior::Hang);
    let service = service(
        &spooler,
        ServiceConfig {
            session: SessionConfig {
                ack_timeout: Duration::from_secs(2),
                ..SessionConfig::default()
            },
            ..ServiceConfig::default()
        },
    );

    let outcome = service.print(request("R-1", "front")).wait().await;
    let reason = outcome.failure().unwrap();
    assert_eq!(reason, &FailureReason::AckTimeout(Duration::from_secs(2)));
    assert!(reason.is_retryable());
    assert!(reason.may_have_printed());

    // The abandoned link is replaced for the next job
    spooler.set_submit(Behavior::Ready);
    assert!(service.print(request("R-2", "front")).wait().await.is_success());
    assert_eq!(spooler.opens(), 2);
}

#[tokio::test]
async fn test_link_loss_fails_job_and_reconnects() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    let service = service(&spooler, ServiceConfig::default());
    service.connect().await.unwrap();

    spooler.drop_next_submits(1);
    let outcome = service.print(request("R-1", "front")).wait().await;
    match outcome.failure() {
        Some(reason @ FailureReason::Transport { link_lost: true, .. }) => {
            assert!(reason.may_have_printed());
        }
        other => panic!("expected transport failure, got {:?}", other),
    }

    // no resubmission, and the session is usable again
    assert!(spooler.log().is_empty());
    assert_eq!(service.health().await.reconnects, 1);
    assert!(service.print(request("R-2", "front")).wait().await.is_success());
    assert_eq!(spooler.received("front").len(), 1);
}

#[tokio::test]
async fn test_endpoint_selection() {
    let spooler = VirtualSpooler::with_endpoints(&["front", "back"]);

    let no_default = service(&spooler, ServiceConfig::default());
    let job = no_default.print(PrintRequest::new(receipt("R-1")));
    assert_eq!(job.state(), JobState::Failed(FailureReason::NoPrinterSelected));
    assert_eq!(job.wait().await.endpoint_id, None);

    let unknown = no_default.print(request("R-2", "upstairs")).wait().await;
    assert_eq!(
        unknown.failure(),
        Some(&FailureReason::UnknownEndpoint("upstairs".into()))
    );

    let with_default = service(
        &spooler,
        ServiceConfig {
            default_endpoint: Some("back".into()),
            ..ServiceConfig::default()
        },
    );
    let outcome = with_default.print(PrintRequest::new(receipt("R-3"))).wait().await;
    assert!(outcome.is_success());
    assert_eq!(outcome.endpoint_id.as_deref(), Some("back"));
    assert_eq!(spooler.received("back").len(), 1);
    assert!(spooler.received("front").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_printer_is_device_unavailable() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    spooler.set_connect(Behavior::Hang);
    let service = service(
        &spooler,
        ServiceConfig {
            device_wait: Duration::from_secs(5),
            ..ServiceConfig::default()
        },
    );

    let outcome = service.print(request("R-1", "front")).wait().await;
    let reason = outcome.failure().unwrap();
    assert!(matches!(reason, FailureReason::DeviceUnavailable(_)));
    assert!(reason.is_retryable());
    assert!(!reason.may_have_printed());
    assert_eq!(service.health().await.state, SessionState::Failed);
}

#[tokio::test]
async fn test_raster_on_text_endpoint_is_encode_failure() {
    let spooler = VirtualSpooler::new(vec![PrinterEndpoint {
        id: "receipt".into(),
        display_name: "Impact printer".into(),
        capabilities: Capabilities {
            max_width: 576,
            supports_raster: false,
            supports_cut: true,
        },
    }]);
    let service = service(&spooler, ServiceConfig::default());

    let outcome = service
        .print(request("R-1", "receipt").with_mode(PrintMode::Raster {
            threshold: Threshold::Bayer,
        }))
        .wait()
        .await;
    assert!(matches!(outcome.failure(), Some(FailureReason::Encode(_))));
    assert!(spooler.log().is_empty());

    // the same endpoint still takes text jobs
    assert!(service.print(request("R-2", "receipt")).wait().await.is_success());
}

#[tokio::test]
async fn test_raster_job_stream_decodes() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    let service = service(&spooler, ServiceConfig::default());

    let outcome = service
        .print(
            PrintRequest::new(document::demo_layby_completed())
                .with_profile(PrinterProfile::tsp650ii().with_copies(2))
                .to_endpoint("front")
                .with_mode(PrintMode::Raster {
                    threshold: Threshold::Fixed,
                }),
        )
        .wait()
        .await;
    assert!(outcome.is_success());

    let frames = decode_raster(&spooler.received("front")[0]);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].width, 576);
    assert_eq!(frames[0], frames[1]);
}

#[tokio::test]
async fn test_single_terminal_transition() {
    let spooler = VirtualSpooler::with_endpoints(&["front"]);
    let service = service(&spooler, ServiceConfig::default());

    let job = service.print(request("R-1", "front"));
    let mut states = job.subscribe();
    let observer = tokio::spawn(async move {
        let mut seen = vec![states.borrow_and_update().clone()];
        while !seen.last().is_some_and(JobState::is_terminal) && states.changed().await.is_ok() {
            seen.push(states.borrow_and_update().clone());
        }
        seen
    });

    assert!(job.wait().await.is_success());
    assert!(!job.cancel());
    assert_eq!(job.state(), JobState::Succeeded);

    let seen = observer.await.unwrap();
    assert_eq!(seen.iter().filter(|s| s.is_terminal()).count(), 1);
    assert_eq!(seen.last(), Some(&JobState::Succeeded));
}
