//! ntfy transport against a local mock server.

use chargewatch_engine::{Notification, Notifier, NotifyError, SLOT_COUNT, SlotState};
use chargewatch_service::NtfyNotifier;
use std::error::Error;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = Result<(), Box<dyn Error>>;

fn slot_five_full() -> Notification {
    let mut states = [SlotState::Empty; SLOT_COUNT];
    states[4] = SlotState::Full;
    Notification::slot_full(4, &states)
}

#[tokio::test]
async fn test_posts_plain_text_body_with_title() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bc211"))
        .and(header("content-type", "text/plain; charset=utf-8"))
        .and(header("title", "BC-211 Slot 5 FULL"))
        .and(body_string(
            "BC-211 Slot 5 FULL\nCurrent states: S1=EMPTY, S2=EMPTY, S3=EMPTY, S4=EMPTY, S5=FULL, S6=EMPTY",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = NtfyNotifier::new(format!("{}/bc211", server.uri()))?;
    notifier.notify(&slot_five_full()).await?;
    Ok(())
}

#[tokio::test]
async fn test_error_status_is_reported() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let notifier = NtfyNotifier::new(format!("{}/bc211", server.uri()))?;
    let result = notifier.notify(&slot_five_full()).await;
    assert_eq!(result, Err(NotifyError::Status(429)));
    Ok(())
}

#[tokio::test]
async fn test_slow_endpoint_times_out() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let notifier =
        NtfyNotifier::with_timeout(format!("{}/bc211", server.uri()), Duration::from_millis(100))?;
    let result = notifier.notify(&slot_five_full()).await;
    assert!(matches!(result, Err(NotifyError::Transport(_))));
    Ok(())
}
