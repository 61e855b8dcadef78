//! Integration tests for the registration to activation hand-off.
//!
//! Covers what the web process puts on the queue and what the worker and the
//! activation link later make of it, without Redis or SMTP.

use chrono::{Duration, Utc};

use freshmall_core::UserId;
use freshmall_integration_tests::test_signer;
use freshmall_storefront::services::email::activation_url;
use freshmall_storefront::services::token::TokenError;
use freshmall_storefront::tasks::{MAX_RETRIES, Settlement, Task, TaskMessage, TaskStatus, settle};

fn activation_task(token: &str) -> Task {
    Task::SendRegisterActiveEmail {
        email: "alice@example.com".to_string(),
        username: "alice01".to_string(),
        token: token.to_string(),
    }
}

// =============================================================================
// Token
// =============================================================================

#[test]
fn test_token_from_queued_message_activates_user() {
    let signer = test_signer();
    let token = signer.sign(UserId::new(42));

    // The token travels through the broker as JSON
    let json = serde_json::to_string(&TaskMessage::new(activation_task(&token))).unwrap();
    let message: TaskMessage = serde_json::from_str(&json).unwrap();

    let Task::SendRegisterActiveEmail { token: queued, .. } = message.task;
    assert_eq!(signer.verify(&queued), Ok(UserId::new(42)));
}

#[test]
fn test_activation_link_is_a_single_path_segment() {
    let token = test_signer().sign(UserId::new(7));
    let url = activation_url("https://shop.example.com", &token);

    let path = url.strip_prefix("https://shop.example.com/user/active/").unwrap();
    assert_eq!(path, token);
    assert!(!path.contains('/'));
    assert!(!path.contains('?'));
}

#[test]
fn test_token_expires_after_an_hour() {
    let signer = test_signer();
    let issued = Utc::now();
    let token = signer.sign_at(UserId::new(3), issued);

    assert!(signer.verify_at(&token, issued + Duration::minutes(59)).is_ok());
    assert_eq!(
        signer.verify_at(&token, issued + Duration::minutes(61)),
        Err(TokenError::Expired)
    );
}

#[test]
fn test_token_rejected_when_tampered() {
    let signer = test_signer();
    let token = signer.sign(UserId::new(3));
    let forged = signer.sign(UserId::new(4));

    // Payload of one token with the signature of another
    let (payload, _) = forged.rsplit_once('.').unwrap();
    let (_, signature) = token.rsplit_once('.').unwrap();
    let spliced = format!("{payload}.{signature}");

    assert_eq!(signer.verify(&spliced), Err(TokenError::BadSignature));
    assert_eq!(signer.verify("garbage"), Err(TokenError::Malformed));
}

// =============================================================================
// Task envelope and retries
// =============================================================================

#[test]
fn test_task_message_wire_format() {
    let message = TaskMessage::new(activation_task("abc.def"));
    let value = serde_json::to_value(&message).unwrap();

    assert_eq!(value["task"]["name"], "send_register_active_email");
    assert_eq!(value["task"]["email"], "alice@example.com");
    assert_eq!(value["retries"], 0);
}

#[test]
fn test_failing_task_retried_then_recorded() {
    let mut message = TaskMessage::new(activation_task("abc.def"));
    let now = Utc::now();

    for attempt in 1..=MAX_RETRIES {
        match settle(message, Err("connection refused".to_string()), now) {
            Settlement::Retry(next) => {
                assert_eq!(next.retries, attempt);
                message = next;
            }
            Settlement::Done(result) => panic!("gave up early: {result:?}"),
        }
    }

    let Settlement::Done(result) = settle(message, Err("connection refused".to_string()), now)
    else {
        panic!("expected a final result");
    };
    assert_eq!(result.status, TaskStatus::Failure);
    assert_eq!(result.retries, MAX_RETRIES);
    assert_eq!(result.error.as_deref(), Some("connection refused"));
}

#[test]
fn test_successful_task_recorded() {
    let message = TaskMessage::new(activation_task("abc.def"));
    let id = message.id;

    let Settlement::Done(result) = settle(message, Ok(()), Utc::now()) else {
        panic!("expected a final result");
    };
    assert_eq!(result.id, id);
    assert_eq!(result.name, "send_register_active_email");
    assert_eq!(result.status, TaskStatus::Success);
    assert!(result.error.is_none());
}
