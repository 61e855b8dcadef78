//! Integration tests for user-facing form handling.

use freshmall_core::Pagination;
use freshmall_storefront::middleware::safe_next;
use freshmall_storefront::routes::user::{AddressForm, ORDERS_PER_PAGE};
use freshmall_storefront::services::auth::{AuthError, LoginForm, RegisterForm};

fn register_form(user_name: &str, pwd: &str, email: &str, allow: bool) -> RegisterForm {
    RegisterForm {
        user_name: Some(user_name.to_string()),
        pwd: Some(pwd.to_string()),
        email: Some(email.to_string()),
        allow: allow.then(|| "on".to_string()),
    }
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_registration_accepts_valid_form() {
    let registration = register_form("alice01", "s3cret-pass", "alice@example.com", true)
        .validate()
        .unwrap();
    assert_eq!(registration.username, "alice01");
    assert_eq!(registration.email.as_str(), "alice@example.com");
}

#[test]
fn test_registration_reports_first_failure() {
    // Missing field wins over a bad e-mail
    let form = RegisterForm {
        email: Some("not-an-email".to_string()),
        ..RegisterForm::default()
    };
    assert!(matches!(form.validate(), Err(AuthError::IncompleteData)));

    // Bad e-mail wins over a missing agreement
    let form = register_form("alice01", "s3cret-pass", "Alice@Example", false);
    assert!(matches!(form.validate(), Err(AuthError::InvalidEmail(_))));

    let form = register_form("alice01", "s3cret-pass", "alice@example.com", false);
    assert!(matches!(form.validate(), Err(AuthError::AgreementNotAccepted)));
}

#[test]
fn test_registration_error_messages_are_shown_verbatim() {
    let err = register_form("alice01", "s3cret-pass", "alice@example.com", false)
        .validate()
        .unwrap_err();
    assert!(err.is_form_error());
    assert_eq!(err.to_string(), "Please accept the user agreement");
}

#[test]
fn test_login_form_requires_both_fields() {
    let form = LoginForm {
        username: Some("alice01".to_string()),
        pwd: Some(String::new()),
        remember: None,
    };
    assert!(matches!(form.validate(), Err(AuthError::IncompleteData)));

    let form = LoginForm {
        username: Some("alice01".to_string()),
        pwd: Some("s3cret-pass".to_string()),
        remember: Some("on".to_string()),
    };
    assert!(form.validate().unwrap().remember);
}

// =============================================================================
// Address
// =============================================================================

#[test]
fn test_address_phone_rules() {
    let form = |phone: &str| AddressForm {
        receiver: Some("Li Lei".to_string()),
        addr: Some("1 Main Street".to_string()),
        zip_code: Some("100000".to_string()),
        phone: Some(phone.to_string()),
    };

    assert!(form("13812345678").validate().is_ok());
    assert!(form("15912345678").validate().is_ok());
    assert_eq!(form("1381234567").validate().unwrap_err(), "Invalid phone number");
    assert_eq!(form("16912345678").validate().unwrap_err(), "Invalid phone number");
}

#[test]
fn test_address_fits_address_columns() {
    let form = |receiver: &str, zip_code: &str| AddressForm {
        receiver: Some(receiver.to_string()),
        addr: Some("1 Main Street".to_string()),
        zip_code: Some(zip_code.to_string()),
        phone: Some("13812345678".to_string()),
    };

    assert!(form("Li Lei from the nort", "100001").validate().is_ok());
    assert_eq!(
        form("Li Lei from the north", "100001").validate().unwrap_err(),
        "Receiver must be at most 20 characters"
    );
    assert_eq!(
        form("Li Lei", "1000001").validate().unwrap_err(),
        "Invalid zip code"
    );
    // Empty zip code is optional
    assert_eq!(form("Li Lei", "").validate().unwrap().zip_code, None);
}

#[test]
fn test_registration_email_fits_user_column() {
    let email = format!("{}@example.com", "a".repeat(250));
    let err = register_form("alice01", "s3cret-pass", &email, true)
        .validate()
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidEmail(_)));
    assert!(err.is_form_error());
}

// =============================================================================
// Redirects and paging
// =============================================================================

#[test]
fn test_login_redirect_stays_on_site() {
    assert_eq!(safe_next(Some("/user/order/2")), "/user/order/2");
    assert_eq!(safe_next(Some("https://evil.example.com")), "/");
    assert_eq!(safe_next(Some("//evil.example.com")), "/");
    assert_eq!(safe_next(None), "/");
}

#[test]
fn test_order_pages() {
    // Five orders at two per page
    let page = |requested| Pagination::new(requested, 5, ORDERS_PER_PAGE);

    assert_eq!(page(None).num_pages, 3);
    assert_eq!(page(Some(3)).offset(), 4);
    assert_eq!(page(Some(4)).page, 1);
    assert_eq!(page(Some(2)).window(), vec![1, 2, 3]);
}
