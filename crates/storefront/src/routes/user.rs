//! User account route handlers.
//!
//! Registration, activation, login/logout, the user centre, addresses and
//! the order list.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tower_sessions::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use tracing::instrument;

use freshmall_core::{Pagination, Phone};

use super::goods::SkuCard;
use crate::db::{AddressRepository, GoodsRepository, OrderRepository};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{MaybeUser, RequireLogin, clear_session, safe_next, set_current_user};
use crate::models::address::NewAddress;
use crate::models::{Address, CurrentUser, Order};
use crate::services::auth::{AuthError, AuthService, LoginForm, RegisterForm};
use crate::services::token::TokenError;
use crate::state::AppState;
use crate::storage::MediaStorage;
use crate::tasks::Task;

/// Cookie remembering the last username for the login form.
pub const USERNAME_COOKIE: &str = "username";

/// How long the username cookie is kept.
const USERNAME_COOKIE_DAYS: i64 = 7;

/// Orders shown per page.
pub const ORDERS_PER_PAGE: u32 = 2;

/// Column widths of `freshmall.address`, in characters.
const RECEIVER_MAX_CHARS: usize = 20;
const ADDR_MAX_CHARS: usize = 256;
const ZIP_CODE_DIGITS: usize = 6;

// =============================================================================
// Form Types
// =============================================================================

/// Query string of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// New address form data.
#[derive(Debug, Default, Deserialize)]
pub struct AddressForm {
    pub receiver: Option<String>,
    pub addr: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
}

impl AddressForm {
    /// Validate the form into a new address.
    ///
    /// # Errors
    ///
    /// Returns the message to show on the page.
    pub fn validate(&self) -> std::result::Result<NewAddress, &'static str> {
        let field = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        let (Some(receiver), Some(addr), Some(phone)) =
            (field(&self.receiver), field(&self.addr), field(&self.phone))
        else {
            return Err("Incomplete address");
        };

        if receiver.chars().count() > RECEIVER_MAX_CHARS {
            return Err("Receiver must be at most 20 characters");
        }
        if addr.chars().count() > ADDR_MAX_CHARS {
            return Err("Address must be at most 256 characters");
        }

        let zip_code = field(&self.zip_code);
        if let Some(zip) = &zip_code
            && !(zip.len() == ZIP_CODE_DIGITS && zip.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err("Invalid zip code");
        }

        let phone = Phone::parse(&phone).map_err(|_| "Invalid phone number")?;

        Ok(NewAddress {
            receiver,
            addr,
            zip_code,
            phone,
        })
    }
}

// =============================================================================
// View Types
// =============================================================================

/// Address display data for templates.
#[derive(Debug, Clone)]
pub struct AddressView {
    pub receiver: String,
    pub addr: String,
    pub zip_code: String,
    pub phone: String,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        Self {
            receiver: address.receiver.clone(),
            addr: address.addr.clone(),
            zip_code: address.zip_code.clone().unwrap_or_default(),
            phone: address.phone.to_string(),
        }
    }
}

/// Order line display data.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub image_url: Option<String>,
    pub unite: String,
    pub price: String,
    pub count: i32,
    pub amount: String,
}

/// Order display data.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub order_id: String,
    pub created_at: String,
    pub status: &'static str,
    pub pay_method: &'static str,
    pub total: String,
    pub transit_price: String,
    pub lines: Vec<OrderLineView>,
}

impl OrderView {
    fn new(order: &Order, storage: &MediaStorage) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            created_at: order.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            status: order.status.label(),
            pay_method: order.pay_method.label(),
            total: order.total_payable().to_string(),
            transit_price: order.transit_price.to_string(),
            lines: order
                .lines
                .iter()
                .map(|line| OrderLineView {
                    name: line.sku_name.clone(),
                    image_url: (!line.sku_image.is_empty()).then(|| storage.url(&line.sku_image)),
                    unite: line.sku_unite.clone(),
                    price: line.price.to_string(),
                    count: line.count,
                    amount: line.amount().to_string(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "user/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub errmsg: Option<String>,
    pub user_name: String,
    pub email: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "user/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub errmsg: Option<String>,
    pub username: String,
    pub remember: bool,
    /// Form target, carrying `next` through.
    pub action: String,
}

/// Standalone message page (activation failures).
#[derive(Template, WebTemplate)]
#[template(path = "user/message.html")]
pub struct MessageTemplate {
    pub user: Option<CurrentUser>,
    pub title: &'static str,
    pub message: &'static str,
}

/// User centre: profile and recent views.
#[derive(Template, WebTemplate)]
#[template(path = "user/user_center_info.html")]
pub struct InfoTemplate {
    pub user: Option<CurrentUser>,
    pub page: &'static str,
    pub username: String,
    pub address: Option<AddressView>,
    pub history: Vec<SkuCard>,
}

/// User centre: address page.
#[derive(Template, WebTemplate)]
#[template(path = "user/user_center_site.html")]
pub struct AddressTemplate {
    pub user: Option<CurrentUser>,
    pub page: &'static str,
    pub address: Option<AddressView>,
    pub errmsg: Option<String>,
}

/// User centre: order list.
#[derive(Template, WebTemplate)]
#[template(path = "user/user_center_order.html")]
pub struct OrdersTemplate {
    pub user: Option<CurrentUser>,
    pub page: &'static str,
    pub orders: Vec<OrderView>,
    pub pagination: Pagination,
    pub pages: Vec<u32>,
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
pub async fn register_page(MaybeUser(user): MaybeUser) -> RegisterTemplate {
    RegisterTemplate {
        user,
        errmsg: None,
        user_name: String::new(),
        email: String::new(),
    }
}

/// Handle registration form submission.
///
/// Creates an inactive user and queues the activation email.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let rerender = |err: &AuthError| RegisterTemplate {
        user: user.clone(),
        errmsg: Some(err.to_string()),
        user_name: form.user_name.clone().unwrap_or_default(),
        email: form.email.clone().unwrap_or_default(),
    };

    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(e) => return Ok(rerender(&e).into_response()),
    };

    let new_user = match AuthService::new(state.pool()).register(&registration).await {
        Ok(new_user) => new_user,
        Err(e) if e.is_form_error() => return Ok(rerender(&e).into_response()),
        Err(e) => return Err(e.into()),
    };

    let token = state.signer().sign(new_user.id);
    let task = Task::SendRegisterActiveEmail {
        email: new_user.email.to_string(),
        username: new_user.username.clone(),
        token,
    };
    if let Err(e) = state.tasks().enqueue(task).await {
        let event_id = sentry::capture_error(&e);
        tracing::error!(
            error = %e,
            user_id = %new_user.id,
            sentry_event_id = %event_id,
            "Failed to queue activation email"
        );
    }

    Ok(Redirect::to("/").into_response())
}

/// Activate an account from the emailed link.
#[instrument(skip_all)]
pub async fn activate(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
) -> Result<Response> {
    let user_id = match state.signer().verify(&token) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::info!(error = %e, "Rejected activation token");
            let message = match e {
                TokenError::Expired => "Activation link has expired",
                TokenError::Malformed | TokenError::BadSignature => "Invalid activation link",
            };
            let page = MessageTemplate {
                user,
                title: "Activation failed",
                message,
            };
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };

    AuthService::new(state.pool()).activate(user_id).await?;

    Ok(Redirect::to("/user/login").into_response())
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page, prefilled from the username cookie.
pub async fn login_page(
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
    headers: HeaderMap,
) -> LoginTemplate {
    let remembered = remembered_username(&headers);

    LoginTemplate {
        user,
        errmsg: None,
        remember: remembered.is_some(),
        username: remembered.unwrap_or_default(),
        action: login_action(query.next.as_deref()),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let rerender = |err: &AuthError| LoginTemplate {
        user: user.clone(),
        errmsg: Some(err.to_string()),
        username: form.username.clone().unwrap_or_default(),
        remember: form.remember.as_deref() == Some("on"),
        action: login_action(query.next.as_deref()),
    };

    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(e) => return Ok(rerender(&e).into_response()),
    };

    let account = match AuthService::new(state.pool()).login(&credentials).await {
        Ok(account) => account,
        Err(e) if e.is_form_error() => return Ok(rerender(&e).into_response()),
        Err(e) => return Err(e.into()),
    };

    let current = CurrentUser {
        id: account.id,
        username: account.username,
    };
    set_current_user(&session, &current).await?;
    set_sentry_user(&current.id, &current.username);
    tracing::info!(user_id = %current.id, "User logged in");

    let mut response = Redirect::to(safe_next(query.next.as_deref())).into_response();
    let cookie = username_cookie(credentials.remember.then_some(current.username.as_str()));
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    Ok(response)
}

/// Log out and go back to the index page.
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_session(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

/// Login form target preserving a `next` parameter.
fn login_action(next: Option<&str>) -> String {
    match next.filter(|n| !n.is_empty()) {
        Some(next) => format!("/user/login?next={}", urlencoding::encode(next)),
        None => "/user/login".to_string(),
    }
}

/// The remember-me cookie: set to `username`, or expired when `None`.
fn username_cookie(username: Option<&str>) -> Cookie<'static> {
    let (value, max_age) = match username {
        Some(name) => (
            urlencoding::encode(name).into_owned(),
            CookieDuration::days(USERNAME_COOKIE_DAYS),
        ),
        None => (String::new(), CookieDuration::ZERO),
    };

    Cookie::build((USERNAME_COOKIE, value))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Username saved by a previous "remember me" login.
fn remembered_username(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(std::result::Result::ok)
        .find(|cookie| cookie.name() == USERNAME_COOKIE)
        .and_then(|cookie| urlencoding::decode(cookie.value()).ok().map(|v| v.into_owned()))
        .filter(|name| !name.is_empty())
}

// =============================================================================
// User Centre
// =============================================================================

/// User centre: profile, default address and recently viewed SKUs.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn info(State(state): State<AppState>, RequireLogin(current): RequireLogin) -> Result<InfoTemplate> {
    let address = AddressRepository::new(state.pool())
        .get_default(current.id)
        .await?;

    let recent = state.history().recent(current.id).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read browsing history");
        Vec::new()
    });
    let skus = GoodsRepository::new(state.pool()).get_skus(&recent).await?;

    Ok(InfoTemplate {
        page: "user",
        username: current.username.clone(),
        address: address.as_ref().map(AddressView::from),
        history: skus
            .iter()
            .map(|sku| SkuCard::new(sku, state.storage()))
            .collect(),
        user: Some(current),
    })
}

/// Address page.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn address_page(
    State(state): State<AppState>,
    RequireLogin(current): RequireLogin,
) -> Result<AddressTemplate> {
    let address = AddressRepository::new(state.pool())
        .get_default(current.id)
        .await?;

    Ok(AddressTemplate {
        user: Some(current),
        page: "address",
        address: address.as_ref().map(AddressView::from),
        errmsg: None,
    })
}

/// Add an address, then redirect back to the address page.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn add_address(
    State(state): State<AppState>,
    RequireLogin(current): RequireLogin,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let addresses = AddressRepository::new(state.pool());

    let new_address = match form.validate() {
        Ok(new_address) => new_address,
        Err(errmsg) => {
            let address = addresses.get_default(current.id).await?;
            return Ok(AddressTemplate {
                user: Some(current),
                page: "address",
                address: address.as_ref().map(AddressView::from),
                errmsg: Some(errmsg.to_string()),
            }
            .into_response());
        }
    };

    let address = addresses.create(current.id, &new_address).await?;
    tracing::info!(address_id = %address.id, is_default = address.is_default, "Address added");

    Ok(Redirect::to("/user/address").into_response())
}

/// First page of the order list.
pub async fn orders(
    State(state): State<AppState>,
    RequireLogin(current): RequireLogin,
) -> Result<OrdersTemplate> {
    order_page(&state, current, None).await
}

/// A given page of the order list. Invalid page numbers show page 1.
pub async fn orders_page(
    State(state): State<AppState>,
    RequireLogin(current): RequireLogin,
    Path(page): Path<String>,
) -> Result<OrdersTemplate> {
    order_page(&state, current, page.parse::<u32>().ok()).await
}

#[instrument(skip(state, current), fields(user_id = %current.id))]
async fn order_page(
    state: &AppState,
    current: CurrentUser,
    requested: Option<u32>,
) -> Result<OrdersTemplate> {
    let repo = OrderRepository::new(state.pool());
    let total = repo.count_for_user(current.id).await?;
    let pagination = Pagination::new(requested, total, ORDERS_PER_PAGE);

    let orders = repo
        .page_for_user(current.id, pagination.limit(), pagination.offset())
        .await?;

    Ok(OrdersTemplate {
        user: Some(current),
        page: "order",
        orders: orders
            .iter()
            .map(|order| OrderView::new(order, state.storage()))
            .collect(),
        pages: pagination.window(),
        pagination,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address_form(receiver: &str, addr: &str, phone: &str) -> AddressForm {
        AddressForm {
            receiver: Some(receiver.to_string()),
            addr: Some(addr.to_string()),
            zip_code: Some(String::new()),
            phone: Some(phone.to_string()),
        }
    }

    #[test]
    fn test_address_form_valid() {
        let address = address_form("Li Lei", "1 Main Street", "13812345678")
            .validate()
            .unwrap();
        assert_eq!(address.receiver, "Li Lei");
        assert_eq!(address.zip_code, None);
        assert_eq!(address.phone.as_str(), "13812345678");
    }

    #[test]
    fn test_address_form_errors() {
        assert_eq!(
            address_form("", "1 Main Street", "13812345678").validate().unwrap_err(),
            "Incomplete address"
        );
        assert_eq!(
            AddressForm::default().validate().unwrap_err(),
            "Incomplete address"
        );
        assert_eq!(
            address_form("Li Lei", "1 Main Street", "12812345678")
                .validate()
                .unwrap_err(),
            "Invalid phone number"
        );
    }

    #[test]
    fn test_address_form_receiver_length() {
        let at_limit = "李".repeat(20);
        let address = address_form(&at_limit, "1 Main Street", "13812345678")
            .validate()
            .unwrap();
        assert_eq!(address.receiver, at_limit);

        assert_eq!(
            address_form("Li Lei from the north", "1 Main Street", "13812345678")
                .validate()
                .unwrap_err(),
            "Receiver must be at most 20 characters"
        );
    }

    #[test]
    fn test_address_form_addr_length() {
        assert!(
            address_form("Li Lei", &"a".repeat(256), "13812345678")
                .validate()
                .is_ok()
        );
        assert_eq!(
            address_form("Li Lei", &"a".repeat(257), "13812345678")
                .validate()
                .unwrap_err(),
            "Address must be at most 256 characters"
        );
    }

    #[test]
    fn test_address_form_zip_code() {
        let mut form = address_form("Li Lei", "1 Main Street", "13812345678");

        form.zip_code = Some(" 100001 ".to_string());
        assert_eq!(form.validate().unwrap().zip_code.as_deref(), Some("100001"));

        for zip in ["1000001", "10000", "10000a", "１００００１"] {
            form.zip_code = Some(zip.to_string());
            assert_eq!(form.validate().unwrap_err(), "Invalid zip code", "{zip}");
        }
    }

    #[test]
    fn test_login_action_carries_next() {
        assert_eq!(login_action(None), "/user/login");
        assert_eq!(
            login_action(Some("/user/order")),
            "/user/login?next=%2Fuser%2Forder"
        );
    }

    #[test]
    fn test_username_cookie() {
        let cookie = username_cookie(Some("alice01")).to_string();
        assert!(cookie.starts_with("username=alice01"));
        assert!(cookie.contains("Max-Age=604800"));

        let cleared = username_cookie(None).to_string();
        assert!(cleared.contains("Max-Age=0"));
    }

    #[test]
    fn test_remembered_username() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("freshmall_session=abc; username=alice01"),
        );
        assert_eq!(remembered_username(&headers).as_deref(), Some("alice01"));
        assert_eq!(remembered_username(&HeaderMap::new()), None);
    }

    #[test]
    fn test_login_page_renders_remembered_user() {
        let page = LoginTemplate {
            user: None,
            errmsg: Some("Incorrect username or password".to_string()),
            username: "alice01".to_string(),
            remember: true,
            action: login_action(Some("/user")),
        }
        .render()
        .unwrap();
        assert!(page.contains(r#"value="alice01""#));
        assert!(page.contains("checked"));
        assert!(page.contains("Incorrect username or password"));
    }

    #[test]
    fn test_message_page_renders() {
        let page = MessageTemplate {
            user: None,
            title: "Activation failed",
            message: "Activation link has expired",
        }
        .render()
        .unwrap();
        assert!(page.contains("Activation link has expired"));
    }
}
