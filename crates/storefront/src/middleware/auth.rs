//! Authentication extractors.
//!
//! Provides extractors for requiring a logged-in user in route handlers.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Where anonymous users are sent when a page needs a login.
pub const LOGIN_URL: &str = "/user/login";

/// Extractor that requires a logged-in user.
///
/// If no user is logged in, redirects to the login page with the original
/// path in `next`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireLogin(user): RequireLogin,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireLogin(pub CurrentUser);

/// Error returned when a login is required but no user is logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, coming back to `next` afterwards.
    RedirectToLogin { next: String },
    /// The session layer is missing.
    NoSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_redirect(&next)).into_response(),
            Self::NoSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Login URL that returns to `next` after a successful login.
#[must_use]
pub fn login_redirect(next: &str) -> String {
    format!("{LOGIN_URL}?next={}", urlencoding::encode(next))
}

impl<S> FromRequestParts<S> for RequireLogin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::NoSession)?;

        let user = current_user(session)
            .await
            .ok_or_else(|| AuthRejection::RedirectToLogin {
                next: parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path().to_string(), ToString::to_string),
            })?;

        Ok(Self(user))
    }
}

/// Read the logged-in user. A store failure is logged and treated as anonymous.
async fn current_user(session: &Session) -> Option<CurrentUser> {
    match session.get::<CurrentUser>(session_keys::CURRENT_USER).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Session read failed, treating request as anonymous");
            None
        }
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireLogin`, this does not reject the request if no user is
/// logged in.
pub struct MaybeUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Log a user in: rotate the session id and store the user.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Log the user out by discarding the whole session.
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

/// Validate a post-login redirect target.
///
/// Only same-site absolute paths are honoured; anything else (including
/// protocol-relative `//host` URLs) falls back to `/`.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.contains(['\r', '\n']) =>
        {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;
    use tower_sessions::session::{Id, Record};
    use tower_sessions::session_store::{self, SessionStore};
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use freshmall_core::UserId;

    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(None), "/");
        assert_eq!(safe_next(Some("/user/order")), "/user/order");
        assert_eq!(safe_next(Some("/user?tab=1")), "/user?tab=1");
        assert_eq!(safe_next(Some("https://evil.example.com")), "/");
        assert_eq!(safe_next(Some("//evil.example.com")), "/");
        assert_eq!(safe_next(Some("/\\evil.example.com")), "/");
        assert_eq!(safe_next(Some("")), "/");
    }

    #[test]
    fn test_login_redirect_encodes_next() {
        assert_eq!(
            login_redirect("/user/order/2"),
            "/user/login?next=%2Fuser%2Forder%2F2"
        );
    }

    fn app() -> Router {
        async fn protected(RequireLogin(user): RequireLogin) -> String {
            user.username
        }

        async fn login(session: Session) -> &'static str {
            let user = CurrentUser {
                id: UserId::new(1),
                username: "alice01".to_string(),
            };
            set_current_user(&session, &user).await.unwrap();
            "ok"
        }

        async fn whoami(MaybeUser(user): MaybeUser) -> String {
            user.map_or_else(|| "guest".to_string(), |u| u.username)
        }

        let store = MemoryStore::default();
        Router::new()
            .route("/user", get(protected))
            .route("/login", get(login))
            .route("/whoami", get(whoami))
            .layer(SessionManagerLayer::new(store).with_secure(false))
    }

    #[tokio::test]
    async fn test_require_login_redirects_anonymous() {
        let response = app()
            .oneshot(Request::get("/user").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/user/login?next=%2Fuser"
        );
    }

    #[tokio::test]
    async fn test_maybe_user_is_guest_without_session() {
        let response = app()
            .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"guest");
    }

    #[tokio::test]
    async fn test_logged_in_user_passes() {
        let app = app();
        let response = app
            .clone()
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = response.headers()["set-cookie"]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(
                Request::get("/user")
                    .header("cookie", cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"alice01");
    }

    /// Store whose backend is always down.
    #[derive(Debug, Clone)]
    struct UnavailableStore;

    #[async_trait]
    impl SessionStore for UnavailableStore {
        async fn save(&self, _record: &Record) -> session_store::Result<()> {
            Err(session_store::Error::Backend("connection refused".to_string()))
        }

        async fn load(&self, _session_id: &Id) -> session_store::Result<Option<Record>> {
            Err(session_store::Error::Backend("connection refused".to_string()))
        }

        async fn delete(&self, _session_id: &Id) -> session_store::Result<()> {
            Err(session_store::Error::Backend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unavailable_session_store_falls_back_to_anonymous() {
        async fn protected(RequireLogin(user): RequireLogin) -> String {
            user.username
        }

        async fn whoami(MaybeUser(user): MaybeUser) -> String {
            user.map_or_else(|| "guest".to_string(), |u| u.username)
        }

        let app = Router::new()
            .route("/user", get(protected))
            .route("/whoami", get(whoami))
            .layer(SessionManagerLayer::new(UnavailableStore).with_secure(false));
        let cookie = format!("id={}", Id::default());

        let response = app
            .clone()
            .oneshot(
                Request::get("/user")
                    .header("cookie", &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/user/login?next=%2Fuser");

        let response = app
            .oneshot(
                Request::get("/whoami")
                    .header("cookie", &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"guest");
    }
}
