//! Read side of the external identity provider: turns the session cookie it
//! issued into an [`Identity`], and gates routes on it.

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest, HttpResponse};
use chrono::NaiveDateTime;
use futures::future::LocalBoxFuture;
use serde::Serialize;

use crate::errors::ApiError;
use crate::services::db_models::{Session, User};
use crate::services::db_utils::AppState;
use crate::services::messages::ResolveSession;

pub const DEFAULT_SESSION_COOKIE: &str = "better-auth.session_token";

/// How this service consumes the identity provider's sessions. Built once at
/// startup and kept in `AppState`.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_cookie: String,
    pub admin_roles: Vec<String>,
    /// Where already signed-in users are sent when they open an auth page.
    pub redirect_to: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            session_cookie: DEFAULT_SESSION_COOKIE.to_owned(),
            admin_roles: vec!["admin".to_owned()],
            redirect_to: "/".to_owned(),
        }
    }
}

impl AuthConfig {
    /// The cookie holds `token.signature`; only the token is looked up.
    pub fn session_token(&self, req: &HttpRequest) -> Option<String> {
        let cookie = req.cookie(&self.session_cookie)?;
        let token = cookie.value().split('.').next().unwrap_or_default().trim();
        (!token.is_empty()).then(|| token.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
}

impl Identity {
    /// Accepts the session only while it is unexpired and the user is not
    /// under an active ban.
    pub fn from_session(session: &Session, user: &User, now: NaiveDateTime) -> Option<Identity> {
        if session.expires_at <= now {
            return None;
        }
        let banned = user.banned.unwrap_or(false) && user.ban_expires.map_or(true, |until| until > now);
        if banned {
            tracing::debug!(user = %user.id, "session refused for banned user");
            return None;
        }

        Some(Identity {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        })
    }

    pub fn is_admin(&self, config: &AuthConfig) -> bool {
        self.role.as_deref().is_some_and(|roles| {
            roles
                .split(',')
                .map(str::trim)
                .any(|role| config.admin_roles.iter().any(|admin| admin == role))
        })
    }
}

/// Identity of the caller, if any. Never rejects the request on its own.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<Identity>);

/// Any signed-in user; staff operations require one.
#[derive(Debug, Clone)]
pub struct Staff(pub Identity);

/// A signed-in user holding one of the admin roles.
#[derive(Debug, Clone)]
pub struct Admin(pub Identity);

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<Data<AppState>>().cloned();
        let token = state.as_ref().and_then(|s| s.auth.session_token(req));

        Box::pin(async move {
            let (Some(state), Some(token)) = (state, token) else {
                return Ok(CurrentUser(None));
            };
            let identity = state.db.send(ResolveSession { token }).await??;
            Ok(CurrentUser(identity))
        })
    }
}

impl FromRequest for Staff {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let current = CurrentUser::from_request(req, payload);

        Box::pin(async move {
            match current.await? {
                CurrentUser(Some(identity)) => Ok(Staff(identity)),
                CurrentUser(None) => Err(ApiError::Unauthenticated),
            }
        })
    }
}

impl FromRequest for Admin {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let config = req.app_data::<Data<AppState>>().map(|s| s.auth.clone());
        let staff = Staff::from_request(req, payload);

        Box::pin(async move {
            let Staff(identity) = staff.await?;
            match config {
                Some(config) if identity.is_admin(&config) => Ok(Admin(identity)),
                _ => Err(ApiError::Forbidden("manage restaurants")),
            }
        })
    }
}

/// Signed-in users have no business on the sign-in/sign-up pages.
pub fn redirect_signed_in(identity: Option<&Identity>, config: &AuthConfig) -> Option<HttpResponse> {
    identity.map(|_| {
        HttpResponse::Found()
            .insert_header((header::LOCATION, config.redirect_to.as_str()))
            .finish()
    })
}

#[cfg(test)]
mod tests {
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, day).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn user(role: Option<&str>) -> User {
        User {
            id: "u1".into(),
            name: "Marie".into(),
            email: "marie@example.com".into(),
            email_verified: true,
            image: None,
            created_at: at(1),
            updated_at: at(1),
            role: role.map(str::to_owned),
            banned: Some(false),
            ban_reason: None,
            ban_expires: None,
        }
    }

    fn session(expires_at: NaiveDateTime) -> Session {
        Session {
            id: "s1".into(),
            expires_at,
            token: "tok".into(),
            created_at: at(1),
            updated_at: at(1),
            ip_address: None,
            user_agent: None,
            user_id: "u1".into(),
            impersonated_by: None,
        }
    }

    #[test]
    fn expired_sessions_resolve_to_nobody() {
        assert!(Identity::from_session(&session(at(10)), &user(None), at(9)).is_some());
        assert!(Identity::from_session(&session(at(10)), &user(None), at(10)).is_none());
    }

    #[test]
    fn bans_apply_until_they_expire() {
        let mut banned = user(None);
        banned.banned = Some(true);
        assert!(Identity::from_session(&session(at(20)), &banned, at(9)).is_none());

        banned.ban_expires = Some(at(8));
        assert!(Identity::from_session(&session(at(20)), &banned, at(9)).is_some());
    }

    #[test]
    fn admin_role_detection() {
        let config = AuthConfig::default();
        let now = at(9);
        let admin = Identity::from_session(&session(at(20)), &user(Some("user,admin")), now).unwrap();
        let plain = Identity::from_session(&session(at(20)), &user(Some("user")), now).unwrap();
        let none = Identity::from_session(&session(at(20)), &user(None), now).unwrap();

        assert!(admin.is_admin(&config));
        assert!(!plain.is_admin(&config));
        assert!(!none.is_admin(&config));
    }

    #[test]
    fn token_is_read_before_the_signature() {
        let config = AuthConfig::default();
        let req = TestRequest::default()
            .cookie(Cookie::new(DEFAULT_SESSION_COOKIE, "abc123.c2lnbmF0dXJl"))
            .to_http_request();
        assert_eq!(config.session_token(&req).as_deref(), Some("abc123"));

        let bare = TestRequest::default().to_http_request();
        assert_eq!(config.session_token(&bare), None);
    }

    #[test]
    fn guard_redirects_only_signed_in_users() {
        let config = AuthConfig::default();
        let identity = Identity::from_session(&session(at(20)), &user(None), at(9)).unwrap();

        let resp = redirect_signed_in(Some(&identity), &config).unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");

        assert!(redirect_signed_in(None, &config).is_none());
    }
}
