use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_net::http::{Method, Request, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use yew::Callback;

const DEFAULT_SUPABASE_URL: &str = "http://localhost:54321";
const DEFAULT_SUPABASE_ANON_KEY: &str = "anon-key";
const SESSION_STORAGE_KEY: &str = "conusper-auth";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("error de red: {0}")]
    Network(String),
    #[error("error del servidor ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("no autorizado")]
    Unauthorized,
    #[error("respuesta inválida: {0}")]
    Decode(String),
    #[error("entorno del navegador no disponible")]
    Browser,
}

impl From<gloo_net::Error> for ApiError {
    fn from(err: gloo_net::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
}

impl AuthUser {
    /// Name to greet the user with: metadata full name, else email, else id.
    pub fn display_name(&self) -> &str {
        self.user_metadata
            .full_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AuthEvent {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

#[derive(Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

type Listeners = Rc<RefCell<Vec<(u32, Callback<AuthChange>)>>>;

/// Handle returned by [`SupabaseClient::subscribe`]; dropping it removes the
/// listener.
pub struct AuthSubscription {
    id: u32,
    listeners: Listeners,
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
    }
}

/// Client for the hosted backend: GoTrue auth endpoints plus PostgREST
/// table access. Owns the in-memory session and the auth-change observers.
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    session: RefCell<Option<Session>>,
    listeners: Listeners,
    next_listener_id: Cell<u32>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: AuthUser,
}

struct FragmentTokens {
    access_token: String,
    refresh_token: Option<String>,
}

impl SupabaseClient {
    pub fn new() -> Self {
        Self {
            base_url: option_env!("SUPABASE_URL")
                .unwrap_or(DEFAULT_SUPABASE_URL)
                .trim_end_matches('/')
                .to_string(),
            anon_key: option_env!("SUPABASE_ANON_KEY")
                .unwrap_or(DEFAULT_SUPABASE_ANON_KEY)
                .to_string(),
            session: RefCell::new(None),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener_id: Cell::new(0),
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self, callback: Callback<AuthChange>) -> AuthSubscription {
        let id = self.next_listener_id.get();
        self.next_listener_id.set(id + 1);
        self.listeners.borrow_mut().push((id, callback));
        AuthSubscription {
            id,
            listeners: Rc::clone(&self.listeners),
        }
    }

    fn notify(&self, event: AuthEvent, session: Option<Session>) {
        let listeners = self.listeners.borrow().clone();
        for (_, callback) in listeners {
            callback.emit(AuthChange {
                event,
                session: session.clone(),
            });
        }
    }

    fn set_session(&self, session: Option<Session>) {
        match &session {
            Some(s) => persist_session(s),
            None => clear_persisted_session(),
        }
        *self.session.borrow_mut() = session;
    }

    fn bearer_token(&self) -> String {
        self.session
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn auth_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .header("Authorization", &format!("Bearer {}", self.bearer_token()))
    }

    // ---- auth -----------------------------------------------------------

    /// Recover the current session on startup: first from redirect-back
    /// tokens in the URL fragment, then from the persisted copy in local
    /// storage. Tokens are always validated against the auth server before
    /// being trusted; a token the server refuses is a policy denial, not a
    /// transport failure, and is reported through the observer with an
    /// empty session.
    pub async fn restore_session(&self) -> Result<Option<Session>, ApiError> {
        if let Some(tokens) = take_fragment_tokens() {
            return match self.fetch_user(&tokens.access_token).await {
                Ok(user) => {
                    let session = Session {
                        access_token: tokens.access_token,
                        refresh_token: tokens.refresh_token,
                        user,
                    };
                    self.set_session(Some(session.clone()));
                    self.notify(AuthEvent::SignedIn, Some(session.clone()));
                    Ok(Some(session))
                }
                Err(ApiError::Unauthorized) => {
                    // Provider handed us tokens the server will not honor
                    // (e.g. the allowed-emails trigger rejected the user).
                    self.notify(AuthEvent::SignedIn, None);
                    Ok(None)
                }
                Err(err) => Err(err),
            };
        }

        let Some(stored) = load_persisted_session() else {
            return Ok(None);
        };

        match self.fetch_user(&stored.access_token).await {
            Ok(user) => {
                let session = Session { user, ..stored };
                self.set_session(Some(session.clone()));
                self.notify(AuthEvent::SignedIn, Some(session.clone()));
                Ok(Some(session))
            }
            Err(ApiError::Unauthorized) => match stored.refresh_token {
                Some(refresh_token) => match self.refresh(&refresh_token).await {
                    Ok(session) => {
                        self.set_session(Some(session.clone()));
                        self.notify(AuthEvent::TokenRefreshed, Some(session.clone()));
                        Ok(Some(session))
                    }
                    Err(ApiError::Unauthorized) => {
                        self.set_session(None);
                        self.notify(AuthEvent::TokenRefreshed, None);
                        Ok(None)
                    }
                    Err(err) => Err(err),
                },
                None => {
                    self.set_session(None);
                    self.notify(AuthEvent::TokenRefreshed, None);
                    Ok(None)
                }
            },
            Err(err) => Err(err),
        }
    }

    async fn fetch_user(&self, access_token: &str) -> Result<AuthUser, ApiError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let resp = Request::get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", &format!("Bearer {access_token}"))
            .send()
            .await?;
        match resp.status() {
            200 => resp
                .json::<AuthUser>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string())),
            401 | 403 => Err(ApiError::Unauthorized),
            status => Err(ApiError::Server {
                status,
                message: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ApiError> {
        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.base_url);
        let resp = Request::post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))?
            .send()
            .await?;
        match resp.status() {
            200 => {
                let tokens = resp
                    .json::<TokenResponse>()
                    .await
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                Ok(Session {
                    access_token: tokens.access_token,
                    refresh_token: tokens.refresh_token,
                    user: tokens.user,
                })
            }
            400 | 401 | 403 => Err(ApiError::Unauthorized),
            status => Err(ApiError::Server {
                status,
                message: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Kick off the OAuth redirect. On success navigation leaves the app;
    /// only a synchronous browser failure returns `Err`.
    pub fn sign_in_with_google(&self) -> Result<(), ApiError> {
        let window = web_sys::window().ok_or(ApiError::Browser)?;
        let origin = window.location().origin().map_err(|_| ApiError::Browser)?;
        let url = format!(
            "{}/auth/v1/authorize?provider=google&redirect_to={}/login",
            self.base_url, origin
        );
        window
            .location()
            .set_href(&url)
            .map_err(|_| ApiError::Browser)
    }

    /// Local state is cleared even when the remote call fails; the caller
    /// always observes a signed-out client afterwards.
    pub async fn sign_out(&self) -> Result<(), ApiError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let result = match self.auth_headers(Request::post(&url)).send().await {
            Ok(resp) if resp.ok() || resp.status() == 401 => Ok(()),
            Ok(resp) => Err(ApiError::Server {
                status: resp.status(),
                message: resp.text().await.unwrap_or_default(),
            }),
            Err(err) => Err(err.into()),
        };
        self.set_session(None);
        self.notify(AuthEvent::SignedOut, None);
        result
    }

    // ---- tables ---------------------------------------------------------

    fn table_url(&self, table: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table);
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&encode_query_value(value));
        }
        url
    }

    async fn read_rows<T: DeserializeOwned>(
        &self,
        resp: gloo_net::http::Response,
    ) -> Result<Vec<T>, ApiError> {
        match resp.status() {
            200 | 201 => resp
                .json::<Vec<T>>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string())),
            401 | 403 => Err(ApiError::Unauthorized),
            status => Err(ApiError::Server {
                status,
                message: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let url = self.table_url(table, query);
        let resp = self.auth_headers(Request::get(&url)).send().await?;
        self.read_rows(resp).await
    }

    /// First matching row, if any. Used for remote existence checks.
    pub async fn select_first<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, ApiError> {
        let mut query = query.to_vec();
        query.push(("limit", "1"));
        let mut rows = self.select::<T>(table, &query).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    pub async fn insert_one<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
        select: &str,
    ) -> Result<T, ApiError> {
        let url = self.table_url(table, &[("select", select)]);
        let resp = self
            .auth_headers(Request::post(&url))
            .header("Prefer", "return=representation")
            .json(body)?
            .send()
            .await?;
        let mut rows = self.read_rows::<T>(resp).await?;
        if rows.is_empty() {
            return Err(ApiError::Decode("inserción sin fila de respuesta".into()));
        }
        Ok(rows.remove(0))
    }

    /// PATCH returning the server-confirmed row.
    pub async fn update_one<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        body: &B,
        select: &str,
    ) -> Result<T, ApiError> {
        let mut query = filters.to_vec();
        query.push(("select", select));
        let url = self.table_url(table, &query);
        let resp = self
            .auth_headers(RequestBuilder::new(&url).method(Method::PATCH))
            .header("Prefer", "return=representation")
            .json(body)?
            .send()
            .await?;
        let mut rows = self.read_rows::<T>(resp).await?;
        if rows.is_empty() {
            return Err(ApiError::Decode("actualización sin fila de respuesta".into()));
        }
        Ok(rows.remove(0))
    }

    pub async fn delete_where(
        &self,
        table: &str,
        filters: &[(&str, &str)],
    ) -> Result<(), ApiError> {
        let url = self.table_url(table, filters);
        let resp = self
            .auth_headers(RequestBuilder::new(&url).method(Method::DELETE))
            .send()
            .await?;
        match resp.status() {
            200 | 204 => Ok(()),
            401 | 403 => Err(ApiError::Unauthorized),
            status => Err(ApiError::Server {
                status,
                message: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Exact row count via a HEAD request; the total travels back in the
    /// `Content-Range` header.
    pub async fn count(&self, table: &str, filters: &[(&str, &str)]) -> Result<u64, ApiError> {
        let url = self.table_url(table, filters);
        let resp = self
            .auth_headers(RequestBuilder::new(&url).method(Method::HEAD))
            .header("Prefer", "count=exact")
            .send()
            .await?;
        if !resp.ok() {
            return Err(ApiError::Server {
                status: resp.status(),
                message: String::new(),
            });
        }
        let range = resp
            .headers()
            .get("content-range")
            .ok_or_else(|| ApiError::Decode("sin cabecera content-range".into()))?;
        parse_content_range_total(&range)
            .ok_or_else(|| ApiError::Decode(format!("content-range ilegible: {range}")))
    }
}

// ---- URL surface --------------------------------------------------------

/// Error keys the provider appends when a sign-in is rejected. Read once on
/// the login screen and stripped from the URL.
#[derive(Clone, PartialEq, Debug)]
pub struct AuthRedirectError {
    pub error: String,
    pub description: Option<String>,
    pub code: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DenialKind {
    /// The server-side policy (allowed-emails trigger) rejected the account.
    NotAuthorized,
    /// The user cancelled or the provider denied access.
    AccessDenied,
    Generic,
}

/// Structured mapping from the redirect error keys to a denial kind. The
/// policy rejection travels back as a server error code rather than a
/// message to sniff.
pub fn classify_redirect_error(err: &AuthRedirectError) -> DenialKind {
    if err.error == "server_error" || err.code.as_deref() == Some("500") {
        return DenialKind::NotAuthorized;
    }
    if err.error == "access_denied" || err.code.as_deref() == Some("403") {
        return DenialKind::AccessDenied;
    }
    DenialKind::Generic
}

/// Read `error` / `error_description` / `error_code` from the query string
/// and the fragment, then strip both so the message fires only once.
pub fn take_auth_redirect_error() -> Option<AuthRedirectError> {
    let window = web_sys::window()?;
    let location = window.location();

    let mut params: Vec<(String, String)> = Vec::new();
    if let Ok(search) = location.search() {
        params.extend(parse_url_params(search.trim_start_matches('?')));
    }
    if let Ok(hash) = location.hash() {
        params.extend(parse_url_params(hash.trim_start_matches('#')));
    }

    let error = param(&params, "error")?;
    strip_url_noise(&window);
    Some(AuthRedirectError {
        error,
        description: param(&params, "error_description"),
        code: param(&params, "error_code"),
    })
}

fn take_fragment_tokens() -> Option<FragmentTokens> {
    let window = web_sys::window()?;
    let hash = window.location().hash().ok()?;
    let params = parse_url_params(hash.trim_start_matches('#'));
    let access_token = param(&params, "access_token")?;
    let refresh_token = param(&params, "refresh_token");
    strip_url_noise(&window);
    Some(FragmentTokens {
        access_token,
        refresh_token,
    })
}

/// Drop query string and fragment, keeping the path, without a navigation.
fn strip_url_noise(window: &web_sys::Window) {
    let location = window.location();
    let Ok(path) = location.pathname() else {
        return;
    };
    if let Ok(history) = window.history() {
        let _ = history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&path));
    }
}

fn param(params: &[(String, String)], key: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

/// Minimal `k=v&k2=v2` parser with percent decoding, shared by the query
/// string and the fragment.
pub(crate) fn parse_url_params(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (url_decode(k), url_decode(v)),
            None => (url_decode(pair), String::new()),
        })
        .collect()
}

pub(crate) fn url_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let decoded = bytes
                    .get(i + 1..i + 3)
                    .and_then(|pair| std::str::from_utf8(pair).ok())
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok());
                match decoded {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encode a query value. Filter values can carry spaces and
/// accented names ("Depósitos Bancarios"); PostgREST operators (`eq.`,
/// `.asc`) survive because `.` and alphanumerics pass through.
pub(crate) fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => out.push(byte as char),
            b'-' | b'_' | b'.' | b'~' | b'*' | b'(' | b')' | b',' | b':' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

pub(crate) fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit_once('/')?.1.trim().parse().ok()
}

// ---- persistence --------------------------------------------------------

fn persist_session(session: &Session) {
    if let Some(window) = web_sys::window() {
        if let Ok(Some(storage)) = window.local_storage() {
            if let Ok(raw) = serde_json::to_string(session) {
                let _ = storage.set_item(SESSION_STORAGE_KEY, &raw);
            }
        }
    }
}

fn load_persisted_session() -> Option<Session> {
    let window = web_sys::window()?;
    let storage = window.local_storage().ok()??;
    let raw = storage.get_item(SESSION_STORAGE_KEY).ok()??;
    serde_json::from_str(&raw).ok()
}

fn clear_persisted_session() {
    if let Some(window) = web_sys::window() {
        if let Ok(Some(storage)) = window.local_storage() {
            let _ = storage.remove_item(SESSION_STORAGE_KEY);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_params_parse_and_decode() {
        let params = parse_url_params("error=server_error&error_description=Email%20no%20autorizado&error_code=500");
        assert_eq!(param(&params, "error").as_deref(), Some("server_error"));
        assert_eq!(
            param(&params, "error_description").as_deref(),
            Some("Email no autorizado")
        );
        assert_eq!(param(&params, "error_code").as_deref(), Some("500"));
        assert!(param(&params, "access_token").is_none());
    }

    #[test]
    fn url_decode_handles_plus_and_truncated_escapes() {
        assert_eq!(url_decode("a+b"), "a b");
        assert_eq!(url_decode("caf%C3%A9"), "café");
        assert_eq!(url_decode("bad%2"), "bad%2");
    }

    #[test]
    fn query_values_encode_spaces_and_accents() {
        assert_eq!(encode_query_value("eq.Yape"), "eq.Yape");
        assert_eq!(
            encode_query_value("eq.Depósitos Bancarios"),
            "eq.Dep%C3%B3sitos%20Bancarios"
        );
        assert_eq!(encode_query_value("name.asc"), "name.asc");
        assert_eq!(encode_query_value("*,entity:entities(*)"), "*,entity:entities(*)");
    }

    #[test]
    fn content_range_total_parses_both_shapes() {
        assert_eq!(parse_content_range_total("0-24/573"), Some(573));
        assert_eq!(parse_content_range_total("*/5"), Some(5));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn redirect_errors_classify_structurally() {
        let policy = AuthRedirectError {
            error: "server_error".into(),
            description: Some("Database error saving new user".into()),
            code: None,
        };
        assert_eq!(classify_redirect_error(&policy), DenialKind::NotAuthorized);

        let by_code = AuthRedirectError {
            error: "unexpected_failure".into(),
            description: None,
            code: Some("500".into()),
        };
        assert_eq!(classify_redirect_error(&by_code), DenialKind::NotAuthorized);

        let cancelled = AuthRedirectError {
            error: "access_denied".into(),
            description: None,
            code: None,
        };
        assert_eq!(classify_redirect_error(&cancelled), DenialKind::AccessDenied);

        let other = AuthRedirectError {
            error: "invalid_request".into(),
            description: None,
            code: None,
        };
        assert_eq!(classify_redirect_error(&other), DenialKind::Generic);
    }
}
