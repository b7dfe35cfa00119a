// Signed OpenAPI HTTP client
//
// Wraps `reqwest::Client` with the cloud's HMAC request signing, lazy
// data-center and nonce-mode discovery, access-token caching, and the
// one-shot "flip nonce mode on 1004" recovery. Device endpoints live in
// `device.rs` as inherent methods to keep this module focused on
// transport mechanics.

use std::time::Duration;

use reqwest::Method;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::auth::{Credentials, RegionEndpoints};
use crate::error::{CODE_SIGNATURE_INVALID, Error};
use crate::models::{Envelope, TokenGrant};
use crate::signing::{SIGN_METHOD, generate_nonce, sign, string_to_sign};
use crate::transport::TransportConfig;

const TOKEN_PATH: &str = "/v1.0/token?grant_type=1";

/// Subtracted from the server-reported token lifetime when recording expiry.
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// A token is never used this close to its recorded expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// The resolved data center and signing variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointBinding {
    pub base_url: String,
    pub use_nonce: bool,
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_usable(&self, now: Instant) -> bool {
        now + REFRESH_MARGIN < self.expires_at
    }
}

/// Mutable discovery and token state, owned by the client.
#[derive(Debug, Default)]
struct Session {
    base_url: Option<String>,
    use_nonce: Option<bool>,
    token: Option<AccessToken>,
}

/// Everything one signed business request needs, captured together so the
/// token and the nonce mode it was obtained under are never mixed.
#[derive(Debug, Clone)]
struct RequestAuth {
    base_url: String,
    use_nonce: bool,
    token: String,
}

impl Session {
    fn request_auth(&self, now: Instant) -> Option<RequestAuth> {
        let token = self.token.as_ref().filter(|t| t.is_usable(now))?;
        Some(RequestAuth {
            base_url: self.base_url.clone()?,
            use_nonce: self.use_nonce?,
            token: token.value.clone(),
        })
    }
}

/// Signed HTTP client for the cloud OpenAPI.
///
/// Data center and nonce mode are unknown until the first request, which
/// probes the token endpoint. Once a combination is accepted it stays
/// bound for the lifetime of the client; only a signature rejection
/// (code 1004) flips the nonce mode. Safe to share across tasks: all
/// discovery and token state sits behind one async lock, so at most one
/// token acquisition is in flight.
pub struct CloudClient {
    http: reqwest::Client,
    credentials: Credentials,
    endpoints: RegionEndpoints,
    timeout: Duration,
    session: Mutex<Session>,
}

impl CloudClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(credentials: Credentials, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, credentials).with_timeout(transport.timeout))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, credentials: Credentials) -> Self {
        Self {
            http,
            credentials,
            endpoints: RegionEndpoints::default(),
            timeout: crate::transport::DEFAULT_TIMEOUT,
            session: Mutex::new(Session::default()),
        }
    }

    /// Replace the region endpoint table (proxies, tests).
    pub fn with_endpoints(mut self, endpoints: RegionEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The discovered endpoint binding, or `None` before the first
    /// successful token request.
    pub async fn binding(&self) -> Option<EndpointBinding> {
        let session = self.session.lock().await;
        Some(EndpointBinding {
            base_url: session.base_url.clone()?,
            use_nonce: session.use_nonce?,
        })
    }

    // ── Token lifecycle ──────────────────────────────────────────────

    /// Return usable request auth, acquiring a token if none is cached or
    /// the cached one is inside the refresh margin.
    async fn ensure_token(&self) -> Result<RequestAuth, Error> {
        let mut session = self.session.lock().await;
        if let Some(auth) = session.request_auth(Instant::now()) {
            return Ok(auth);
        }
        self.acquire_token(&mut session).await
    }

    /// Walk the base-URL × nonce-mode matrix until the token endpoint
    /// accepts a signature, then bind both.
    async fn acquire_token(&self, session: &mut Session) -> Result<RequestAuth, Error> {
        let bases = match &session.base_url {
            Some(base) => vec![base.clone()],
            None => self.credentials.region.candidate_bases(&self.endpoints),
        };
        let modes = match session.use_nonce {
            Some(mode) => vec![mode],
            None => vec![true, false],
        };

        let mut last_payload = serde_json::Value::Null;

        for base in &bases {
            for &use_nonce in &modes {
                let requested_at = Instant::now();
                let (envelope, payload) = self.request_token_once(base, use_nonce).await?;

                if !envelope.success {
                    debug!(base = %base, use_nonce, code = ?envelope.code, msg = ?envelope.msg, "token request rejected");
                    last_payload = payload;
                    continue;
                }

                let grant = TokenGrant::deserialize(&envelope.result).map_err(|e| {
                    Error::Deserialization {
                        message: format!("malformed token grant: {e}"),
                        body: payload.to_string(),
                    }
                })?;

                let lifetime = Duration::from_secs(grant.expire_time).saturating_sub(EXPIRY_SKEW);
                session.base_url = Some(base.clone());
                session.use_nonce = Some(use_nonce);
                session.token = Some(AccessToken {
                    value: grant.access_token.clone(),
                    expires_at: requested_at + lifetime,
                });

                debug!(base = %base, use_nonce, expire_time = grant.expire_time, "token acquired");
                return Ok(RequestAuth {
                    base_url: base.clone(),
                    use_nonce,
                    token: grant.access_token,
                });
            }
        }

        Err(Error::Authentication {
            message: format!(
                "token request rejected by every endpoint ({})",
                describe_failure(&last_payload)
            ),
            payload: last_payload,
        })
    }

    /// `GET /v1.0/token?grant_type=1` against one base with one nonce mode.
    async fn request_token_once(
        &self,
        base: &str,
        use_nonce: bool,
    ) -> Result<(Envelope, serde_json::Value), Error> {
        let t = timestamp_millis();
        let nonce = use_nonce.then(generate_nonce);
        let material = format!(
            "{}{t}{}{}",
            self.credentials.access_id,
            nonce.as_deref().unwrap_or_default(),
            string_to_sign("GET", TOKEN_PATH, b""),
        );

        let url = format!("{base}{TOKEN_PATH}");
        debug!(url = %url, use_nonce, "requesting token");

        let mut builder = self
            .http
            .get(&url)
            .header("client_id", &self.credentials.access_id)
            .header("t", t.to_string())
            .header("sign_method", SIGN_METHOD)
            .header("sign", self.sign(&material));
        if let Some(ref nonce) = nonce {
            builder = builder.header("nonce", nonce);
        }

        let body = self.send(builder).await?;
        let (envelope, payload) = parse_envelope(&body)?;

        if let Some(server_t) = envelope.t {
            debug!(client_t = t, server_t, drift_ms = server_t - t, "token clock check");
        }

        Ok((envelope, payload))
    }

    /// Flip the nonce mode after a signature rejection and re-acquire a
    /// token under the new mode.
    ///
    /// If another caller already flipped away from `failed.use_nonce`, the
    /// mode is left alone and the (possibly fresh) token is reused.
    async fn flip_nonce_mode(&self, failed: &RequestAuth) -> Result<RequestAuth, Error> {
        let mut session = self.session.lock().await;
        if session.use_nonce == Some(failed.use_nonce) {
            let flipped = !failed.use_nonce;
            warn!(use_nonce = flipped, "signature rejected, flipping nonce mode and retrying once");
            session.use_nonce = Some(flipped);
            session.token = None;
        }
        if let Some(auth) = session.request_auth(Instant::now()) {
            return Ok(auth);
        }
        self.acquire_token(&mut session).await
    }

    // ── Signed business requests ─────────────────────────────────────

    /// Issue a signed business request and return the envelope's `result`.
    ///
    /// A signature rejection flips the nonce mode, discards the token and
    /// retries exactly once. Any other failure is returned as
    /// [`Error::Api`] with the raw payload attached.
    pub async fn request(
        &self,
        method: Method,
        path_with_query: &str,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<serde_json::Value, Error> {
        let body = match body {
            Some(body) => serde_json::to_string(body).map_err(|e| Error::Deserialization {
                message: format!("failed to serialize request body: {e}"),
                body: String::new(),
            })?,
            None => String::new(),
        };

        let auth = self.ensure_token().await?;
        let (envelope, payload) = self
            .send_signed(&method, path_with_query, &body, &auth)
            .await?;

        if envelope.success {
            return Ok(envelope.result);
        }

        warn!(
            method = %method,
            path = path_with_query,
            base = %auth.base_url,
            use_nonce = auth.use_nonce,
            code = ?envelope.code,
            msg = ?envelope.msg,
            "cloud API error"
        );

        if envelope.code != Some(CODE_SIGNATURE_INVALID) {
            return Err(api_error(&envelope, payload));
        }

        let auth = self.flip_nonce_mode(&auth).await?;
        let (retry, retry_payload) = self
            .send_signed(&method, path_with_query, &body, &auth)
            .await?;

        if retry.success {
            return Ok(retry.result);
        }
        Err(api_error(&retry, retry_payload))
    }

    /// One signed attempt with the given auth.
    async fn send_signed(
        &self,
        method: &Method,
        path_with_query: &str,
        body: &str,
        auth: &RequestAuth,
    ) -> Result<(Envelope, serde_json::Value), Error> {
        let t = timestamp_millis();
        let nonce = auth.use_nonce.then(generate_nonce);
        let material = format!(
            "{}{}{t}{}{}",
            self.credentials.access_id,
            auth.token,
            nonce.as_deref().unwrap_or_default(),
            string_to_sign(method.as_str(), path_with_query, body.as_bytes()),
        );

        let url = format!("{}{path_with_query}", auth.base_url);
        debug!(method = %method, url = %url, use_nonce = auth.use_nonce, "signed request");

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header("client_id", &self.credentials.access_id)
            .header("access_token", &auth.token)
            .header("t", t.to_string())
            .header("sign_method", SIGN_METHOD)
            .header("sign", self.sign(&material))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(ref nonce) = nonce {
            builder = builder.header("nonce", nonce);
        }
        if !body.is_empty() {
            builder = builder.body(body.to_owned());
        }

        let text = self.send(builder).await?;
        parse_envelope(&text)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn sign(&self, material: &str) -> String {
        sign(
            material,
            self.credentials.access_secret.expose_secret().as_bytes(),
        )
    }

    /// Send and read the body as text. HTTP status is not inspected: the
    /// cloud reports failures inside the JSON envelope.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<String, Error> {
        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(%status, len = text.len(), "response received");
        Ok(text)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

/// Parse a response body into the envelope plus the raw payload.
fn parse_envelope(body: &str) -> Result<(Envelope, serde_json::Value), Error> {
    let payload: serde_json::Value =
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: format!("response is not JSON: {e}"),
            body: body.to_owned(),
        })?;
    let envelope = Envelope::deserialize(&payload).map_err(|e| Error::Deserialization {
        message: format!("unexpected response shape: {e}"),
        body: body.to_owned(),
    })?;
    Ok((envelope, payload))
}

fn api_error(envelope: &Envelope, payload: serde_json::Value) -> Error {
    Error::Api {
        code: envelope.code,
        message: envelope
            .msg
            .clone()
            .unwrap_or_else(|| "request failed".to_owned()),
        payload,
    }
}

fn describe_failure(payload: &serde_json::Value) -> String {
    let code = payload.get("code").map(ToString::to_string);
    let msg = payload.get("msg").and_then(serde_json::Value::as_str);
    match (code, msg) {
        (Some(code), Some(msg)) => format!("code {code}: {msg}"),
        (Some(code), None) => format!("code {code}"),
        (None, Some(msg)) => msg.to_owned(),
        (None, None) => "no error payload".to_owned(),
    }
}

fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
