//! Session client: login state machine, validity probing, header generation.
//!
//! The client impersonates the platform's mobile web login. It moves through
//! `Anonymous -> Authenticating -> Authenticated`, with `Failed` terminal for
//! the attempt; a later `login` call starts a fresh attempt. Cookies captured
//! at login are persisted through the injected [`SessionCache`] and reused on
//! subsequent runs when a validity probe still passes.

use std::collections::HashMap;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::credentials::{SessionCache, SessionData, CSRF_COOKIE, MID_KEY};
use crate::error::{Error, Result};
use crate::pacing::{self, DelayStrategy, NoDelay};

use super::account::Account;
use super::endpoints;
use super::gis::{gis_token, GisVariables};
use super::page;

/// Fixed user agent impersonating the platform's Android app.
pub const USER_AGENT: &str = "Instagram 126.0.0.25.121 Android (23/6.0.1; 320dpi; 720x1280; \
     samsung; SM-A310F; a3xelte; samsungexynos7580; en_GB; 110937453)";

/// Response cookie that marks an authenticated session.
const USER_ID_COOKIE: &str = "ds_user_id";

/// Login response message that signals a verification challenge.
const CHECKPOINT_REQUIRED: &str = "checkpoint_required";

/// Where the client currently stands in the login lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    Failed,
}

/// Username plus password for credential submission.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// A checkpoint challenge returned by the login endpoint.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub status: u16,
    pub checkpoint_url: Option<String>,
    pub body: String,
}

/// Hook for completing the platform's extra verification step.
///
/// On success the verifier returns the cookie set of the now-authenticated
/// session, which the client caches exactly like a directly successful login.
#[async_trait::async_trait]
pub trait ChallengeVerifier: Send + Sync {
    async fn resolve(
        &self,
        http: &reqwest::Client,
        challenge: &Challenge,
    ) -> Result<HashMap<String, String>>;
}

/// Scrape client bound to one account's session.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    credentials: Option<Credentials>,
    cache: SessionCache,
    pacing: Box<dyn DelayStrategy>,
    verifier: Option<Box<dyn ChallengeVerifier>>,
    session: Option<SessionData>,
    external_cookies: bool,
    rhx_gis: Option<String>,
    state: SessionState,
}

impl Client {
    pub fn new(cache: SessionCache) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: endpoints::BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            credentials: None,
            cache,
            pacing: Box::new(NoDelay),
            verifier: None,
            session: None,
            external_cookies: false,
            rhx_gis: None,
            state: SessionState::Anonymous,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Point the client at a different site root. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_pacing(mut self, pacing: impl DelayStrategy + 'static) -> Self {
        self.pacing = Box::new(pacing);
        self
    }

    pub fn with_verifier(mut self, verifier: impl ChallengeVerifier + 'static) -> Self {
        self.verifier = Some(Box::new(verifier));
        self
    }

    /// Attach an externally captured cookie jar.
    ///
    /// Sessions supplied this way are trusted: `is_logged_in` short-circuits
    /// to true without probing the platform.
    pub fn with_cookie_jar(mut self, cookies: HashMap<String, String>) -> Self {
        self.session = Some(SessionData::from_cookies(cookies));
        self.external_cookies = true;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&SessionData> {
        self.session.as_ref()
    }

    /// Request headers for an authenticated (or anonymous) fetch.
    ///
    /// Pure with respect to the session mapping: all cookie pairs are folded
    /// into one `cookie` value, the csrf header prefers an `x-csrftoken`
    /// cookie over `csrftoken`, and the integrity token is attached only when
    /// supplied.
    pub fn session_headers(
        &self,
        session: Option<&SessionData>,
        gis: Option<&str>,
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(session) = session {
            headers.insert("cookie", HeaderValue::from_str(&session.cookie_header())?);
            headers.insert(
                "referer",
                HeaderValue::from_str(&endpoints::home_url(&self.base_url))?,
            );
            if let Some(csrf) = session.csrf_token() {
                headers.insert("x-csrftoken", HeaderValue::from_str(csrf)?);
            }
        }

        headers.insert("user-agent", HeaderValue::from_str(&self.user_agent)?);

        if let Some(gis) = gis {
            headers.insert("x-instagram-gis", HeaderValue::from_str(gis)?);
        }

        Ok(headers)
    }

    /// Probe whether a session is still accepted by the platform.
    ///
    /// Requires a session identifier and csrf token, a 2xx response to a
    /// home-page request carrying them, and a user-id cookie in the response.
    pub async fn is_logged_in(&self, session: Option<&SessionData>) -> Result<bool> {
        if self.external_cookies {
            return Ok(true);
        }

        let Some(session) = session else {
            return Ok(false);
        };
        let (Some(session_id), Some(csrf)) = (session.session_id(), session.get(CSRF_COOKIE))
        else {
            return Ok(false);
        };

        pacing::pause(self.pacing.as_ref()).await;
        let response = self
            .http
            .get(endpoints::home_url(&self.base_url))
            .header(
                "cookie",
                format!("ig_cb=1; csrftoken={csrf}; sessionid={session_id};"),
            )
            .header("referer", endpoints::home_url(&self.base_url))
            .header("x-csrftoken", csrf)
            .header("user-agent", &self.user_agent)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Ok(false);
        }

        let has_user_id = response.cookies().any(|c| c.name() == USER_ID_COOKIE);
        Ok(has_user_id)
    }

    /// Establish an authenticated session.
    ///
    /// With `force` unset, a cached session that still passes the validity
    /// probe is reused without touching the login endpoint. Otherwise the
    /// full credential submission runs and the resulting cookie set (plus
    /// machine id) replaces whatever was cached.
    pub async fn login(&mut self, force: bool) -> Result<HeaderMap> {
        let username = match self.credentials.as_ref() {
            Some(credentials) => credentials.username.clone(),
            None => return Err(Error::Auth("user credentials not provided".into())),
        };

        let cached = self.cache.load(&username).map_err(Error::Cache)?;

        if !force && self.is_logged_in(cached.as_ref()).await? {
            tracing::debug!(username = %username, "reusing cached session");
            self.session = cached;
            self.state = SessionState::Authenticated;
        } else {
            self.state = SessionState::Authenticating;
            tracing::info!(username = %username, "authenticating");

            match self.authenticate(&username).await {
                Ok(session) => {
                    self.cache.save(&username, &session).map_err(Error::Cache)?;
                    self.session = Some(session);
                    self.state = SessionState::Authenticated;
                    tracing::info!(username = %username, "authenticated");
                }
                Err(err) => {
                    self.state = SessionState::Failed;
                    return Err(err);
                }
            }
        }

        self.session_headers(self.session.as_ref(), None)
    }

    /// Run the credential submission flow and return the captured session.
    async fn authenticate(&self, username: &str) -> Result<SessionData> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Err(Error::Auth("user credentials not provided".into()));
        };

        // Home page carries the csrf token needed by the login endpoint.
        pacing::pause(self.pacing.as_ref()).await;
        let response = self
            .http
            .get(endpoints::home_url(&self.base_url))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(Error::Platform {
                status: status.as_u16(),
                body,
            });
        }
        let csrf_token = page::extract_csrf_token(&body)
            .map(str::to_string)
            .ok_or_else(|| Error::Auth("csrf token not found on home page".into()))?;

        let mid = self.fetch_mid().await?;

        pacing::pause(self.pacing.as_ref()).await;
        let enc_password = format!(
            "#PWD_INSTAGRAM_BROWSER:0:{}:{}",
            Utc::now().timestamp(),
            credentials.password.expose_secret()
        );
        let params = [
            ("username", username),
            ("enc_password", enc_password.as_str()),
        ];

        let response = self
            .http
            .post(endpoints::login_url(&self.base_url))
            .header(
                "cookie",
                format!("ig_cb=1; csrftoken={csrf_token}; mid={mid};"),
            )
            .header("referer", endpoints::home_url(&self.base_url))
            .header("x-csrftoken", &csrf_token)
            .header("user-agent", &self.user_agent)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let mut cookies: HashMap<String, String> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = response.text().await?;

        if status != StatusCode::OK {
            let challenge_payload = serde_json::from_str::<Value>(&body)
                .ok()
                .filter(|v| v.get("message").and_then(Value::as_str) == Some(CHECKPOINT_REQUIRED));

            let Some(payload) = challenge_payload else {
                return Err(Error::Auth(format!(
                    "unexpected login response, status {}: {body}",
                    status.as_u16()
                )));
            };

            tracing::warn!(username = %username, "login hit a checkpoint challenge");
            let Some(verifier) = self.verifier.as_deref() else {
                return Err(Error::Auth(
                    "checkpoint required and no challenge verifier supplied".into(),
                ));
            };

            let challenge = Challenge {
                status: status.as_u16(),
                checkpoint_url: payload
                    .get("checkpoint_url")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                body: body.clone(),
            };
            cookies = verifier.resolve(&self.http, &challenge).await?;
        } else {
            let payload: Value = serde_json::from_str(&body)?;
            if payload.get("authenticated").and_then(Value::as_bool) != Some(true) {
                return Err(Error::Auth("user credentials are wrong".into()));
            }
        }

        let mut session = SessionData::from_cookies(cookies);
        session.insert(MID_KEY, mid);
        Ok(session)
    }

    /// The machine id is fetched from its dedicated endpoint; the home-page
    /// cookies stopped carrying it.
    async fn fetch_mid(&self) -> Result<String> {
        pacing::pause(self.pacing.as_ref()).await;
        let response = self
            .http
            .get(endpoints::mid_url(&self.base_url))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(Error::Platform {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Fetch a page and return its embedded shared-data blob.
    pub async fn shared_data(&self, url: &str) -> Result<Option<Value>> {
        pacing::pause(self.pacing.as_ref()).await;
        let headers = self.session_headers(self.session.as_ref(), None)?;
        let response = self.http.get(url).headers(headers).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("page {url} not found")));
        }
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(Error::Platform {
                status: status.as_u16(),
                body,
            });
        }

        page::extract_shared_data(&body)
    }

    /// Page-scoped nonce for integrity tokens, fetched lazily from the home
    /// page and cached for the lifetime of this client.
    async fn rhx_gis(&mut self) -> Result<Option<String>> {
        if self.rhx_gis.is_none() {
            let shared = self
                .shared_data(&endpoints::home_url(&self.base_url))
                .await?;
            self.rhx_gis = shared
                .as_ref()
                .and_then(|v| v.get("rhx_gis"))
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        Ok(self.rhx_gis.clone())
    }

    /// Session headers plus an integrity token bound to `variables`.
    ///
    /// A page that exposes no nonce still produces headers; the token is then
    /// derived from the placeholder and the platform may reject it.
    pub async fn signed_headers(&mut self, variables: &GisVariables) -> Result<HeaderMap> {
        let nonce = self.rhx_gis().await?;
        let token = gis_token(nonce.as_deref(), variables);
        self.session_headers(self.session.as_ref(), Some(&token))
    }

    /// Fetch an account's profile page and extract its fields.
    pub async fn get_account(&self, username: &str) -> Result<Account> {
        pacing::pause(self.pacing.as_ref()).await;
        let url = endpoints::account_page_url(&self.base_url, username);
        let headers = self.session_headers(self.session.as_ref(), None)?;
        let response = self.http.get(&url).headers(headers).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(
                "account with given username does not exist".into(),
            ));
        }
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(Error::Platform {
                status: status.as_u16(),
                body,
            });
        }

        let Some(shared) = page::extract_shared_data(&body)? else {
            return Err(Error::Platform {
                status: status.as_u16(),
                body: "embedded shared data not found on profile page".into(),
            });
        };

        let user = shared
            .get("entry_data")
            .and_then(|v| v.get("ProfilePage"))
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("graphql"))
            .and_then(|v| v.get("user"))
            .filter(|v| !v.is_null());

        let Some(user) = user else {
            return Err(Error::NotFound(
                "account with this username does not exist".into(),
            ));
        };

        Ok(Account::from_graphql_user(user)?)
    }
}
