//! Identity platform credentials.
//!
//! Two public-client flows against the Microsoft identity platform v2.0
//! endpoints, both driven by `oauth2`: device code, and authorization code
//! with PKCE through the system browser and a loopback redirect. Both keep the
//! last access token (and refresh token, when issued) in memory and only
//! prompt again once the token has expired and cannot be refreshed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, CsrfToken, DeviceAuthorizationUrl,
    EndpointNotSet, EndpointSet, ErrorResponse, HttpRequest, HttpResponse, PkceCodeChallenge,
    RedirectUrl, RefreshToken, RequestTokenError, Scope as OAuthScope,
    StandardDeviceAuthorizationResponse, TokenResponse, TokenUrl,
};
use reqwest::{Client, Url};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::GraphError;
use crate::types::{AccessToken, DeviceCodeInfo};

pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Public client used by the interactive flow when no client id is configured
pub const DEFAULT_INTERACTIVE_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

/// Authority used by the interactive flow when no tenant is configured
pub const DEFAULT_INTERACTIVE_TENANT: &str = "organizations";

/// How long the loopback listener waits for the browser redirect
const INTERACTIVE_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound on device code polling, whatever lifetime the service reports
const MAX_DEVICE_CODE_WAIT: Duration = Duration::from_secs(30 * 60);

/// Token lifetime assumed when the response carries no `expires_in`
const DEFAULT_TOKEN_LIFETIME_S: u64 = 3600;

type TokenClient = BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type DeviceCodeClient = BasicClient<EndpointNotSet, EndpointSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type AuthCodeClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Source of bearer tokens for Graph requests
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scopes: &[String]) -> Result<AccessToken>;
}

/// Which sign-in flow a session uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFlow {
    /// Non-interactive: the user enters a code on another device
    DeviceCode { client_id: String, tenant_id: String },
    /// A browser is opened on this machine
    Interactive {
        client_id: Option<String>,
        tenant_id: Option<String>,
    },
}

impl AuthFlow {
    /// Pick the flow for `interactive`.
    ///
    /// The device code flow needs both identifiers; the interactive flow falls
    /// back to the public client and the `organizations` authority.
    pub fn select(
        interactive: bool,
        client_id: Option<&str>,
        tenant_id: Option<&str>,
    ) -> std::result::Result<Self, GraphError> {
        let client_id = non_empty(client_id);
        let tenant_id = non_empty(tenant_id);

        if interactive {
            return Ok(AuthFlow::Interactive {
                client_id,
                tenant_id,
            });
        }

        match (client_id, tenant_id) {
            (Some(client_id), Some(tenant_id)) => Ok(AuthFlow::DeviceCode {
                client_id,
                tenant_id,
            }),
            _ => Err(GraphError::authorization(
                "client id and tenant id are required for device code flow",
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthFlow::DeviceCode { .. } => "device-code",
            AuthFlow::Interactive { .. } => "interactive-browser",
        }
    }

    /// Build the credential implementing this flow
    pub fn into_credential(self, redirect_port: u16) -> Result<Arc<dyn TokenCredential>> {
        let http = oauth_http_client()?;
        let credential: Arc<dyn TokenCredential> = match self {
            AuthFlow::DeviceCode {
                client_id,
                tenant_id,
            } => Arc::new(DeviceCodeCredential::new(http, client_id, tenant_id)),
            AuthFlow::Interactive {
                client_id,
                tenant_id,
            } => Arc::new(InteractiveBrowserCredential::new(
                http,
                client_id.unwrap_or_else(|| DEFAULT_INTERACTIVE_CLIENT_ID.to_string()),
                tenant_id.unwrap_or_else(|| DEFAULT_INTERACTIVE_TENANT.to_string()),
                redirect_port,
            )),
        };
        Ok(credential)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Token endpoints must not follow redirects
fn oauth_http_client() -> Result<Client> {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to build OAuth HTTP client")
}

/// Send an `oauth2` request through reqwest
async fn execute(http: &Client, request: HttpRequest) -> std::result::Result<HttpResponse, reqwest::Error> {
    let response = http.execute(reqwest::Request::try_from(request)?).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;

    let mut out = HttpResponse::new(body.to_vec());
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    Ok(out)
}

fn endpoint(tenant_id: &str, name: &str) -> String {
    format!("{}/{}/oauth2/v2.0/{}", AUTHORITY_HOST, tenant_id, name)
}

/// Requested scopes plus `offline_access`, which asks for a refresh token
fn oauth_scopes(scopes: &[String]) -> impl Iterator<Item = OAuthScope> + '_ {
    scopes
        .iter()
        .cloned()
        .chain(std::iter::once("offline_access".to_string()))
        .map(OAuthScope::new)
}

/// OAuth error responses carry `error: error_description`; everything else
/// is a transport or parse failure.
fn describe<RE, T>(err: &RequestTokenError<RE, T>) -> String
where
    RE: std::error::Error + 'static,
    T: ErrorResponse + fmt::Display + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => response.to_string(),
        other => format!("{}", other),
    }
}

fn device_code_timeout(expires_in: Duration) -> Duration {
    expires_in.min(MAX_DEVICE_CODE_WAIT)
}

/// Cached tokens of a signed-in credential
#[derive(Debug, Clone)]
struct TokenState {
    access: AccessToken,
    refresh: Option<String>,
}

impl From<BasicTokenResponse> for TokenState {
    fn from(res: BasicTokenResponse) -> Self {
        let lifetime = res
            .expires_in()
            .map_or(DEFAULT_TOKEN_LIFETIME_S, |d| d.as_secs());
        Self {
            access: AccessToken::new(res.access_token().secret().clone(), lifetime),
            refresh: res.refresh_token().map(|t| t.secret().clone()),
        }
    }
}

/// Cached access token, or a refreshed one. `None` means a full sign-in is needed.
async fn reuse_or_refresh(
    http: &Client,
    client: &TokenClient,
    state: &mut Option<TokenState>,
    scopes: &[String],
) -> Option<AccessToken> {
    let current = state.as_ref()?;
    if !current.access.is_expired() {
        return Some(current.access.clone());
    }
    let refresh = RefreshToken::new(current.refresh.clone()?);

    let http = http.clone();
        let send = move |request: HttpRequest| {
            let http = http.clone();
            async move { execute(&http, request).await }
        };
    let result = client
        .exchange_refresh_token(&refresh)
        .add_scopes(oauth_scopes(scopes))
        .request_async(&send)
        .await;

    match result {
        Ok(token) => {
            debug!("Access token refreshed");
            let mut next = TokenState::from(token);
            if next.refresh.is_none() {
                next.refresh = Some(refresh.secret().clone());
            }
            let access = next.access.clone();
            *state = Some(next);
            Some(access)
        }
        Err(err) => {
            warn!(error = %describe(&err), "Token refresh failed");
            None
        }
    }
}

fn token_client(client_id: &str, tenant_id: &str) -> Result<TokenClient> {
    Ok(BasicClient::new(ClientId::new(client_id.to_string()))
        .set_auth_type(AuthType::RequestBody)
        .set_token_uri(TokenUrl::new(endpoint(tenant_id, "token"))?))
}

type DeviceCodePrompt = Arc<dyn Fn(&DeviceCodeInfo) + Send + Sync>;

/// Device code flow credential
pub struct DeviceCodeCredential {
    http: Client,
    client_id: String,
    tenant_id: String,
    prompt: DeviceCodePrompt,
    state: Mutex<Option<TokenState>>,
}

impl DeviceCodeCredential {
    pub fn new(http: Client, client_id: String, tenant_id: String) -> Self {
        Self {
            http,
            client_id,
            tenant_id,
            prompt: Arc::new(default_device_code_prompt),
            state: Mutex::new(None),
        }
    }

    /// Replace how the sign-in instructions are shown to the user
    pub fn with_prompt(mut self, prompt: impl Fn(&DeviceCodeInfo) + Send + Sync + 'static) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }

    fn client(&self) -> Result<DeviceCodeClient> {
        Ok(BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_device_authorization_url(DeviceAuthorizationUrl::new(endpoint(
                &self.tenant_id,
                "devicecode",
            ))?)
            .set_token_uri(TokenUrl::new(endpoint(&self.tenant_id, "token"))?))
    }

    /// Request a device code, show it, then poll until the user completes sign-in
    async fn sign_in(&self, scopes: &[String]) -> Result<TokenState> {
        let client = self.client()?;
        let http = self.http.clone();
        let send = move |request: HttpRequest| {
            let http = http.clone();
            async move { execute(&http, request).await }
        };

        let details: StandardDeviceAuthorizationResponse = client
            .exchange_device_code()
            .add_scopes(oauth_scopes(scopes))
            .request_async(&send)
            .await
            .map_err(|e| anyhow!("Failed to generate device code: {}", describe(&e)))?;

        let wait = device_code_timeout(details.expires_in());
        let info = DeviceCodeInfo {
            user_code: details.user_code().secret().clone(),
            verification_uri: details.verification_uri().to_string(),
            expires_in: wait.as_secs(),
        };
        info!(verification_uri = %info.verification_uri, "Waiting for device code sign-in");
        (self.prompt)(&info);

        let token = client
            .exchange_device_access_token(&details)
            .request_async(&send, tokio::time::sleep, Some(wait))
            .await
            .map_err(|e| anyhow!("Device code sign-in failed: {}", describe(&e)))?;

        Ok(TokenState::from(token))
    }
}

fn default_device_code_prompt(info: &DeviceCodeInfo) {
    eprintln!(
        "To sign in, open {} and enter the code {}",
        info.verification_uri, info.user_code
    );
}

#[async_trait]
impl TokenCredential for DeviceCodeCredential {
    async fn get_token(&self, scopes: &[String]) -> Result<AccessToken> {
        let mut state = self.state.lock().await;

        let refresher = token_client(&self.client_id, &self.tenant_id)?;
        if let Some(token) = reuse_or_refresh(&self.http, &refresher, &mut state, scopes).await {
            return Ok(token);
        }

        let signed_in = self.sign_in(scopes).await?;
        let token = signed_in.access.clone();
        *state = Some(signed_in);
        Ok(token)
    }
}

/// Authorization code + PKCE credential that signs in through the system browser
pub struct InteractiveBrowserCredential {
    http: Client,
    client_id: String,
    tenant_id: String,
    redirect_port: u16,
    state: Mutex<Option<TokenState>>,
}

impl InteractiveBrowserCredential {
    /// `redirect_port` 0 picks a free port
    pub fn new(http: Client, client_id: String, tenant_id: String, redirect_port: u16) -> Self {
        Self {
            http,
            client_id,
            tenant_id,
            redirect_port,
            state: Mutex::new(None),
        }
    }

    fn client(&self, redirect_uri: &str) -> Result<AuthCodeClient> {
        Ok(BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(AuthUrl::new(endpoint(&self.tenant_id, "authorize"))?)
            .set_token_uri(TokenUrl::new(endpoint(&self.tenant_id, "token"))?)
            .set_redirect_uri(RedirectUrl::new(redirect_uri.to_string())?))
    }

    /// Authorization URL the browser is sent to, and the CSRF state it carries
    pub fn authorize_url(
        &self,
        redirect_uri: &str,
        scopes: &[String],
        challenge: PkceCodeChallenge,
        state: impl FnOnce() -> CsrfToken,
    ) -> Result<(Url, CsrfToken)> {
        Ok(self
            .client(redirect_uri)?
            .authorize_url(state)
            .add_scopes(oauth_scopes(scopes))
            .set_pkce_challenge(challenge)
            .add_extra_param("response_mode", "query")
            .add_extra_param("prompt", "select_account")
            .url())
    }

    async fn sign_in(&self, scopes: &[String]) -> Result<TokenState> {
        let listener = TcpListener::bind(("127.0.0.1", self.redirect_port))
            .await
            .with_context(|| format!("Failed to bind redirect port {}", self.redirect_port))?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{}", port);

        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf) = self.authorize_url(&redirect_uri, scopes, challenge, CsrfToken::new_random)?;

        info!(port, "Opening browser for sign-in");
        if let Err(err) = open::that(url.as_str()) {
            warn!(error = %err, "Could not open a browser");
            eprintln!("Open this URL in a browser to sign in:\n  {}", url);
        }

        let code = tokio::time::timeout(INTERACTIVE_TIMEOUT, wait_for_code(&listener, csrf.secret()))
            .await
            .map_err(|_| anyhow!("Timed out waiting for browser sign-in"))??;

        let http = self.http.clone();
        let send = move |request: HttpRequest| {
            let http = http.clone();
            async move { execute(&http, request).await }
        };
        let token = self
            .client(&redirect_uri)?
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(verifier)
            .request_async(&send)
            .await
            .map_err(|e| anyhow!("Authorization code exchange failed: {}", describe(&e)))?;

        Ok(TokenState::from(token))
    }
}

#[async_trait]
impl TokenCredential for InteractiveBrowserCredential {
    async fn get_token(&self, scopes: &[String]) -> Result<AccessToken> {
        let mut state = self.state.lock().await;

        let refresher = token_client(&self.client_id, &self.tenant_id)?;
        if let Some(token) = reuse_or_refresh(&self.http, &refresher, &mut state, scopes).await {
            return Ok(token);
        }

        let signed_in = self.sign_in(scopes).await?;
        let token = signed_in.access.clone();
        *state = Some(signed_in);
        Ok(token)
    }
}

/// Outcome of one redirect hitting the loopback listener
#[derive(Debug, PartialEq, Eq)]
enum Callback {
    Code(String),
    Denied(String),
    /// Not a sign-in redirect (favicon, stale state, ...)
    Ignored,
}

/// Accept redirects until one carries the authorization code for `state`
async fn wait_for_code(listener: &TcpListener, state: &str) -> Result<String> {
    loop {
        let (mut socket, _) = listener.accept().await?;
        match handle_redirect(&mut socket, state).await {
            Ok(Callback::Code(code)) => return Ok(code),
            Ok(Callback::Denied(reason)) => bail!("Sign-in was not completed: {}", reason),
            Ok(Callback::Ignored) => continue,
            Err(err) => debug!(error = %err, "Error handling redirect connection"),
        }
    }
}

async fn handle_redirect(socket: &mut TcpStream, state: &str) -> Result<Callback> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    debug!(request = %request_line.trim(), "Received redirect");

    let callback = parse_redirect(&request_line, state);
    let (status, body) = match &callback {
        Callback::Code(_) => ("200 OK", result_page("Signed in. You can close this window.")),
        Callback::Denied(reason) => ("200 OK", result_page(&format!("Sign-in failed: {}", reason))),
        Callback::Ignored => ("404 Not Found", String::new()),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;

    Ok(callback)
}

/// Interpret the request line of a redirect: `GET /?code=...&state=... HTTP/1.1`
fn parse_redirect(request_line: &str, expected_state: &str) -> Callback {
    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return Callback::Ignored;
    };
    let Ok(url) = Url::parse(&format!("http://localhost{}", target)) else {
        return Callback::Ignored;
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error_description" => error = Some(value.into_owned()),
            "error" if error.is_none() => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Callback::Ignored;
    }
    match (code, error) {
        (_, Some(error)) => Callback::Denied(error),
        (Some(code), None) => Callback::Code(code),
        (None, None) => Callback::Ignored,
    }
}

fn result_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>msgraph-lite</title></head>\
         <body style=\"font-family: system-ui; text-align: center; padding: 50px;\">\
         <p>{}</p></body></html>",
        message
    )
}
