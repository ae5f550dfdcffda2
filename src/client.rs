use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::load_config;
use crate::envelope::Envelope;
use crate::error::format_api_error;
use crate::util::{decode_body, retriable_status, urljoin};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL, typically `https://opendata.aemet.es/opendata/api`.
    pub url: String,
    /// OpenData API key (a JWT issued by AEMET).
    pub token: String,
}

/// Anything that can resolve an API path to its JSON payload.
///
/// [`Client`] is the real implementation; the exporters only depend on this.
pub trait DataSource {
    /// Fetches `path` (relative to the API base) and returns the payload
    /// behind the envelope's `datos` link.
    fn fetch(&self, path: &str) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    token: HeaderValue,

    timeout: Duration,
    retry_max: usize,
    retry_wait: Duration,

    http: HttpClient,
}

impl Client {
    /// Creates a client using environment variables and/or `.aemetrc`.
    ///
    /// This is equivalent to `Client::new(None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`token` arguments
    /// - environment variables `AEMET_API_URL` / `AEMET_API_TOKEN`
    /// - config file from `AEMET_RC` or `.aemetrc`
    ///
    /// Fails without touching the network when no token is found.
    pub fn new(url: Option<String>, token: Option<String>) -> Result<Self> {
        let cfg = load_config(url, token)?;
        Self::with_config(cfg)
    }

    pub fn with_config(cfg: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("aemet-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("aemet-rs")),
        );

        let mut token = HeaderValue::from_str(cfg.token.trim())
            .context("API token contains characters not allowed in an HTTP header")?;
        token.set_sensitive(true);

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            url: cfg.url,
            token,
            timeout: Duration::from_secs(60),
            retry_max: 5,
            retry_wait: Duration::from_secs(60),
            http,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per request, including the first. Zero is treated as one.
    pub fn with_retry_max(mut self, retry_max: usize) -> Self {
        self.retry_max = retry_max;
        self
    }

    pub fn with_retry_wait(mut self, retry_wait: Duration) -> Self {
        self.retry_wait = retry_wait;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    fn apply_auth(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("api_key", self.token.clone())
    }

    fn get(&self, url: &str) -> Result<Response> {
        self.robust_request(|| {
            self.apply_auth(self.http.get(url))
                .timeout(self.timeout)
                .send()
        })
    }

    fn resolve_envelope(&self, url: &str) -> Result<String> {
        let resp = self.get(url)?;
        let status = resp.status();
        let text = resp
            .text()
            .with_context(|| format!("failed to read API reply ({})", url))?;

        // The envelope is also used for failures, often with HTTP 200.
        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => {
                debug!(
                    url,
                    estado = envelope.estado,
                    metadatos = ?envelope.metadatos,
                    "API envelope"
                );
                envelope.data_url(url)
            }
            Err(_) if !status.is_success() => {
                Err(format_api_error(status.as_u16(), url, text.trim()))
            }
            Err(e) => Err(e).with_context(|| {
                format!("failed to parse API envelope (url={}, status={})", url, status)
            }),
        }
    }

    fn download_json(&self, data_url: &str) -> Result<Value> {
        let resp = self
            .get(data_url)?
            .error_for_status()
            .with_context(|| format!("data request failed ({})", data_url))?;
        let bytes = resp
            .bytes()
            .with_context(|| format!("failed to read data body ({})", data_url))?;
        let text = decode_body(&bytes);

        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse data JSON (url={})", data_url))
    }

    fn robust_request<F>(&self, mut f: F) -> Result<Response>
    where
        F: FnMut() -> std::result::Result<Response, reqwest::Error>,
    {
        let retry_max = self.retry_max.max(1);
        let mut tries = 0usize;
        loop {
            let result = f();
            tries += 1;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if retriable_status(status.as_u16()) && tries < retry_max {
                        warn!(
                            %status,
                            url = %resp.url(),
                            attempt = tries,
                            "retriable HTTP status, waiting {:?}",
                            self.retry_wait
                        );
                        thread::sleep(self.retry_wait);
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if tries >= retry_max {
                        return Err(err).context("could not connect");
                    }
                    warn!(error = %err, attempt = tries, "connection error, waiting {:?}", self.retry_wait);
                    thread::sleep(self.retry_wait);
                }
            }
        }
    }
}

impl DataSource for Client {
    fn fetch(&self, path: &str) -> Result<Value> {
        if path.trim().is_empty() {
            bail!("empty API path");
        }
        let url = urljoin(&self.url, path);
        let data_url = self.resolve_envelope(&url)?;
        debug!(%data_url, "following datos link");
        self.download_json(&data_url)
    }
}
