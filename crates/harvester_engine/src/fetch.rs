use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use url::Url;

use crate::decode::decode_page;
use crate::source::{Advancer, Page, PageBuffer};
use crate::{AdvanceError, FailureKind};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            user_agent: None,
        }
    }
}

/// How listing page numbers map onto URLs.
///
/// Page 1 is `start_url` itself; page `n > 1` adds `{page_param}={n}` to its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paging {
    pub start_url: String,
    pub page_param: String,
}

impl Paging {
    pub fn new(start_url: impl Into<String>, page_param: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            page_param: page_param.into(),
        }
    }

    pub fn page_url(&self, page: u64) -> Result<Url, AdvanceError> {
        let mut url = Url::parse(&self.start_url)
            .map_err(|err| AdvanceError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if page > 1 {
            url.query_pairs_mut()
                .append_pair(&self.page_param, &page.to_string());
        }
        Ok(url)
    }
}

/// Advancer for sources paginated by a page-number query parameter.
///
/// Each advance fetches the next page and stores its decoded HTML in the shared
/// [`PageBuffer`] for the extractors to read.
pub struct PagedHttpAdvancer {
    settings: FetchSettings,
    paging: Paging,
    buffer: PageBuffer,
    client: Option<reqwest::Client>,
    current_page: u64,
}

impl PagedHttpAdvancer {
    pub fn new(settings: FetchSettings, paging: Paging, buffer: PageBuffer) -> Self {
        Self {
            settings,
            paging,
            buffer,
            client: None,
            current_page: 0,
        }
    }

    /// Page number currently held in the buffer (0 before `open`).
    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    fn build_client(&self) -> Result<reqwest::Client, AdvanceError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(
                self.settings.redirect_limit,
            ));
        if let Some(agent) = self.settings.user_agent.as_deref() {
            let mut headers = reqwest::header::HeaderMap::new();
            let value = agent
                .parse()
                .map_err(|_| AdvanceError::other("user agent is not a valid header value"))?;
            headers.insert(USER_AGENT, value);
            builder = builder.default_headers(headers);
        }
        builder
            .build()
            .map_err(|err| AdvanceError::new(FailureKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }

    async fn fetch_page(&mut self, page: u64) -> Result<(), AdvanceError> {
        let url = self.paging.page_url(page)?;
        if self.client.is_none() {
            self.client = Some(self.build_client()?);
        }
        let Some(client) = self.client.as_ref() else {
            return Err(AdvanceError::other("http client unavailable"));
        };

        engine_debug!("Fetching page {} from {}", page, url);
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if is_overload_status(status) {
            return Err(AdvanceError::overload(format!("page {page}: {status}")));
        }
        if !status.is_success() {
            return Err(AdvanceError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("page {page}: {status}"),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(AdvanceError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(AdvanceError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(AdvanceError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let html = decode_page(&bytes, content_type.as_deref());
        self.buffer.store(Page {
            url: final_url,
            html,
        });
        self.current_page = page;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Advancer for PagedHttpAdvancer {
    async fn open(&mut self) -> Result<(), AdvanceError> {
        self.fetch_page(1).await?;
        engine_info!("Loaded first page: {}", self.paging.start_url);
        Ok(())
    }

    async fn advance(&mut self) -> Result<(), AdvanceError> {
        self.fetch_page(self.current_page + 1).await
    }

    async fn close(&mut self) {
        self.client = None;
        self.buffer.clear();
        engine_debug!("Closed http session at page {}", self.current_page);
    }
}

fn is_overload_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::TOO_MANY_REQUESTS
    )
}

fn map_reqwest_error(err: reqwest::Error) -> AdvanceError {
    if err.is_timeout() {
        return AdvanceError::new(FailureKind::Timeout, err.to_string());
    }
    AdvanceError::new(FailureKind::Network, err.to_string())
}
