//! Thin client for the two E-utilities calls the pipeline needs: ESearch with
//! the history server enabled, and EFetch of GenBank text from that history.

use crate::app::ports::{HttpClientPort, HttpGetResult, RateLimiterPort};
use crate::config::EntrezConfig;
use crate::constants::{EFETCH_ENDPOINT, ESEARCH_ENDPOINT, NUCLEOTIDE_DB};
use crate::error::{Result, RetrieverError};
use crate::types::{SearchHandle, TaxId};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Longest slice of an error body carried into an error message
const ERROR_BODY_PREVIEW: usize = 300;

#[derive(Debug, Clone)]
pub struct EntrezSettings {
    pub base_url: String,
    pub tool: String,
    pub email: String,
    pub api_key: Option<String>,
    pub max_tries: u32,
    pub retry_delay: Duration,
}

impl EntrezSettings {
    pub fn from_config(config: &EntrezConfig) -> Result<Self> {
        let email = config
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| RetrieverError::MissingField("email".into()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tool: config.tool.clone(),
            email,
            api_key: config.api_key.clone(),
            max_tries: config.max_tries.max(1),
            retry_delay: config.retry_delay(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    count: Option<String>,
    webenv: Option<String>,
    querykey: Option<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

pub struct EntrezClient<H: HttpClientPort + ?Sized, R: RateLimiterPort + ?Sized> {
    http: Box<H>,
    rate: Box<R>,
    settings: EntrezSettings,
}

impl<H: HttpClientPort + ?Sized, R: RateLimiterPort + ?Sized> EntrezClient<H, R> {
    pub fn new(http: Box<H>, rate: Box<R>, settings: EntrezSettings) -> Self {
        Self { http, rate, settings }
    }

    /// Run an organism search and keep the result on the history server.
    #[instrument(skip_all, fields(taxid = %taxid))]
    pub async fn search(&self, taxid: &TaxId) -> Result<SearchHandle> {
        let mut query = vec![
            param("db", NUCLEOTIDE_DB),
            param("term", taxid.search_term()),
            param("usehistory", "y"),
            param("retmax", "0"),
            param("retmode", "json"),
        ];
        query.extend(self.common_params());

        let resp = self.get_with_retry(ESEARCH_ENDPOINT, &query).await?;
        let handle = parse_esearch(&resp.bytes)?;
        debug!(count = handle.count, query_key = %handle.query_key, "esearch complete");
        Ok(handle)
    }

    /// Fetch one page of GenBank flat-file text from a previous search.
    #[instrument(skip(self, handle), fields(query_key = %handle.query_key))]
    pub async fn fetch_batch(&self, handle: &SearchHandle, start: usize, size: usize) -> Result<String> {
        let mut query = vec![
            param("db", NUCLEOTIDE_DB),
            param("rettype", "gb"),
            param("retmode", "text"),
            param("retstart", start.to_string()),
            param("retmax", size.to_string()),
            param("WebEnv", &handle.web_env),
            param("query_key", &handle.query_key),
        ];
        query.extend(self.common_params());

        let resp = self.get_with_retry(EFETCH_ENDPOINT, &query).await?;
        let body = resp.body_text();
        // an HTML page here is a gateway or maintenance notice, never GenBank
        if resp.is_html() {
            return Err(RetrieverError::Entrez { status: resp.status, message: preview(&body) });
        }
        if let Some(message) = efetch_error(&body) {
            return Err(RetrieverError::Entrez { status: resp.status, message });
        }
        debug!(bytes = resp.bytes.len(), "efetch batch received");
        Ok(body)
    }

    fn common_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            param("tool", &self.settings.tool),
            param("email", &self.settings.email),
        ];
        if let Some(key) = &self.settings.api_key {
            params.push(param("api_key", key));
        }
        params
    }

    async fn get_with_retry(&self, endpoint: &str, query: &[(String, String)]) -> Result<HttpGetResult> {
        let url = format!("{}/{}", self.settings.base_url, endpoint);
        let max_tries = self.settings.max_tries;
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.rate.acquire().await;
            match self.http.get(&url, query).await {
                Ok(resp) if resp.is_success() => return Ok(resp),
                Ok(resp) if resp.is_retryable() && attempt < max_tries => {
                    warn!(endpoint, status = resp.status, attempt, max_tries, "retryable HTTP status, retrying");
                }
                Ok(resp) => {
                    return Err(RetrieverError::Entrez {
                        status: resp.status,
                        message: preview(&resp.body_text()),
                    });
                }
                Err(e) if attempt < max_tries => {
                    warn!(endpoint, attempt, max_tries, error = %e, "request failed, retrying");
                }
                Err(e) => {
                    return Err(RetrieverError::Transport { attempts: attempt, message: e });
                }
            }
            tokio::time::sleep(self.settings.retry_delay).await;
        }
    }
}

fn param(key: &str, value: impl AsRef<str>) -> (String, String) {
    (key.to_string(), value.as_ref().to_string())
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

pub(crate) fn parse_esearch(bytes: &[u8]) -> Result<SearchHandle> {
    let resp: ESearchResponse = serde_json::from_slice(bytes)?;
    if let Some(message) = resp.error {
        return Err(RetrieverError::Entrez { status: 200, message });
    }
    let result = resp
        .esearchresult
        .ok_or_else(|| RetrieverError::MissingField("esearchresult".into()))?;
    if let Some(message) = result.error {
        return Err(RetrieverError::Entrez { status: 200, message });
    }

    let count_text = result
        .count
        .ok_or_else(|| RetrieverError::MissingField("esearchresult.count".into()))?;
    let count: usize = count_text.trim().parse().map_err(|_| {
        RetrieverError::Parse(format!("esearch count is not a number: '{count_text}'"))
    })?;

    // An empty search may legitimately come back without a history entry
    let (web_env, query_key) = match (result.webenv, result.querykey) {
        (Some(w), Some(q)) => (w, q),
        (w, q) if count == 0 => (w.unwrap_or_default(), q.unwrap_or_default()),
        (None, _) => return Err(RetrieverError::MissingField("esearchresult.webenv".into())),
        (_, None) => return Err(RetrieverError::MissingField("esearchresult.querykey".into())),
    };

    Ok(SearchHandle { count, web_env, query_key })
}

/// EFetch reports history and parameter problems in the body of a 200 response.
fn efetch_error(body: &str) -> Option<String> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
        return value.get("error").and_then(|e| e.as_str()).map(str::to_string);
    }
    let start = trimmed.find("<ERROR>")?;
    let rest = &trimmed[start + "<ERROR>".len()..];
    let end = rest.find("</ERROR>").unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>;

    struct ScriptedHttp {
        responses: Mutex<VecDeque<std::result::Result<HttpGetResult, String>>>,
        calls: Calls,
    }

    impl ScriptedHttp {
        fn new(responses: Vec<std::result::Result<HttpGetResult, String>>) -> (Self, Calls) {
            let calls: Calls = Arc::new(Mutex::new(Vec::new()));
            let http = Self {
                responses: Mutex::new(responses.into()),
                calls: calls.clone(),
            };
            (http, calls)
        }
    }

    #[async_trait]
    impl HttpClientPort for ScriptedHttp {
        async fn get(&self, url: &str, query: &[(String, String)]) -> std::result::Result<HttpGetResult, String> {
            self.calls.lock().unwrap().push((url.to_string(), query.to_vec()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("no scripted response".into()))
        }
    }

    struct NoLimit;

    #[async_trait]
    impl RateLimiterPort for NoLimit {
        async fn acquire(&self) {}
    }

    fn ok(status: u16, body: &str) -> std::result::Result<HttpGetResult, String> {
        Ok(HttpGetResult {
            status,
            bytes: body.as_bytes().to_vec(),
            content_type: "text/plain".into(),
        })
    }

    fn settings(api_key: Option<&str>, max_tries: u32) -> EntrezSettings {
        EntrezSettings {
            base_url: "http://eutils.test".into(),
            tool: "seq_retriever".into(),
            email: "me@example.org".into(),
            api_key: api_key.map(str::to_string),
            max_tries,
            retry_delay: Duration::from_millis(1),
        }
    }

    fn client(responses: Vec<std::result::Result<HttpGetResult, String>>, api_key: Option<&str>, max_tries: u32) -> (EntrezClient<ScriptedHttp, NoLimit>, Calls) {
        let (http, calls) = ScriptedHttp::new(responses);
        (EntrezClient::new(Box::new(http), Box::new(NoLimit), settings(api_key, max_tries)), calls)
    }

    fn value<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
        query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    const ESEARCH_OK: &str = r#"{"header":{"type":"esearch","version":"0.3"},"esearchresult":{"count":"1234","retmax":"0","retstart":"0","querykey":"1","webenv":"MCID_abc","idlist":[]}}"#;

    #[tokio::test]
    async fn search_sends_history_query_and_parses_handle() {
        let (client, calls) = client(vec![ok(200, ESEARCH_OK)], Some("KEY"), 3);
        let handle = client.search(&"2697049".parse().unwrap()).await.unwrap();
        assert_eq!(handle, SearchHandle { count: 1234, web_env: "MCID_abc".into(), query_key: "1".into() });

        let calls = calls.lock().unwrap();
        let (url, query) = &calls[0];
        assert_eq!(url, "http://eutils.test/esearch.fcgi");
        assert_eq!(value(query, "db"), Some("nucleotide"));
        assert_eq!(value(query, "term"), Some("txid2697049[Organism]"));
        assert_eq!(value(query, "usehistory"), Some("y"));
        assert_eq!(value(query, "retmax"), Some("0"));
        assert_eq!(value(query, "email"), Some("me@example.org"));
        assert_eq!(value(query, "api_key"), Some("KEY"));
    }

    #[tokio::test]
    async fn api_key_omitted_when_absent() {
        let (client, calls) = client(vec![ok(200, ESEARCH_OK)], None, 3);
        client.search(&"9606".parse().unwrap()).await.unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(value(&calls[0].1, "api_key"), None);
        assert_eq!(value(&calls[0].1, "tool"), Some("seq_retriever"));
    }

    #[test]
    fn esearch_error_field_is_surfaced() {
        let body = br#"{"esearchresult":{"ERROR":"Invalid query"}}"#;
        match parse_esearch(body) {
            Err(RetrieverError::Entrez { message, .. }) => assert_eq!(message, "Invalid query"),
            other => panic!("unexpected: {other:?}"),
        }
        let body = br#"{"error":"API key invalid"}"#;
        assert!(matches!(parse_esearch(body), Err(RetrieverError::Entrez { .. })));
    }

    #[test]
    fn esearch_zero_count_needs_no_history() {
        let handle = parse_esearch(br#"{"esearchresult":{"count":"0","idlist":[]}}"#).unwrap();
        assert_eq!(handle.count, 0);
        assert!(handle.web_env.is_empty());
    }

    #[test]
    fn esearch_missing_webenv_with_hits_is_an_error() {
        let err = parse_esearch(br#"{"esearchresult":{"count":"5","querykey":"1"}}"#).unwrap_err();
        assert!(matches!(err, RetrieverError::MissingField(f) if f.contains("webenv")));
    }

    #[test]
    fn esearch_non_numeric_count_is_a_parse_error() {
        let err = parse_esearch(br#"{"esearchresult":{"count":"lots","webenv":"w","querykey":"1"}}"#).unwrap_err();
        assert!(matches!(err, RetrieverError::Parse(_)));
    }

    #[tokio::test]
    async fn fetch_batch_sends_paging_parameters() {
        let (client, calls) = client(vec![ok(200, "LOCUS       X\n//\n")], None, 1);
        let handle = SearchHandle { count: 250, web_env: "MCID_abc".into(), query_key: "1".into() };
        let body = client.fetch_batch(&handle, 200, 100).await.unwrap();
        assert!(body.starts_with("LOCUS"));

        let calls = calls.lock().unwrap();
        let (url, query) = &calls[0];
        assert_eq!(url, "http://eutils.test/efetch.fcgi");
        assert_eq!(value(query, "rettype"), Some("gb"));
        assert_eq!(value(query, "retmode"), Some("text"));
        assert_eq!(value(query, "retstart"), Some("200"));
        assert_eq!(value(query, "retmax"), Some("100"));
        assert_eq!(value(query, "WebEnv"), Some("MCID_abc"));
        assert_eq!(value(query, "query_key"), Some("1"));
    }

    #[tokio::test]
    async fn fetch_batch_rejects_html_page() {
        let page = Ok(HttpGetResult {
            status: 200,
            bytes: b"<html><body>Service temporarily unavailable</body></html>".to_vec(),
            content_type: "text/html; charset=UTF-8".into(),
        });
        let (client, _) = client(vec![page], None, 1);
        let handle = SearchHandle { count: 1, web_env: "W".into(), query_key: "1".into() };
        match client.fetch_batch(&handle, 0, 100).await {
            Err(RetrieverError::Entrez { status: 200, message }) => {
                assert!(message.contains("temporarily unavailable"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_batch_reports_error_in_ok_body() {
        let body = "<eFetchResult>\n\t<ERROR>Unable to obtain query #1</ERROR>\n</eFetchResult>";
        let (client, _) = client(vec![ok(200, body)], None, 1);
        let handle = SearchHandle { count: 1, web_env: "stale".into(), query_key: "1".into() };
        match client.fetch_batch(&handle, 0, 100).await {
            Err(RetrieverError::Entrez { message, .. }) => assert_eq!(message, "Unable to obtain query #1"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn retryable_status_is_retried_until_success() {
        let (client, calls) = client(
            vec![ok(429, "Too Many Requests"), Err("connection reset".into()), ok(200, ESEARCH_OK)],
            None,
            3,
        );
        let handle = client.search(&"9606".parse().unwrap()).await.unwrap();
        assert_eq!(handle.count, 1234);
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let (client, calls) = client(vec![ok(400, "Bad Request"), ok(200, ESEARCH_OK)], None, 3);
        let err = client.search(&"9606".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, RetrieverError::Entrez { status: 400, .. }));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_gives_up_after_max_tries() {
        let (client, calls) = client(vec![Err("timeout".into()), Err("timeout".into())], None, 2);
        let err = client.search(&"9606".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, RetrieverError::Transport { attempts: 2, .. }));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn settings_require_email() {
        let config = EntrezConfig::default();
        assert!(matches!(EntrezSettings::from_config(&config), Err(RetrieverError::MissingField(_))));
    }
}
