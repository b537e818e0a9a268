use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

const DEFAULT_ENDPOINT: &str = "https://api.refinitiv.com/data/datagrid/beta1/standard";
const APP_KEY_VAR: &str = "REFSCRAPER_APP_KEY";
const ENDPOINT_VAR: &str = "REFSCRAPER_ENDPOINT";

/// Query options the provider recognizes. Serialized with the vendor's
/// short names; unset options are omitted from the request entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parameters {
    #[serde(rename = "SDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "EDate", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(rename = "Frq", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(rename = "Curn", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// One query's worth of provider rows, columnar: `rows[i]` is aligned with
/// `columns`. The schema is whatever the provider returned for the fields
/// requested; this crate never interprets it.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Outcome taxonomy for one query. `Provider` is the only recoverable kind:
/// the loop logs it and moves to the next item. `Fatal` aborts the run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider rejected this request (unknown identifier, entitlement,
    /// throttling). Scoped to one item.
    #[error("provider query failed: {0}")]
    Provider(String),
    /// Transport breakdown or a reply this crate cannot make sense of.
    #[error("{0}")]
    Fatal(String),
}

/// The narrow seam in front of the vendor: one identifier list, one field
/// list, one parameter map, one tabular answer.
pub trait DataProvider {
    fn get_data(
        &self,
        universe: &[&str],
        fields: &[&str],
        params: &Parameters,
    ) -> Result<RowSet, FetchError>;
}

/// Blocking HTTP client for the vendor's datagrid endpoint.
pub struct HttpProvider {
    client: reqwest::blocking::Client,
    endpoint: Url,
    app_key: String,
}

impl HttpProvider {
    /// Build a provider session from the environment. A missing app key is
    /// a startup failure; there is nothing useful to do without one.
    pub fn from_env() -> Result<Self> {
        let app_key = env::var(APP_KEY_VAR)
            .with_context(|| format!("{APP_KEY_VAR} is not set; a provider app key is required"))?;
        let raw = env::var(ENDPOINT_VAR).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let endpoint =
            Url::parse(&raw).with_context(|| format!("invalid provider endpoint `{raw}`"))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            app_key,
        })
    }
}

#[derive(Serialize)]
struct DataGridRequest<'a> {
    universe: &'a [&'a str],
    fields: &'a [&'a str],
    parameters: &'a Parameters,
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    error: Option<ReplyError>,
    #[serde(default)]
    headers: Vec<ReplyHeader>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct ReplyError {
    code: Option<i64>,
    message: String,
}

#[derive(Deserialize)]
struct ReplyHeader {
    name: String,
}

impl DataProvider for HttpProvider {
    fn get_data(
        &self,
        universe: &[&str],
        fields: &[&str],
        params: &Parameters,
    ) -> Result<RowSet, FetchError> {
        let body = DataGridRequest {
            universe,
            fields,
            parameters: params,
        };
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header("X-Api-Key", &self.app_key)
            .json(&body)
            .send()
            .map_err(|e| FetchError::Fatal(format!("transport failure: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| FetchError::Fatal(format!("reading provider reply: {e}")))?;
        if !status.is_success() {
            // The server answered; a rejection is scoped to this request.
            return Err(FetchError::Provider(format!(
                "HTTP {status}: {}",
                text.trim()
            )));
        }
        parse_reply(&text)
    }
}

/// Decode the columnar reply body. An `error` object is a provider error;
/// a body that does not parse, or rows that disagree with the header count,
/// mean the reply contract itself is broken and the run should stop.
pub fn parse_reply(body: &str) -> Result<RowSet, FetchError> {
    let reply: Reply = serde_json::from_str(body)
        .map_err(|e| FetchError::Fatal(format!("malformed provider reply: {e}")))?;
    if let Some(err) = reply.error {
        return Err(FetchError::Provider(match err.code {
            Some(code) => format!("{} (code {code})", err.message),
            None => err.message,
        }));
    }
    let columns: Vec<String> = reply.headers.into_iter().map(|h| h.name).collect();
    for (i, row) in reply.data.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(FetchError::Fatal(format!(
                "provider reply row {i} has {} cells for {} columns",
                row.len(),
                columns.len()
            )));
        }
    }
    Ok(RowSet {
        columns,
        rows: reply.data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_columnar_reply() {
        let body = r#"{
            "headers": [{"name": "Instrument"}, {"name": "Price Close"}],
            "data": [["US0000000001", 10.5], ["US0000000001", 11.0]]
        }"#;
        let set = parse_reply(body).unwrap();
        assert_eq!(set.columns, vec!["Instrument", "Price Close"]);
        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.rows[0][1], json!(10.5));
    }

    #[test]
    fn error_object_is_a_provider_error() {
        let body = r#"{"error": {"code": 416, "message": "Unable to resolve identifier"}}"#;
        match parse_reply(body) {
            Err(FetchError::Provider(msg)) => {
                assert!(msg.contains("Unable to resolve identifier"));
                assert!(msg.contains("416"));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_is_fatal() {
        match parse_reply("<html>gateway timeout</html>") {
            Err(FetchError::Fatal(msg)) => assert!(msg.contains("malformed")),
            other => panic!("expected fatal error, got {other:?}"),
        }
    }

    #[test]
    fn ragged_rows_are_fatal() {
        let body = r#"{
            "headers": [{"name": "A"}, {"name": "B"}],
            "data": [["x"]]
        }"#;
        assert!(matches!(parse_reply(body), Err(FetchError::Fatal(_))));
    }

    #[test]
    fn unset_parameters_are_omitted_from_the_request() {
        let params = Parameters {
            start_date: Some("2023-01-01".to_string()),
            ..Default::default()
        };
        let encoded = serde_json::to_value(&params).unwrap();
        assert_eq!(encoded, json!({"SDate": "2023-01-01"}));
    }
}
