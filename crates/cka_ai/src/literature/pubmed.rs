use std::time::Duration;

use cka_core::config::LiteratureConfig;
use cka_core::error::AppError;
use serde::Deserialize;

use super::{ExternalRecord, LiteratureSource};

/// NCBI E-utilities client: `esearch` for ids, `efetch` for plain-text abstracts.
#[derive(Clone)]
pub struct PubMedClient {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for PubMedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubMedClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

pub fn reference_id(pmid: &str) -> String {
    format!("pubmed_{pmid}")
}

pub fn reference_url(pmid: &str) -> String {
    format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/")
}

/// Decode an `esearch` JSON body into its id list.
pub fn parse_search_response(body: &str) -> Result<Vec<String>, AppError> {
    let resp: ESearchResponse = serde_json::from_str(body).map_err(|e| {
        AppError::new("LIT_SEARCH_FAILED", "Failed to decode PubMed search response")
            .with_details(e.to_string())
    })?;
    Ok(resp
        .esearchresult
        .idlist
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect())
}

fn is_record_header(line: &str) -> bool {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && line[digits..].starts_with(". ")
}

/// Split an `efetch` abstract blob into records. A record starts at a numbered header line
/// ("1. Journal ...") that follows a blank line or the start of the blob.
pub fn split_records(blob: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut prev_blank = true;

    for line in blob.lines() {
        let line = line.trim_end();
        if prev_blank && is_record_header(line) && !current.trim().is_empty() {
            records.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
        prev_blank = line.trim().is_empty();
    }
    if !current.trim().is_empty() {
        records.push(current.trim().to_string());
    }
    records
}

fn mentions_pmid(record: &str, pmid: &str) -> bool {
    record.match_indices("PMID:").any(|(pos, m)| {
        let rest = record[pos + m.len()..].trim_start();
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits == pmid
    })
}

/// Best-effort attribution of abstract text to each id: the record carrying `PMID: <id>`, else
/// the record at the same position when the counts line up, else the whole blob.
pub fn attribute_abstracts(blob: &str, ids: &[String]) -> Vec<(String, String)> {
    let records = split_records(blob);
    let positional = records.len() == ids.len();
    let whole = blob.trim();

    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let text = records
                .iter()
                .find(|r| mentions_pmid(r, id))
                .map(String::as_str)
                .or_else(|| positional.then(|| records[i].as_str()))
                .unwrap_or(whole);
            (id.clone(), text.to_string())
        })
        .collect()
}

fn call_failed(code: &str, message: &str, err: ureq::Error) -> AppError {
    match err {
        ureq::Error::Status(status, _) => {
            AppError::new(code, message).with_details(format!("status={status}"))
        }
        ureq::Error::Transport(t) => AppError::new(code, message)
            .with_details(t.to_string())
            .with_retryable(true),
    }
}

impl PubMedClient {
    pub fn new(config: &LiteratureConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn request(&self, endpoint: &str) -> ureq::Request {
        let req = ureq::get(&format!("{}/{endpoint}", self.base_url))
            .timeout(self.timeout)
            .query("db", "pubmed");
        match &self.api_key {
            Some(key) => req.query("api_key", key),
            None => req,
        }
    }
}

impl LiteratureSource for PubMedClient {
    fn name(&self) -> &str {
        "PubMed"
    }

    fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, AppError> {
        let resp = self
            .request("esearch.fcgi")
            .query("term", query)
            .query("retmax", &max_results.to_string())
            .query("retmode", "json")
            .call()
            .map_err(|e| call_failed("LIT_SEARCH_FAILED", "PubMed search request failed", e))?;
        let body = resp.into_string().map_err(|e| {
            AppError::new("LIT_SEARCH_FAILED", "Failed to read PubMed search response")
                .with_details(e.to_string())
        })?;
        let mut ids = parse_search_response(&body)?;
        ids.truncate(max_results);
        Ok(ids)
    }

    fn fetch(&self, ids: &[String]) -> Result<Vec<ExternalRecord>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let resp = self
            .request("efetch.fcgi")
            .query("id", &ids.join(","))
            .query("rettype", "abstract")
            .query("retmode", "text")
            .call()
            .map_err(|e| call_failed("LIT_FETCH_FAILED", "PubMed fetch request failed", e))?;
        let blob = resp.into_string().map_err(|e| {
            AppError::new("LIT_FETCH_FAILED", "Failed to read PubMed fetch response")
                .with_details(e.to_string())
        })?;
        if blob.trim().is_empty() {
            return Err(AppError::new("LIT_FETCH_FAILED", "PubMed fetch returned no text"));
        }

        Ok(attribute_abstracts(&blob, ids)
            .into_iter()
            .map(|(pmid, text)| ExternalRecord {
                id: reference_id(&pmid),
                text: format!("PubMed ID {pmid} abstract:\n{text}"),
                url: reference_url(&pmid),
            })
            .collect())
    }
}
