use std::time::Duration;

use log::debug;
use reqwest::Method;
use url::Url;

use crate::error::{QbError, QbResult};

/// Issues a single GET; the caller decides what a failure means.
pub async fn http_get(url: &str, query: &[(&str, &str)], timeout_secs: u64) -> QbResult<Vec<u8>> {
    let client = reqwest::Client::new();

    let response = client
        .request(Method::GET, url)
        .timeout(Duration::from_secs(timeout_secs))
        .query(query)
        .send()
        .await?;

    if response.status().is_success() {
        Ok(response.bytes().await?.to_vec())
    } else {
        debug!("[HTTP Status Error] {response:?}");

        Err(QbError::HttpStatusError {
            status: response.status().to_string(),
            request: response.url().path().to_string(),
        })
    }
}

pub fn join_url(base_url: &str, extend_url: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base_url)?;

    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(extend_url.split('/').filter(|s| !s.is_empty()));

    Ok(url.to_string())
}

/// Builds `path?k=v&...` with form encoding, for redirects and page links.
pub fn path_with_query(path: &str, query: &[(&str, &str)]) -> String {
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();

    if encoded.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{encoded}")
    }
}
