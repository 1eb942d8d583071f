use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::num::NonZeroUsize;
use url::Url;

use crate::error::LoaderError;

pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// One page of a listing, as the loader sees it
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse<T> {
    pub results: Vec<T>,
    /// Total size of the whole result set. Only read from the first page.
    pub total_count: Option<usize>,
}

/// Field names of the backend's paged JSON envelope
///
/// Converts a raw body into a [`PageResponse`] so that backend shape drift
/// stays out of the loader. Bodies that are a bare JSON array are accepted
/// as a complete single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseShape {
    results_field: String,
    count_field: String,
}

impl Default for ResponseShape {
    fn default() -> Self {
        Self::new("results", "count")
    }
}

impl ResponseShape {
    pub fn new(results_field: &str, count_field: &str) -> Self {
        Self {
            results_field: results_field.to_string(),
            count_field: count_field.to_string(),
        }
    }

    pub fn parse<T: DeserializeOwned>(&self, body: &Value) -> Result<PageResponse<T>, LoaderError> {
        match body {
            Value::Array(items) => Ok(PageResponse {
                results: Vec::<T>::deserialize(body)?,
                total_count: Some(items.len()),
            }),
            Value::Object(map) => {
                let results = match map.get(&self.results_field) {
                    Some(value @ Value::Array(_)) => Vec::<T>::deserialize(value)?,
                    Some(_) => {
                        return Err(LoaderError::MalformedResponse(format!(
                            "field '{}' is not an array",
                            self.results_field
                        )));
                    }
                    None => {
                        return Err(LoaderError::MalformedResponse(format!(
                            "missing field '{}'",
                            self.results_field
                        )));
                    }
                };

                let total_count = match map.get(&self.count_field) {
                    None | Some(Value::Null) => None,
                    Some(value) => match value.as_u64() {
                        Some(count) => Some(count as usize),
                        None => {
                            return Err(LoaderError::MalformedResponse(format!(
                                "field '{}' is not a count, got {}",
                                self.count_field,
                                json_kind(value)
                            )));
                        }
                    },
                };

                Ok(PageResponse {
                    results,
                    total_count,
                })
            }
            other => Err(LoaderError::MalformedResponse(format!(
                "expected an object or array, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Build the URL of a 1-based page, keeping any existing query parameters
/// except previous paging ones.
pub fn page_url(base: &Url, page: usize, page_size: NonZeroUsize) -> Url {
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM && key != PAGE_SIZE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = base.clone();
    url.set_query(None);
    url.query_pairs_mut()
        .extend_pairs(retained)
        .append_pair(PAGE_PARAM, &page.to_string())
        .append_pair(PAGE_SIZE_PARAM, &page_size.to_string());
    url
}
