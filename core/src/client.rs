//! Stateless HTTP request builder and response parser for the subset API.
//!
//! # Design
//! `SubsetClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and, where the response has to be interpreted, a `parse_*`
//! method that consumes the `HttpResponse`. `SubsetManager` drives the
//! round-trips; the split keeps every URL and body testable without a server.

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Collection, NamedEntry, SaveAsBody, Subset, SubsetRecord, Visibility};
use crate::url::{collection_path, escape_segment, subset_path};

const GET_SUBSET_QUERY: &str =
    "?$expand=Hierarchy($select=Dimension,Name),Elements($select=Name)&$select=*,Alias";
const NAMES_QUERY: &str = "?$select=Name";

/// Synchronous, stateless client for the subset endpoints of one server.
#[derive(Debug, Clone)]
pub struct SubsetClient {
    base_url: String,
}

impl SubsetClient {
    /// `base_url` is the API root, e.g. `http://localhost:8010/api/v1`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn build_create(&self, subset: &Subset, visibility: Visibility) -> Result<HttpRequest, ApiError> {
        let path = collection_path(&subset.dimension_name, Some(&subset.hierarchy_name), visibility);
        Ok(self.json_request(HttpMethod::Post, &path, subset.body()?))
    }

    pub fn build_get(
        &self,
        name: &str,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> HttpRequest {
        let path = subset_path(dimension, hierarchy, visibility, name);
        self.request(HttpMethod::Get, &format!("{path}{GET_SUBSET_QUERY}"))
    }

    pub fn build_get_all_names(
        &self,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> HttpRequest {
        let path = collection_path(dimension, hierarchy, visibility);
        self.request(HttpMethod::Get, &format!("{path}{NAMES_QUERY}"))
    }

    /// PATCH the subset with its own body.
    pub fn build_update(&self, subset: &Subset, visibility: Visibility) -> Result<HttpRequest, ApiError> {
        let path = subset_path(
            &subset.dimension_name,
            Some(&subset.hierarchy_name),
            visibility,
            &subset.name,
        );
        Ok(self.json_request(HttpMethod::Patch, &path, subset.body()?))
    }

    pub fn build_make_static(
        &self,
        name: &str,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> Result<HttpRequest, ApiError> {
        let path = subset_path(dimension, hierarchy, visibility, name);
        let body = serde_json::to_string(&SaveAsBody {
            name,
            make_private: visibility.is_private(),
            make_static: true,
        })
        .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(self.json_request(HttpMethod::Post, &format!("{path}/tm1.SaveAs"), body))
    }

    pub fn build_delete(
        &self,
        name: &str,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> HttpRequest {
        self.request(HttpMethod::Delete, &subset_path(dimension, hierarchy, visibility, name))
    }

    pub fn build_delete_element(
        &self,
        element: &str,
        name: &str,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> HttpRequest {
        let path = subset_path(dimension, hierarchy, visibility, name);
        self.request(
            HttpMethod::Delete,
            &format!("{path}/Elements('{}')", escape_segment(element)),
        )
    }

    pub fn build_exists(
        &self,
        name: &str,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> HttpRequest {
        self.request(HttpMethod::Get, &subset_path(dimension, hierarchy, visibility, name))
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Subset, ApiError> {
        check_success(&response)?;
        let record: SubsetRecord = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        Subset::try_from(record)
    }

    pub fn parse_get_all_names(&self, response: HttpResponse) -> Result<Vec<String>, ApiError> {
        check_success(&response)?;
        let names: Collection<NamedEntry> = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        Ok(names.value.into_iter().map(|entry| entry.name).collect())
    }

    /// 404 means "does not exist"; any other failure is an error.
    pub fn parse_exists(&self, response: HttpResponse) -> Result<bool, ApiError> {
        match check_success(&response) {
            Ok(()) => Ok(true),
            Err(ApiError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request(&self, method: HttpMethod, path: &str, body: String) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
pub(crate) fn check_success(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
