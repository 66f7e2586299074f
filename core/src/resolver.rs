//! Evaluation of MDX set expressions into member tuples.
//!
//! Dynamic subsets only store an expression; their members are whatever the
//! engine returns for it. `ElementResolver` is the seam `SubsetManager` uses
//! for that, and `MdxElementResolver` is the implementation that asks the
//! server's `ExecuteMDXSetExpression` action.

use serde::{Deserialize, Serialize};

use crate::client::check_success;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

const EXECUTE_SET_PATH: &str = "/ExecuteMDXSetExpression?$expand=Tuples($expand=Members($select=Name))";

/// One member of a tuple, reduced to the properties requested.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    #[serde(rename = "Name")]
    pub name: String,
}

/// The members of one tuple in the evaluated set, in axis order.
pub type MemberTuple = Vec<Member>;

pub trait ElementResolver {
    /// Evaluate `mdx` and return its tuples in engine order.
    fn execute_set_mdx(&self, mdx: &str) -> Result<Vec<MemberTuple>, ApiError>;
}

impl<R: ElementResolver + ?Sized> ElementResolver for &R {
    fn execute_set_mdx(&self, mdx: &str) -> Result<Vec<MemberTuple>, ApiError> {
        (**self).execute_set_mdx(mdx)
    }
}

#[derive(Serialize)]
struct ExecuteSetBody<'a> {
    #[serde(rename = "MDX")]
    mdx: &'a str,
}

#[derive(Deserialize)]
struct TupleRecord {
    #[serde(rename = "Members")]
    members: Vec<Member>,
}

#[derive(Deserialize)]
struct SetRecord {
    #[serde(rename = "Tuples")]
    tuples: Vec<TupleRecord>,
}

/// Resolves sets through `POST /ExecuteMDXSetExpression`.
#[derive(Debug, Clone)]
pub struct MdxElementResolver<T> {
    base_url: String,
    transport: T,
}

impl<T: Transport> MdxElementResolver<T> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn build_execute_set(&self, mdx: &str) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(&ExecuteSetBody { mdx })
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}{EXECUTE_SET_PATH}", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    pub fn parse_execute_set(&self, response: HttpResponse) -> Result<Vec<MemberTuple>, ApiError> {
        check_success(&response)?;
        let set: SetRecord = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        Ok(set.tuples.into_iter().map(|t| t.members).collect())
    }
}

impl<T: Transport> ElementResolver for MdxElementResolver<T> {
    fn execute_set_mdx(&self, mdx: &str) -> Result<Vec<MemberTuple>, ApiError> {
        let request = self.build_execute_set(mdx)?;
        tracing::debug!(path = %request.path, "executing MDX set");
        let response = self.transport.execute(request)?;
        self.parse_execute_set(response)
    }
}
