//! In-memory stand-in for the subset endpoints of an OLAP REST API.
//!
//! Paths use OData key syntax (`Dimensions('Region')`), which the router
//! cannot express as path parameters, so everything under `/api/v1` goes to
//! one fallback handler that parses the segments itself.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_ROOT: &str = "/api/v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredSubset {
    pub dimension: String,
    pub hierarchy: String,
    pub private: bool,
    pub name: String,
    pub alias: Option<String>,
    pub expression: Option<String>,
    pub elements: Vec<String>,
}

impl StoredSubset {
    fn to_json(&self) -> Value {
        let elements: Vec<Value> = match self.expression {
            Some(_) => Vec::new(),
            None => self.elements.iter().map(|e| json!({ "Name": e })).collect(),
        };
        json!({
            "Name": self.name,
            "UniqueName": format!("[{}].[{}].[{}]", self.dimension, self.hierarchy, self.name),
            "Expression": self.expression,
            "Alias": self.alias.clone().unwrap_or_default(),
            "Hierarchy": {
                "Name": self.hierarchy,
                "Dimension": { "Name": self.dimension },
            },
            "Elements": elements,
        })
    }
}

/// Subsets in creation order.
pub type Db = Arc<RwLock<Vec<StoredSubset>>>;

pub fn app() -> Router {
    app_with_state(Db::default())
}

pub fn app_with_state(db: Db) -> Router {
    Router::new().fallback(dispatch).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// One OData path segment: `Name` or `Name('key')`, key unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub key: Option<String>,
}

pub fn parse_segment(raw: &str) -> Option<Segment> {
    let Some(open) = raw.find("('") else {
        if raw.contains('(') || raw.contains('\'') {
            return None;
        }
        return Some(Segment {
            name: raw.to_string(),
            key: None,
        });
    };
    let inner = raw[open + 2..].strip_suffix("')")?;
    let key = urlencoding::decode(inner).ok()?.replace("''", "'");
    Some(Segment {
        name: raw[..open].to_string(),
        key: Some(key),
    })
}

pub fn parse_segments(path: &str) -> Option<Vec<Segment>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(parse_segment)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scope {
    dimension: String,
    hierarchy: String,
    private: bool,
}

impl Scope {
    fn matches(&self, subset: &StoredSubset, name: &str) -> bool {
        subset.dimension == self.dimension
            && subset.hierarchy == self.hierarchy
            && subset.private == self.private
            && subset.name == name
    }
}

#[derive(Debug)]
enum Route {
    Collection(Scope),
    Subset(Scope, String),
    Element(Scope, String, String),
    SaveAs(Scope, String),
    ExecuteSet,
}

fn route(path: &str) -> Option<Route> {
    let segments = parse_segments(path.strip_prefix(API_ROOT)?)?;
    if let [only] = segments.as_slice() {
        return (only.name == "ExecuteMDXSetExpression" && only.key.is_none()).then_some(Route::ExecuteSet);
    }
    let [dimension, hierarchy, collection, rest @ ..] = segments.as_slice() else {
        return None;
    };
    if dimension.name != "Dimensions" || hierarchy.name != "Hierarchies" {
        return None;
    }
    let private = match collection.name.as_str() {
        "Subsets" => false,
        "PrivateSubsets" => true,
        _ => return None,
    };
    let scope = Scope {
        dimension: dimension.key.clone()?,
        hierarchy: hierarchy.key.clone()?,
        private,
    };
    match (&collection.key, rest) {
        (None, []) => Some(Route::Collection(scope)),
        (Some(name), []) => Some(Route::Subset(scope, name.clone())),
        (Some(name), [sub]) if sub.name == "Elements" => {
            Some(Route::Element(scope, name.clone(), sub.key.clone()?))
        }
        (Some(name), [sub]) if sub.name == "tm1.SaveAs" && sub.key.is_none() => {
            Some(Route::SaveAs(scope, name.clone()))
        }
        _ => None,
    }
}

#[derive(Deserialize)]
struct SubsetPayload {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Alias")]
    alias: Option<String>,
    #[serde(rename = "Expression")]
    expression: Option<String>,
    #[serde(rename = "Elements@odata.bind")]
    elements: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct SaveAsPayload {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "MakePrivate", default)]
    make_private: bool,
    #[serde(rename = "MakeStatic", default)]
    make_static: bool,
}

#[derive(Deserialize)]
struct ExecuteSetPayload {
    #[serde(rename = "MDX")]
    mdx: String,
}

/// The element name a `.../Elements('E')` bind target points at.
fn bound_element(bind: &str) -> Option<String> {
    let last = parse_segments(bind)?.pop()?;
    (last.name == "Elements").then_some(last.key).flatten()
}

/// Evaluate a literal set such as `{[Region].[Region].[North], [Region].[South]}`.
/// Each member's name is its last bracketed part.
pub fn evaluate_set(mdx: &str) -> Option<Vec<String>> {
    let inner = mdx.trim().strip_prefix('{')?.strip_suffix('}')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    let mut members = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                members.push(member_name(&inner[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }
    members.push(member_name(&inner[start..])?);
    Some(members)
}

fn member_name(member: &str) -> Option<String> {
    let member = member.trim().strip_suffix(']')?;
    let open = member.rfind('[')?;
    Some(member[open + 1..].to_string())
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())
}

async fn dispatch(State(db): State<Db>, method: Method, uri: Uri, body: Bytes) -> Response {
    tracing::debug!(%method, path = %uri.path(), "request");
    let Some(target) = route(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let result = match (method, target) {
        (Method::GET, Route::Collection(scope)) => Ok(list_subsets(&db, &scope).await),
        (Method::POST, Route::Collection(scope)) => create_subset(&db, scope, &body).await,
        (Method::GET, Route::Subset(scope, name)) => get_subset(&db, &scope, &name).await,
        (Method::PATCH, Route::Subset(scope, name)) => update_subset(&db, &scope, &name, &body).await,
        (Method::DELETE, Route::Subset(scope, name)) => delete_subset(&db, &scope, &name).await,
        (Method::DELETE, Route::Element(scope, name, element)) => {
            delete_element(&db, &scope, &name, &element).await
        }
        (Method::POST, Route::SaveAs(scope, name)) => save_as(&db, &scope, &name, &body).await,
        (Method::POST, Route::ExecuteSet) => execute_set(&body),
        _ => Err(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    };
    result.unwrap_or_else(|response| response)
}

async fn list_subsets(db: &Db, scope: &Scope) -> Response {
    let subsets = db.read().await;
    let value: Vec<Value> = subsets
        .iter()
        .filter(|s| scope.matches(s, &s.name))
        .map(|s| json!({ "Name": s.name }))
        .collect();
    Json(json!({ "value": value })).into_response()
}

async fn create_subset(db: &Db, scope: Scope, body: &Bytes) -> Result<Response, Response> {
    let payload: SubsetPayload = parse_body(body)?;
    let Some(name) = payload.name else {
        return Err((StatusCode::BAD_REQUEST, "Name is required").into_response());
    };
    let elements = payload
        .elements
        .unwrap_or_default()
        .iter()
        .map(|bind| bound_element(bind))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "malformed element binding").into_response())?;

    let mut subsets = db.write().await;
    if subsets.iter().any(|s| scope.matches(s, &name)) {
        return Err((StatusCode::CONFLICT, format!("subset {name} already exists")).into_response());
    }
    let subset = StoredSubset {
        dimension: scope.dimension,
        hierarchy: scope.hierarchy,
        private: scope.private,
        name,
        alias: payload.alias.filter(|a| !a.is_empty()),
        expression: payload.expression.filter(|e| !e.is_empty()),
        elements,
    };
    let json = subset.to_json();
    subsets.push(subset);
    Ok((StatusCode::CREATED, Json(json)).into_response())
}

async fn get_subset(db: &Db, scope: &Scope, name: &str) -> Result<Response, Response> {
    let subsets = db.read().await;
    subsets
        .iter()
        .find(|s| scope.matches(s, name))
        .map(|s| Json(s.to_json()).into_response())
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())
}

/// Scalars are replaced; bound elements are appended when not yet present.
async fn update_subset(db: &Db, scope: &Scope, name: &str, body: &Bytes) -> Result<Response, Response> {
    let payload: SubsetPayload = parse_body(body)?;
    let mut subsets = db.write().await;
    let subset = subsets
        .iter_mut()
        .find(|s| scope.matches(s, name))
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
    if let Some(new_name) = payload.name {
        subset.name = new_name;
    }
    if let Some(alias) = payload.alias {
        subset.alias = Some(alias).filter(|a| !a.is_empty());
    }
    if let Some(expression) = payload.expression {
        subset.expression = Some(expression).filter(|e| !e.is_empty());
    }
    if let Some(binds) = payload.elements {
        subset.expression = None;
        for bind in binds {
            let element = bound_element(&bind)
                .ok_or_else(|| (StatusCode::BAD_REQUEST, "malformed element binding").into_response())?;
            if !subset.elements.contains(&element) {
                subset.elements.push(element);
            }
        }
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn delete_subset(db: &Db, scope: &Scope, name: &str) -> Result<Response, Response> {
    let mut subsets = db.write().await;
    let index = subsets
        .iter()
        .position(|s| scope.matches(s, name))
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
    subsets.remove(index);
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn delete_element(db: &Db, scope: &Scope, name: &str, element: &str) -> Result<Response, Response> {
    let mut subsets = db.write().await;
    let subset = subsets
        .iter_mut()
        .find(|s| scope.matches(s, name))
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
    let index = subset
        .elements
        .iter()
        .position(|e| e == element)
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
    subset.elements.remove(index);
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Copy a subset under a new name and visibility, freezing its members when
/// `MakeStatic` is set. An existing target is overwritten.
async fn save_as(db: &Db, scope: &Scope, name: &str, body: &Bytes) -> Result<Response, Response> {
    let payload: SaveAsPayload = parse_body(body)?;
    let mut subsets = db.write().await;
    let source = subsets
        .iter()
        .find(|s| scope.matches(s, name))
        .cloned()
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;

    let (expression, elements) = match (&source.expression, payload.make_static) {
        (Some(mdx), true) => {
            let elements = evaluate_set(mdx)
                .ok_or_else(|| (StatusCode::BAD_REQUEST, "unsupported MDX").into_response())?;
            (None, elements)
        }
        _ => (source.expression.clone(), source.elements.clone()),
    };
    let target = StoredSubset {
        private: payload.make_private,
        name: payload.name,
        expression,
        elements,
        ..source
    };
    let target_scope = Scope {
        dimension: target.dimension.clone(),
        hierarchy: target.hierarchy.clone(),
        private: target.private,
    };
    subsets.retain(|s| !target_scope.matches(s, &target.name));
    let json = target.to_json();
    subsets.push(target);
    Ok((StatusCode::CREATED, Json(json)).into_response())
}

fn execute_set(body: &Bytes) -> Result<Response, Response> {
    let payload: ExecuteSetPayload = parse_body(body)?;
    let members = evaluate_set(&payload.mdx)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "unsupported MDX").into_response())?;
    let tuples: Vec<Value> = members
        .into_iter()
        .map(|name| json!({ "Members": [{ "Name": name }] }))
        .collect();
    Ok(Json(json!({ "Tuples": tuples })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_segment_has_no_key() {
        assert_eq!(
            parse_segment("Subsets"),
            Some(Segment {
                name: "Subsets".to_string(),
                key: None
            })
        );
    }

    #[test]
    fn keyed_segment_is_decoded() {
        let segment = parse_segment("Subsets('O%27%27Brien%20Top')").unwrap();
        assert_eq!(segment.name, "Subsets");
        assert_eq!(segment.key.as_deref(), Some("O'Brien Top"));
    }

    #[test]
    fn malformed_segment_is_rejected() {
        assert_eq!(parse_segment("Subsets('open"), None);
        assert_eq!(parse_segment("Subsets(x)"), None);
    }

    #[test]
    fn routes_are_recognised() {
        let path = "/api/v1/Dimensions('R')/Hierarchies('H')/PrivateSubsets('S')/Elements('E')";
        match route(path) {
            Some(Route::Element(scope, name, element)) => {
                assert!(scope.private);
                assert_eq!((name.as_str(), element.as_str()), ("S", "E"));
            }
            other => panic!("unexpected route {other:?}"),
        }
        assert!(matches!(route("/api/v1/ExecuteMDXSetExpression"), Some(Route::ExecuteSet)));
        assert!(route("/api/v1/Dimensions('R')/Subsets").is_none());
        assert!(route("/api/v2/Dimensions('R')").is_none());
    }

    #[test]
    fn bound_element_reads_last_key() {
        assert_eq!(
            bound_element("Dimensions('R')/Hierarchies('R')/Elements('North%20East')").as_deref(),
            Some("North East")
        );
        assert_eq!(bound_element("Dimensions('R')/Hierarchies('R')"), None);
    }

    #[test]
    fn literal_sets_evaluate_to_member_names() {
        assert_eq!(
            evaluate_set("{[Region].[Region].[North], [Region].[South]}"),
            Some(vec!["North".to_string(), "South".to_string()])
        );
        assert_eq!(evaluate_set("{[R].[A, B]}"), Some(vec!["A, B".to_string()]));
        assert_eq!(evaluate_set("{}"), Some(Vec::new()));
        assert_eq!(evaluate_set("TM1SUBSETALL([Region])"), None);
    }
}
