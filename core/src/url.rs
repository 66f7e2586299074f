//! Resource path construction.
//!
//! Every identifier is embedded as an OData string literal inside a path
//! segment, e.g. `Dimensions('Region')`. Escaping doubles single quotes
//! first and then percent-encodes everything outside the unreserved set, so
//! the only raw `'`, `(` and `)` left in a path are the ones the templates
//! put there.

use crate::types::Visibility;

/// Escape one identifier for use inside `('...')`.
pub fn escape_segment(value: &str) -> String {
    urlencoding::encode(&value.replace('\'', "''")).into_owned()
}

/// An absent or empty hierarchy name means the dimension's own hierarchy.
pub fn resolve_hierarchy<'a>(dimension: &'a str, hierarchy: Option<&'a str>) -> &'a str {
    match hierarchy {
        Some(name) if !name.is_empty() => name,
        _ => dimension,
    }
}

/// `Dimensions('D')/Hierarchies('H')`, without a leading slash so it can also
/// serve as an `@odata.bind` target.
pub fn hierarchy_path(dimension: &str, hierarchy: &str) -> String {
    format!(
        "Dimensions('{}')/Hierarchies('{}')",
        escape_segment(dimension),
        escape_segment(hierarchy)
    )
}

/// `/Dimensions('D')/Hierarchies('H')/Subsets` or `.../PrivateSubsets`.
pub fn collection_path(dimension: &str, hierarchy: Option<&str>, visibility: Visibility) -> String {
    let hierarchy = resolve_hierarchy(dimension, hierarchy);
    format!(
        "/{}/{}",
        hierarchy_path(dimension, hierarchy),
        visibility.collection()
    )
}

/// `/Dimensions('D')/Hierarchies('H')/{collection}('S')`.
pub fn subset_path(
    dimension: &str,
    hierarchy: Option<&str>,
    visibility: Visibility,
    name: &str,
) -> String {
    format!(
        "{}('{}')",
        collection_path(dimension, hierarchy, visibility),
        escape_segment(name)
    )
}

/// `Dimensions('D')/Hierarchies('H')/Elements('E')`, the bind target for one
/// subset member.
pub fn element_bind(dimension: &str, hierarchy: &str, element: &str) -> String {
    format!(
        "{}/Elements('{}')",
        hierarchy_path(dimension, hierarchy),
        escape_segment(element)
    )
}
