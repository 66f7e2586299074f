//! `SubsetManager`: subset operations executed over a `Transport`.
//!
//! # Design
//! The manager owns a `SubsetClient` for request construction, a `Transport`
//! for the round-trips and an `ElementResolver` for dynamic membership. All
//! calls are blocking and issue their requests one after another.
//!
//! Operations that modify the server return the raw `HttpResponse`; the
//! caller checks its status. Reads (`get`, `get_all_names`, `exists`,
//! `get_element_names`) interpret the response and return typed values.

use std::collections::HashSet;
use std::sync::Arc;

use crate::client::SubsetClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::resolver::{ElementResolver, MdxElementResolver};
use crate::transport::UreqTransport;
use crate::types::{Subset, SubsetKind, Visibility};

/// The two halves of a static subset update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StaticSubsetDiff {
    /// On the server but not wanted, in server order.
    pub to_delete: Vec<String>,
    /// Wanted but not yet on the server, in requested order.
    pub to_add: Vec<String>,
}

impl StaticSubsetDiff {
    pub fn compute(current: &[String], desired: &[String]) -> Self {
        let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
        let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();
        Self {
            to_delete: current
                .iter()
                .filter(|e| !desired_set.contains(e.as_str()))
                .cloned()
                .collect(),
            to_add: desired
                .iter()
                .filter(|e| !current_set.contains(e.as_str()))
                .cloned()
                .collect(),
        }
    }
}

pub struct SubsetManager<T, R> {
    client: SubsetClient,
    transport: T,
    resolver: R,
}

impl SubsetManager<Arc<UreqTransport>, MdxElementResolver<Arc<UreqTransport>>> {
    /// A manager talking HTTP through one shared `ureq` agent.
    pub fn from_config(config: &ClientConfig) -> Self {
        let transport = Arc::new(UreqTransport::from_config(config));
        let resolver = MdxElementResolver::new(&config.base_url, Arc::clone(&transport));
        Self::new(SubsetClient::new(&config.base_url), transport, resolver)
    }
}

impl<T: Transport, R: ElementResolver> SubsetManager<T, R> {
    pub fn new(client: SubsetClient, transport: T, resolver: R) -> Self {
        Self {
            client,
            transport,
            resolver,
        }
    }

    pub fn create(&self, subset: &Subset, visibility: Visibility) -> Result<HttpResponse, ApiError> {
        self.send(self.client.build_create(subset, visibility)?)
    }

    pub fn get(
        &self,
        name: &str,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> Result<Subset, ApiError> {
        let response = self.send(self.client.build_get(name, dimension, hierarchy, visibility))?;
        self.client.parse_get(response)
    }

    pub fn get_all_names(
        &self,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> Result<Vec<String>, ApiError> {
        let response = self.send(self.client.build_get_all_names(dimension, hierarchy, visibility))?;
        self.client.parse_get_all_names(response)
    }

    /// Dynamic subsets are patched wholesale; static ones go through
    /// `update_static_subset`.
    pub fn update(&self, subset: &Subset, visibility: Visibility) -> Result<HttpResponse, ApiError> {
        match &subset.kind {
            SubsetKind::Static { elements } => self.update_static_subset(subset, elements, visibility),
            SubsetKind::Dynamic { .. } => self.send(self.client.build_update(subset, visibility)?),
        }
    }

    /// Bring the server's member list in line with `desired`.
    ///
    /// Removed members are deleted one request at a time; the first deletion
    /// that does not answer 204 is returned as-is and nothing is patched.
    /// Deletions that already went through stay applied. Members that are new
    /// are then added with a single PATCH.
    fn update_static_subset(
        &self,
        subset: &Subset,
        desired: &[String],
        visibility: Visibility,
    ) -> Result<HttpResponse, ApiError> {
        let original = self.get(
            &subset.name,
            &subset.dimension_name,
            Some(&subset.hierarchy_name),
            visibility,
        )?;
        let diff = StaticSubsetDiff::compute(original.elements(), desired);
        tracing::debug!(
            subset = %subset.name,
            to_delete = diff.to_delete.len(),
            to_add = diff.to_add.len(),
            "static subset diff"
        );

        let response = self.delete_elements_from_static_subset(
            &diff.to_delete,
            &subset.dimension_name,
            Some(&subset.hierarchy_name),
            &subset.name,
            visibility,
        )?;
        if response.status != 204 {
            return Ok(response);
        }

        let additions = subset.with_elements(diff.to_add);
        self.send(self.client.build_update(&additions, visibility)?)
    }

    pub fn make_static(
        &self,
        name: &str,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> Result<HttpResponse, ApiError> {
        self.send(self.client.build_make_static(name, dimension, hierarchy, visibility)?)
    }

    /// Not atomic: the subset may appear or vanish between the check and the
    /// write.
    pub fn update_or_create(&self, subset: &Subset, visibility: Visibility) -> Result<HttpResponse, ApiError> {
        if self.exists(
            &subset.name,
            &subset.dimension_name,
            Some(&subset.hierarchy_name),
            visibility,
        )? {
            return self.update(subset, visibility);
        }
        self.create(subset, visibility)
    }

    pub fn delete(
        &self,
        name: &str,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> Result<HttpResponse, ApiError> {
        self.send(self.client.build_delete(name, dimension, hierarchy, visibility))
    }

    pub fn exists(
        &self,
        name: &str,
        dimension: &str,
        hierarchy: Option<&str>,
        visibility: Visibility,
    ) -> Result<bool, ApiError> {
        let response = self.send(self.client.build_exists(name, dimension, hierarchy, visibility))?;
        self.client.parse_exists(response)
    }

    /// Members of a static or dynamic subset. Dynamic ones are evaluated by
    /// the resolver and come back in engine order.
    pub fn get_element_names(
        &self,
        dimension: &str,
        hierarchy: Option<&str>,
        name: &str,
        visibility: Visibility,
    ) -> Result<Vec<String>, ApiError> {
        let subset = self.get(name, dimension, hierarchy, visibility)?;
        match subset.kind {
            SubsetKind::Static { elements } => Ok(elements),
            SubsetKind::Dynamic { expression } => self
                .resolver
                .execute_set_mdx(&expression)?
                .into_iter()
                .map(|tuple| {
                    tuple.into_iter().next().map(|member| member.name).ok_or_else(|| {
                        ApiError::DeserializationError(format!("empty tuple in set of subset {name}"))
                    })
                })
                .collect(),
        }
    }

    /// Delete `elements` from the subset in order, stopping at the first
    /// response other than 204. An empty list yields a synthetic 204.
    pub fn delete_elements_from_static_subset(
        &self,
        elements: &[String],
        dimension: &str,
        hierarchy: Option<&str>,
        name: &str,
        visibility: Visibility,
    ) -> Result<HttpResponse, ApiError> {
        let mut last = HttpResponse::no_content();
        for (deleted, element) in elements.iter().enumerate() {
            let request = self
                .client
                .build_delete_element(element, name, dimension, hierarchy, visibility);
            last = self.send(request)?;
            if last.status != 204 {
                tracing::warn!(
                    subset = %name,
                    element = %element,
                    status = last.status,
                    deleted,
                    remaining = elements.len() - deleted,
                    "element deletion failed, subset left partially updated"
                );
                return Ok(last);
            }
        }
        Ok(last)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = request.method.as_str(), path = %request.path, "sending request");
        Ok(self.transport.execute(request)?)
    }
}
