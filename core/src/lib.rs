//! Synchronous client for the subset endpoints of an OLAP REST/OData API.
//!
//! # Overview
//! Subsets are named selections of elements within a dimension hierarchy,
//! either static (an explicit element list) or dynamic (an MDX expression).
//! They live in two collections per hierarchy, `Subsets` and
//! `PrivateSubsets`.
//!
//! # Design
//! - `SubsetClient` is stateless: it builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network.
//! - `SubsetManager` executes those requests over a `Transport` and adds the
//!   multi-request operations: the static-subset diff update, existence
//!   checks, and member resolution for dynamic subsets via an
//!   `ElementResolver`.
//! - `UreqTransport` and `MdxElementResolver` are the HTTP implementations of
//!   the two seams; tests substitute their own.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod manager;
pub mod resolver;
pub mod transport;
pub mod types;
pub mod url;

pub use client::SubsetClient;
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use manager::{StaticSubsetDiff, SubsetManager};
pub use resolver::{ElementResolver, MdxElementResolver, Member, MemberTuple};
pub use transport::UreqTransport;
pub use types::{Subset, SubsetKind, Visibility};
