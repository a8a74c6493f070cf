//! STAC catalogue search

pub mod client;
pub mod filter;
pub mod models;

pub use client::{CatalogSearch, SearchRequest, StacClient, StacClientOptions, DEFAULT_PAGE_LIMIT};
pub use filter::{build_query, parse_filters, PropertyFilter};
