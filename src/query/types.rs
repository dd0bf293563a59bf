//! Page descriptor types

use crate::types::{ParamMap, ParamValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the page number parameter
pub const PAGE_PARAM: &str = "page";

/// Request descriptor for a single page of a collection
///
/// Treated as immutable once it has been handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Endpoint path, relative to the client base URL (e.g. "projects")
    pub path: String,
    /// Query parameters
    #[serde(default)]
    pub params: ParamMap,
}

impl Query {
    /// Create a descriptor with no parameters
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: ParamMap::new(),
        }
    }

    /// Create a descriptor seeded with the default listing parameters
    pub fn page_query(path: impl Into<String>, page: u32) -> Self {
        QueryDefaults::default().page_query(path, page)
    }

    /// Add or replace a parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Derive the descriptor for another page of the same collection
    ///
    /// The parameter map is copied, never shared.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        let mut derived = self.clone();
        derived.params.insert(PAGE_PARAM.to_string(), page.into());
        derived
    }

    /// Page number, if the descriptor carries an integer `page` parameter
    pub fn page(&self) -> Option<u32> {
        self.params
            .get(PAGE_PARAM)
            .and_then(ParamValue::as_int)
            .and_then(|n| u32::try_from(n).ok())
    }

    /// Identity of this descriptor within a gather
    pub fn key(&self) -> PageKey {
        PageKey {
            path: self.path.clone(),
            page: self.page(),
        }
    }

    /// Parameters rendered as string pairs, sorted by key
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
        pairs.sort();
        pairs
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page() {
            Some(page) => write!(f, "{} (page {page})", self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// `(path, page)` identity of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey {
    /// Endpoint path
    pub path: String,
    /// Page number, if any
    pub page: Option<u32>,
}

/// Default parameter set for GitLab-style listing endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    /// Sort key
    pub order_by: String,
    /// Restrict to resources owned by the caller
    pub owned: bool,
    /// Items per page
    pub per_page: u32,
    /// Sort direction
    pub sort: String,
    /// Include statistics
    pub statistics: bool,
    /// Include custom attributes
    pub with_custom_attributes: bool,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            order_by: "id".to_string(),
            owned: false,
            per_page: 200,
            sort: "asc".to_string(),
            statistics: false,
            with_custom_attributes: false,
        }
    }
}

impl QueryDefaults {
    /// Build a descriptor for `path` at `page` using these defaults
    pub fn page_query(&self, path: impl Into<String>, page: u32) -> Query {
        Query::new(path)
            .param("order_by", self.order_by.as_str())
            .param("owned", self.owned)
            .param(PAGE_PARAM, page)
            .param("per_page", self.per_page)
            .param("sort", self.sort.as_str())
            .param("statistics", self.statistics)
            .param("with_custom_attributes", self.with_custom_attributes)
    }
}
