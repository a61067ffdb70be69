use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of data access recorded by the monitored-data API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataAccessKind {
    /// Access to the data of one individual, e.g. by id
    #[serde(rename = "Direkt")]
    Direct,
    /// Access as part of a search query over several owners
    #[serde(rename = "Query")]
    Query,
    /// Access as part of an aggregate function
    #[serde(rename = "Aggregation")]
    Aggregate,
}

/// A data access as seen by one data owner
///
/// Other owners involved in the same access are not disclosed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAccess {
    pub access_kind: DataAccessKind,
    /// Types of data accessed, e.g. "Jira issues", "email address"
    pub data_types: Vec<String>,
    #[serde(default)]
    pub justification: Option<String>,
    /// Revolori ID of the user whose data was accessed
    pub owner_rid: String,
    /// When the access happened (ISO 8601, as sent by the server)
    pub timestamp: String,
    /// Tool used to access the data
    pub tool: String,
    /// Revolori ID of the user who accessed the data
    pub user_rid: String,
}

/// Response of `GET /data-accesses`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAccessesResponse {
    pub accesses: Vec<DataAccess>,
    pub owner_rid: String,
}

/// Filters for `GET /data-accesses`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataAccessQuery {
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl DataAccessQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_start = Some(start);
        self.date_end = Some(end);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// `base` with the set filters appended as a query string
    pub(crate) fn to_path(&self, base: &str) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(start) = self.date_start {
            query.append_pair("date_start", &start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = self.date_end {
            query.append_pair("date_end", &end.format("%Y-%m-%d").to_string());
        }
        if let Some(limit) = self.limit {
            query.append_pair("limit", &limit.to_string());
        }

        let query = query.finish();
        if query.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, query)
        }
    }
}

/// Writable fields of a data access policy
///
/// Every field is a wildcard when `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAccessPolicyUpdate {
    #[serde(default)]
    pub access_kind: Option<DataAccessKind>,
    #[serde(default)]
    pub tool: Option<String>,
    /// Revolori ID of the user allowed access
    #[serde(default)]
    pub user_rid: Option<String>,
    #[serde(default)]
    pub validity_period_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub validity_period_end_date: Option<NaiveDate>,
}

/// A stored data access policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAccessPolicy {
    pub id: i64,
    #[serde(flatten)]
    pub policy: DataAccessPolicyUpdate,
}

/// A tool used for accessing data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
}

impl Tool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
