//! Tender listing types: the upstream request/response shapes and the
//! normalized rows handed to the spreadsheet writer.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::date::parse_platform_date;

/// Number of items requested per upstream page.
pub const PAGE_SIZE: u32 = 50;

/// Column order of the exported sheet.
pub const COLUMNS: [&str; 10] = [
    "ProjectID",
    "UniqueID",
    "Reference",
    "Title",
    "Customer",
    "Description",
    "Deadline",
    "Type",
    "Category",
    "UTCTimeZoneName",
];

/// Query for one page of the current tender listing.
///
/// Built fresh for every attempt so each carries its own cache-busting
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub timestamp_ms: i64,
}

impl PageRequest {
    /// Create a request for `page` stamped with the current time.
    pub fn new(page: u32) -> Self {
        Self {
            page,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Query parameters in the order the listing page itself sends them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("strMode", "Current".to_string()),
            ("searchvalue", String::new()),
            ("bUseSearch", "false".to_string()),
            ("OrderBy", "Title".to_string()),
            ("OrderDirection", "ASC".to_string()),
            ("iPage", self.page.to_string()),
            ("iPageSize", PAGE_SIZE.to_string()),
            ("bOnlyWithCorrespondenceAllowed", "false".to_string()),
            ("iCustomerFilter", "0".to_string()),
            ("iOptInStatus", "-1".to_string()),
            ("_", self.timestamp_ms.to_string()),
        ]
    }

    /// Full request URL against `api_url`.
    pub fn url(&self, api_url: &str) -> Result<url::Url, url::ParseError> {
        url::Url::parse_with_params(api_url, self.query_pairs())
    }
}

/// One page of the upstream listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageResponse {
    #[serde(rename = "PageCount", default)]
    page_count: Option<Value>,
    #[serde(rename = "Data", default)]
    data: Option<Vec<RawItem>>,
}

impl PageResponse {
    /// Build a page directly (used by tests and fakes).
    pub fn new(page_count: Option<u32>, items: Vec<RawItem>) -> Self {
        Self {
            page_count: page_count.map(Value::from),
            data: Some(items),
        }
    }

    /// Total number of pages, never less than 1.
    ///
    /// Absent, null, non-numeric and non-positive values all count as a
    /// single page.
    pub fn page_count(&self) -> u32 {
        let count = match &self.page_count {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match count {
            Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => 1,
        }
    }

    /// Whether upstream reported a page count at all.
    pub fn has_page_count(&self) -> bool {
        !matches!(self.page_count, None | Some(Value::Null))
    }

    pub fn items(&self) -> &[RawItem] {
        self.data.as_deref().unwrap_or_default()
    }

    pub fn into_items(self) -> Vec<RawItem> {
        self.data.unwrap_or_default()
    }
}

/// A loosely typed upstream record.
///
/// Every accessor treats a missing key, an explicit `null` and a non-object
/// record the same way: the field is absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RawItem(Value);

impl RawItem {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Deduplication key: the textual form of `UniqueID`, `None` when absent.
    pub fn unique_id(&self) -> Option<String> {
        self.get("UniqueID").map(value_text)
    }

    /// Normalize into an output row.
    pub fn to_row(&self) -> OutputRow {
        let field = |key: &str| self.get(key).and_then(FieldValue::from_json);
        OutputRow {
            project_id: field("ProjectID"),
            unique_id: field("UniqueID"),
            reference: field("Reference"),
            title: field("Title"),
            customer: field("Customer"),
            description: field("Description"),
            deadline: self
                .get("DateDocsAvailableUntil")
                .map(value_text)
                .and_then(|s| parse_platform_date(&s)),
            kind: field("Type"),
            category: field("Category"),
            utc_time_zone_name: field("UTCTimeZoneName"),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A single spreadsheet cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl FieldValue {
    /// Convert a JSON scalar. Arrays and objects are kept as compact JSON text.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Integer(i)),
                None => n.as_f64().map(Self::Float),
            },
            Value::String(s) => Some(Self::Text(s.clone())),
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Normalized tender row. `deadline` is an ISO `YYYY-MM-DD` date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputRow {
    #[serde(rename = "ProjectID")]
    pub project_id: Option<FieldValue>,
    #[serde(rename = "UniqueID")]
    pub unique_id: Option<FieldValue>,
    #[serde(rename = "Reference")]
    pub reference: Option<FieldValue>,
    #[serde(rename = "Title")]
    pub title: Option<FieldValue>,
    #[serde(rename = "Customer")]
    pub customer: Option<FieldValue>,
    #[serde(rename = "Description")]
    pub description: Option<FieldValue>,
    #[serde(rename = "Deadline")]
    pub deadline: Option<String>,
    #[serde(rename = "Type")]
    pub kind: Option<FieldValue>,
    #[serde(rename = "Category")]
    pub category: Option<FieldValue>,
    #[serde(rename = "UTCTimeZoneName")]
    pub utc_time_zone_name: Option<FieldValue>,
}

impl OutputRow {
    /// Cells in [`COLUMNS`] order.
    pub fn cells(&self) -> [Option<FieldValue>; 10] {
        [
            self.project_id.clone(),
            self.unique_id.clone(),
            self.reference.clone(),
            self.title.clone(),
            self.customer.clone(),
            self.description.clone(),
            self.deadline.clone().map(FieldValue::Text),
            self.kind.clone(),
            self.category.clone(),
            self.utc_time_zone_name.clone(),
        ]
    }
}
