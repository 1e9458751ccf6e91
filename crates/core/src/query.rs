//! Product search, sort and pagination model.
//!
//! A [`ProductFilter`] is the loosely-typed request body of the product
//! listing endpoint. [`ProductFilter::into_query`] validates it into a
//! [`ProductQuery`], which the repositories render (SQL) or evaluate
//! (in-memory). The rules that decide *what* matches and *how* it is ordered
//! live here so every store applies them identically:
//!
//! - A search shorter than [`MIN_SEARCH_CHARS`] after trimming is ignored.
//! - An all-digit search matches by exact id, by id substring, or by name, and
//!   ranks results in that order ([`MatchTier`]). That ranking replaces any
//!   requested sort.
//! - Any other search is a case-insensitive substring match on the name.
//! - Unknown `sort_by` keys are ignored.
//! - Every ordering ends with `id ASC` so that pages are stable.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{CategoryId, ProductId};

/// Searches shorter than this (in characters, after trimming) are ignored.
pub const MIN_SEARCH_CHARS: usize = 2;

/// Page used when the request does not give one.
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when the request does not give a positive one.
pub const DEFAULT_LIMIT: u64 = 10;

/// Errors produced while validating a product filter.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A date bound is not ISO-8601.
    #[error("invalid {field}: '{value}' is not an ISO-8601 date or date-time")]
    InvalidTimestamp {
        /// Name of the offending filter field.
        field: &'static str,
        /// The rejected input.
        value: String,
    },
}

// =============================================================================
// Search
// =============================================================================

/// How strongly a product matched a numeric search. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    /// The product id equals the query.
    ExactId = 1,
    /// The product id's decimal string contains the query.
    PartialId = 2,
    /// The product name contains the query.
    Name = 3,
}

/// A validated free-text search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    /// All ASCII digits: searches ids and names, ranked by [`MatchTier`].
    Numeric {
        /// The digits as typed (leading zeros kept for substring matching).
        digits: String,
        /// The value for exact id comparison, if it fits an id.
        id: Option<i32>,
    },
    /// Anything else: case-insensitive substring of the name.
    Text(String),
}

impl SearchTerm {
    /// Build a search from raw input, or `None` when it is too short to apply.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < MIN_SEARCH_CHARS {
            return None;
        }

        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self::Numeric {
                digits: trimmed.to_owned(),
                id: trimmed.parse::<i32>().ok(),
            })
        } else {
            Some(Self::Text(trimmed.to_owned()))
        }
    }

    /// The trimmed search text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Numeric { digits, .. } => digits,
            Self::Text(text) => text,
        }
    }

    /// Whether results are ranked by [`MatchTier`] instead of the requested sort.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric { .. })
    }

    /// Classify a product against this search; `None` means no match.
    ///
    /// Text searches only ever return [`MatchTier::Name`].
    #[must_use]
    pub fn rank(&self, id: ProductId, name: &str) -> Option<MatchTier> {
        match self {
            Self::Numeric { digits, id: exact } => {
                if *exact == Some(id.as_i32()) {
                    Some(MatchTier::ExactId)
                } else if id.to_string().contains(digits.as_str()) {
                    Some(MatchTier::PartialId)
                } else if contains_ignore_case(name, digits) {
                    Some(MatchTier::Name)
                } else {
                    None
                }
            }
            Self::Text(text) => contains_ignore_case(name, text).then_some(MatchTier::Name),
        }
    }

    /// The search as a `LIKE` pattern with `%`, `_` and `\` escaped.
    #[must_use]
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.as_str().len() + 2);
        pattern.push('%');
        for c in self.as_str().chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// =============================================================================
// Sorting
// =============================================================================

/// Columns a product listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Id,
    Name,
    Price,
    Description,
    ImageUrl,
    InStock,
    CategoryId,
    CreatedAt,
    UpdatedAt,
    /// The joined category's display name.
    CategoryName,
}

impl SortKey {
    /// Map a `sort_by` value to a key; unknown names yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let key = match s.trim() {
            "id" => Self::Id,
            "name" => Self::Name,
            "price" => Self::Price,
            "description" => Self::Description,
            "image_url" => Self::ImageUrl,
            "in_stock" => Self::InStock,
            "category_id" => Self::CategoryId,
            "created_at" => Self::CreatedAt,
            "updated_at" => Self::UpdatedAt,
            "category_name" | "category" => Self::CategoryName,
            _ => return None,
        };
        Some(key)
    }
}

/// Sort direction. Anything other than `"desc"` is ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Read a `sort_order` value.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }
}

/// A requested ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

// =============================================================================
// Pagination
// =============================================================================

/// The page the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Normalise raw `page`/`limit` parameters.
    ///
    /// Pages below 1 become 1; a missing or non-positive limit becomes
    /// [`DEFAULT_LIMIT`].
    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page
            .and_then(|p| u64::try_from(p).ok())
            .map_or(DEFAULT_PAGE, |p| p.max(1));
        let limit = limit
            .and_then(|l| u64::try_from(l).ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT);
        Self { page, limit }
    }

    /// Requested page (1-based, before clamping).
    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Resolve the request against the number of matching rows.
    ///
    /// The page is clamped down to the last page when it overshoots and at
    /// least one row matched.
    #[must_use]
    pub const fn window(&self, total: u64) -> PageWindow {
        let pages = total.div_ceil(self.limit);
        let page = if pages > 0 && self.page > pages {
            pages
        } else {
            self.page
        };
        PageWindow {
            page,
            limit: self.limit,
            total,
            pages,
        }
    }
}

/// A resolved page: which rows to return and the listing totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Current page after clamping.
    pub page: u64,
    /// Page size.
    pub limit: u64,
    /// Number of rows matching the filter.
    pub total: u64,
    /// `ceil(total / limit)`, 0 when nothing matched.
    pub pages: u64,
}

impl PageWindow {
    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

// =============================================================================
// Query
// =============================================================================

/// Raw product listing filter as sent by clients.
///
/// Every field is optional; an empty body lists all products.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    pub search_query: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub in_stock: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub created_from: Option<String>,
    pub created_to: Option<String>,
}

impl ProductFilter {
    /// Validate the filter and attach the requested page.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidTimestamp` if either date bound is not
    /// ISO-8601.
    pub fn into_query(self, page: PageRequest) -> Result<ProductQuery, QueryError> {
        let created_from = self
            .created_from
            .as_deref()
            .map(|v| parse_timestamp("created_from", v))
            .transpose()?;
        let created_to = self
            .created_to
            .as_deref()
            .map(|v| parse_timestamp("created_to", v))
            .transpose()?;

        let sort = self
            .sort_by
            .as_deref()
            .and_then(SortKey::parse)
            .map(|key| SortSpec {
                key,
                order: SortOrder::from_param(self.sort_order.as_deref()),
            });

        Ok(ProductQuery {
            search: self.search_query.as_deref().and_then(SearchTerm::parse),
            min_price: self.min_price,
            max_price: self.max_price,
            category_id: self.category_id,
            in_stock: self.in_stock,
            created_from,
            created_to,
            sort,
            page,
        })
    }
}

/// A validated product listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<SearchTerm>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub in_stock: Option<bool>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub sort: Option<SortSpec>,
    pub page: PageRequest,
}

impl ProductQuery {
    /// Whether results are ordered by numeric search rank.
    #[must_use]
    pub fn ranks_by_search(&self) -> bool {
        self.search.as_ref().is_some_and(SearchTerm::is_numeric)
    }

    /// The requested sort, unless numeric search ranking overrides it.
    #[must_use]
    pub fn effective_sort(&self) -> Option<SortSpec> {
        if self.ranks_by_search() {
            None
        } else {
            self.sort
        }
    }
}

/// Parse an ISO-8601 date or date-time filter bound.
///
/// Accepts RFC 3339 (`2024-05-01T10:00:00+02:00`), naive date-times with a
/// `T` or space separator and optional fraction, and plain dates (midnight).
/// Naive values are taken as UTC.
///
/// # Errors
///
/// Returns `QueryError::InvalidTimestamp` naming `field` when nothing parses.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, QueryError> {
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| QueryError::InvalidTimestamp {
            field,
            value: value.to_owned(),
        })
}
