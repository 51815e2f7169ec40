//! Lenient pagination parsing.
//!
//! Query strings come straight from clients, so nothing here ever fails:
//! garbage falls back to the defaults and out-of-range numbers are clamped.

use serde::Serialize;

use crate::config::CatalogConfig;

/// Page size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl From<&CatalogConfig> for PageLimits {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            default_limit: config.default_page_size,
            max_limit: config.max_page_size,
        }
    }
}

impl PageLimits {
    pub fn clamp(&self, limit: u32) -> u32 {
        limit.min(self.max_limit)
    }

    /// Parse a raw `limit` value.
    pub fn parse_limit(&self, raw: Option<&str>) -> u32 {
        parse_count(raw, self.default_limit, self.max_limit)
    }
}

/// Effective limit and offset of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Build from raw query-string values.
    ///
    /// Absent or non-numeric values take the defaults (offset 0). Negative
    /// values become 0 and a limit above `limits.max_limit` becomes the max.
    pub fn from_query(limit: Option<&str>, offset: Option<&str>, limits: PageLimits) -> Self {
        Self {
            limit: limits.parse_limit(limit),
            offset: parse_count(offset, 0, u32::MAX),
        }
    }
}

fn parse_count(raw: Option<&str>, default: u32, max: u32) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };

    match raw.parse::<i64>() {
        Ok(n) if n < 0 => 0,
        Ok(n) => u32::try_from(n).map_or(max, |n| n.min(max)),
        // Numeric but too wide for i64.
        Err(_) if is_integer_literal(raw) => {
            if raw.starts_with('-') {
                0
            } else {
                max
            }
        }
        Err(_) => default,
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
