// 🏷️ Grocery Categories - the closed category set
// Every classification tier ends in one of these twelve values

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Maximum number of words kept in a normalized display name
pub const MAX_NAME_WORDS: usize = 3;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Produce,
    Meat,
    Seafood,
    Dairy,
    Bakery,
    Frozen,
    Pantry,
    Snacks,
    Beverages,
    Household,
    #[serde(rename = "Personal Care")]
    PersonalCare,
    Misc,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Produce,
        Category::Meat,
        Category::Seafood,
        Category::Dairy,
        Category::Bakery,
        Category::Frozen,
        Category::Pantry,
        Category::Snacks,
        Category::Beverages,
        Category::Household,
        Category::PersonalCare,
        Category::Misc,
    ];

    /// Display label, also the value stored in SQLite and shown in groups
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Produce => "Produce",
            Category::Meat => "Meat",
            Category::Seafood => "Seafood",
            Category::Dairy => "Dairy",
            Category::Bakery => "Bakery",
            Category::Frozen => "Frozen",
            Category::Pantry => "Pantry",
            Category::Snacks => "Snacks",
            Category::Beverages => "Beverages",
            Category::Household => "Household",
            Category::PersonalCare => "Personal Care",
            Category::Misc => "Misc",
        }
    }

    /// Match a free-form label against the set after title casing it,
    /// so "dairy", " DAIRY " and "personal care" are all accepted.
    pub fn from_label(label: &str) -> Option<Category> {
        let titled = title_case(label);
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == titled)
    }

    pub fn is_misc(&self) -> bool {
        matches!(self, Category::Misc)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_label(s).ok_or_else(|| Error::UnknownCategory(s.trim().to_string()))
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Category plus the display name chosen for an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub normalized_name: String,
}

impl Classification {
    pub fn new(category: Category, normalized_name: impl Into<String>) -> Self {
        Classification {
            category,
            normalized_name: normalized_name.into(),
        }
    }

    /// Misc classification that keeps the raw item readable
    pub fn misc(item: &str) -> Self {
        Classification::new(Category::Misc, short_name(item))
    }
}

// ============================================================================
// NAME HELPERS
// ============================================================================

/// Capitalize each whitespace-separated word and collapse runs of whitespace
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title-cased name truncated to its first three words
pub fn short_name(s: &str) -> String {
    title_case(s)
        .split(' ')
        .filter(|word| !word.is_empty())
        .take(MAX_NAME_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}
