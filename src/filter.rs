//! Turns loosely typed listing parameters into a validated [`QueryState`] and
//! the [`ProductFilter`] predicate the store executes.
//!
//! Parsing is lenient: a missing or malformed `page`/`per_page` silently falls
//! back to its default and never produces an error.

use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};

use crate::db::models::Product;
use crate::db::schema::products;

diesel::define_sql_function! {
    /// Unicode-aware lowercasing. SQLite's builtin `lower()` folds ASCII
    /// only; the implementation is registered on every pooled connection.
    fn unicode_lower(x: Text) -> Text;
}

/// Raw query-string parameters of a listing request.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListingParams {
    pub brand: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// Allowed page sizes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "i64")]
pub enum PerPage {
    #[default]
    Ten,
    Twenty,
    Fifty,
}

impl PerPage {
    pub const ALL: [PerPage; 3] = [PerPage::Ten, PerPage::Twenty, PerPage::Fifty];

    pub fn get(self) -> i64 {
        match self {
            PerPage::Ten => 10,
            PerPage::Twenty => 20,
            PerPage::Fifty => 50,
        }
    }

    /// Anything other than one of the allowed sizes yields the default.
    pub fn parse(raw: Option<&str>) -> PerPage {
        match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
            Some(20) => PerPage::Twenty,
            Some(50) => PerPage::Fifty,
            _ => PerPage::Ten,
        }
    }
}

impl From<PerPage> for i64 {
    fn from(per_page: PerPage) -> i64 {
        per_page.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryState {
    /// Empty means no brand filter.
    pub brand: String,
    /// Empty means no title search.
    pub search: String,
    pub page: i64,
    pub per_page: PerPage,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            brand: String::new(),
            search: String::new(),
            page: 1,
            per_page: PerPage::default(),
        }
    }
}

impl QueryState {
    pub fn from_params(params: &ListingParams) -> Self {
        Self {
            brand: trimmed(params.brand.as_deref()),
            search: trimmed(params.search.as_deref()),
            page: parse_page(params.page.as_deref()),
            per_page: PerPage::parse(params.per_page.as_deref()),
        }
    }

    pub fn filter(&self) -> ProductFilter {
        ProductFilter {
            id: None,
            brand: non_empty(&self.brand),
            search: non_empty(&self.search),
        }
    }
}

fn trimmed(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_page(raw: Option<&str>) -> i64 {
    raw.map(str::trim)
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
}

/// Conjunction of the active filters. `None` fields do not constrain.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub id: Option<i32>,
    pub brand: Option<String>,
    pub search: Option<String>,
}

impl ProductFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: i32) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn apply<'a>(
        &'a self,
        mut query: products::BoxedQuery<'a, Sqlite>,
    ) -> products::BoxedQuery<'a, Sqlite> {
        if let Some(id) = self.id {
            query = query.filter(products::id.eq(id));
        }
        if let Some(brand) = &self.brand {
            query = query.filter(products::brand.eq(brand.as_str()));
        }
        if let Some(search) = &self.search {
            query = query.filter(
                unicode_lower(products::title)
                    .like(like_pattern(&search.to_lowercase()))
                    .escape('\\'),
            );
        }
        query
    }

    /// In-memory equivalent of [`ProductFilter::apply`].
    pub fn matches(&self, product: &Product) -> bool {
        if self.id.is_some_and(|id| id != product.id) {
            return false;
        }
        if self.brand.as_deref().is_some_and(|brand| brand != product.brand) {
            return false;
        }
        match &self.search {
            Some(search) => product.title.to_lowercase().contains(&search.to_lowercase()),
            None => true,
        }
    }
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
