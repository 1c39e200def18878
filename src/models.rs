use serde::{Deserialize, Serialize};

use crate::db::models::{PriceHistory, Product};
use crate::filter::{PerPage, QueryState};
use crate::pagination::{Page, PageMeta};
use crate::view_mode::ViewMode;

/// One product as reported by the external scraper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProduct {
    pub product_code: String,
    pub title: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    #[serde(default)]
    pub prev_price: Option<f64>,
    pub url: String,
}

impl ScrapedProduct {
    pub fn is_valid(&self) -> bool {
        !self.product_code.trim().is_empty()
            && self.price.is_finite()
            && self.price >= 0.0
            && self.prev_price.map_or(true, |p| p.is_finite() && p >= 0.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct ScrapeForm {
    pub scrape_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleViewForm {
    #[serde(rename = "toggleView")]
    pub toggle_view: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScrapeOutcome {
    pub status: &'static str,
    pub message: String,
    pub products: Vec<Product>,
}

impl ScrapeOutcome {
    pub fn success(products: Vec<Product>) -> Self {
        Self {
            status: "success",
            message: format!("{} products scraped and saved successfully.", products.len()),
            products,
        }
    }
}

/// Everything the renderer needs for one listing page.
#[derive(Debug, Serialize)]
pub struct ListingView {
    pub products: Vec<Product>,
    pub brands: Vec<String>,
    pub brand: String,
    pub search: String,
    pub per_page: PerPage,
    pub per_page_options: [PerPage; 3],
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
    pub has_prev: bool,
    pub has_next: bool,
    pub view_mode: ViewMode,
}

impl ListingView {
    pub fn new(state: &QueryState, page: Page<Product>, brands: Vec<String>, view_mode: ViewMode) -> Self {
        let PageMeta {
            page: current,
            total,
            total_pages,
            has_prev,
            has_next,
            ..
        } = page.meta;

        Self {
            products: page.items,
            brands,
            brand: state.brand.clone(),
            search: state.search.clone(),
            per_page: state.per_page,
            per_page_options: PerPage::ALL,
            page: current,
            total_pages,
            total,
            has_prev,
            has_next,
            view_mode,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub price_history: Vec<PriceHistory>,
}
