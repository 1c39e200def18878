use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::schema::{price_history, products};

#[derive(Queryable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = products)]
pub struct Product {
    pub id: i32,
    pub product_code: String,
    pub title: String,
    pub brand: String,
    pub image: String,
    pub current_price: f64,
    pub prev_price: f64,
    pub url: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = products)]
pub struct NewProduct<'a> {
    pub product_code: &'a str,
    pub title: &'a str,
    pub brand: &'a str,
    pub image: &'a str,
    pub current_price: f64,
    pub prev_price: f64,
    pub url: &'a str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fields a re-scrape is allowed to overwrite. Brand, url and the product
/// code stay as first recorded.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = products)]
pub struct UpdateProduct<'a> {
    pub title: &'a str,
    pub image: &'a str,
    pub current_price: f64,
    pub prev_price: f64,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Product))]
#[diesel(table_name = price_history)]
pub struct PriceHistory {
    pub id: i32,
    pub product_id: i32,
    pub price: f64,
    pub recorded_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = price_history)]
pub struct NewPriceHistory {
    pub product_id: i32,
    pub price: f64,
    pub recorded_at: NaiveDateTime,
}
