use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::db::connection::SqlitePool;
use crate::db::models::*;
use crate::db::schema::{price_history, products};
use crate::error::{AppError, Result};
use crate::filter::ProductFilter;
use crate::models::ScrapedProduct;
use crate::pagination::{Page, PageMeta};

/// Durable product collection. Rows come back in insertion (id) order so
/// repeated page requests over the same data are deterministic.
#[derive(Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn upsert(&self, item: &ScrapedProduct) -> Result<Product> {
        let conn = &mut self.pool.get()?;
        let now = Utc::now().naive_utc();
        conn.immediate_transaction(|conn| upsert_one(conn, item, now))
    }

    /// Writes a whole scrape batch in one transaction: all rows or none.
    pub fn upsert_all(&self, items: &[ScrapedProduct]) -> Result<Vec<Product>> {
        let conn = &mut self.pool.get()?;
        let now = Utc::now().naive_utc();
        conn.immediate_transaction(|conn| {
            items.iter().map(|item| upsert_one(conn, item, now)).collect()
        })
    }

    pub fn get_by_id(&self, id: i32) -> Result<Product> {
        let conn = &mut self.pool.get()?;
        products::table
            .find(id)
            .first::<Product>(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))
    }

    pub fn query(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let conn = &mut self.pool.get()?;
        let rows = filter
            .apply(products::table.into_boxed())
            .order(products::id.asc())
            .load::<Product>(conn)?;
        Ok(rows)
    }

    pub fn count(&self, filter: &ProductFilter) -> Result<i64> {
        let conn = &mut self.pool.get()?;
        count_matching(conn, filter)
    }

    /// Count and slice inside one read transaction, so the metadata and the
    /// items describe the same snapshot.
    pub fn query_page(&self, filter: &ProductFilter, page: i64, per_page: i64) -> Result<Page<Product>> {
        let conn = &mut self.pool.get()?;
        conn.transaction(|conn| {
            let meta = PageMeta::new(count_matching(conn, filter)?, page, per_page);
            let items = filter
                .apply(products::table.into_boxed())
                .order(products::id.asc())
                .offset(meta.offset())
                .limit(meta.per_page)
                .load::<Product>(conn)?;
            Ok(Page { items, meta })
        })
    }

    pub fn distinct_brands(&self) -> Result<Vec<String>> {
        let conn = &mut self.pool.get()?;
        let brands = products::table
            .select(products::brand)
            .filter(products::brand.ne(""))
            .distinct()
            .order(products::brand.asc())
            .load::<String>(conn)?;
        Ok(brands)
    }

    /// Replaced prices, newest first.
    pub fn price_history(&self, product: &Product) -> Result<Vec<PriceHistory>> {
        let conn = &mut self.pool.get()?;
        let history = PriceHistory::belonging_to(product)
            .order((price_history::recorded_at.desc(), price_history::id.desc()))
            .load::<PriceHistory>(conn)?;
        Ok(history)
    }

    pub fn source_urls(&self) -> Result<Vec<String>> {
        let conn = &mut self.pool.get()?;
        let urls = products::table
            .select(products::url)
            .distinct()
            .order(products::url.asc())
            .load::<String>(conn)?;
        Ok(urls)
    }
}

fn count_matching(conn: &mut SqliteConnection, filter: &ProductFilter) -> Result<i64> {
    let total = filter
        .apply(products::table.into_boxed())
        .count()
        .get_result::<i64>(conn)?;
    Ok(total)
}

fn cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

fn upsert_one(conn: &mut SqliteConnection, item: &ScrapedProduct, now: NaiveDateTime) -> Result<Product> {
    let code = item.product_code.as_str();
    let existing = products::table
        .filter(products::product_code.eq(code))
        .first::<Product>(conn)
        .optional()?;

    match existing {
        Some(current) => {
            let prev_price = if cents(current.current_price) != cents(item.price) {
                diesel::insert_into(price_history::table)
                    .values(&NewPriceHistory {
                        product_id: current.id,
                        price: current.current_price,
                        recorded_at: now,
                    })
                    .execute(conn)?;
                current.current_price
            } else {
                current.prev_price
            };

            diesel::update(products::table.find(current.id))
                .set(&UpdateProduct {
                    title: &item.title,
                    image: &item.image,
                    current_price: item.price,
                    prev_price,
                    updated_at: now,
                })
                .execute(conn)?;
        }
        None => {
            diesel::insert_into(products::table)
                .values(&NewProduct {
                    product_code: code,
                    title: &item.title,
                    brand: &item.brand,
                    image: &item.image,
                    current_price: item.price,
                    prev_price: item.prev_price.unwrap_or(item.price),
                    url: &item.url,
                    created_at: now,
                    updated_at: now,
                })
                .execute(conn)?;
        }
    }

    let stored = products::table
        .filter(products::product_code.eq(code))
        .first::<Product>(conn)?;
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::memory_pool;

    fn repo() -> ProductRepository {
        ProductRepository::new(memory_pool().expect("in-memory pool"))
    }

    fn scraped(code: &str, brand: &str, title: &str, price: f64) -> ScrapedProduct {
        ScrapedProduct {
            product_code: code.to_string(),
            title: title.to_string(),
            brand: brand.to_string(),
            image: format!("https://cdn.example/{code}.jpg"),
            price,
            prev_price: None,
            url: format!("https://shop.example/p/{code}"),
        }
    }

    fn seeded() -> ProductRepository {
        let repo = repo();
        repo.upsert_all(&[
            scraped("A1", "Nike", "Air Max", 120.0),
            scraped("B2", "Puma", "RS-X", 95.5),
        ])
        .unwrap();
        repo
    }

    #[test]
    fn upsert_assigns_ids_and_is_queryable_by_id() {
        let repo = repo();
        let a = repo.upsert(&scraped("A1", "Nike", "Air Max", 120.0)).unwrap();
        let b = repo.upsert(&scraped("B2", "Puma", "RS-X", 95.5)).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.prev_price, 120.0);

        for stored in [&a, &b] {
            let found = repo.query(&ProductFilter::by_id(stored.id)).unwrap();
            assert_eq!(found, vec![stored.clone()]);
        }
    }

    #[test]
    fn same_code_updates_in_place() {
        let repo = repo();
        let first = repo.upsert(&scraped("A1", "Nike", "Air Max", 120.0)).unwrap();
        let mut again = scraped("A1", "Nike", "Air Max 90", 99.9);
        again.image = "https://cdn.example/new.jpg".to_string();
        let second = repo.upsert(&again).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.current_price, 99.9);
        assert_eq!(second.prev_price, 120.0);
        assert_eq!(second.title, "Air Max 90");
        assert_eq!(second.image, "https://cdn.example/new.jpg");
        assert_eq!(repo.count(&ProductFilter::all()).unwrap(), 1);
        assert_eq!(repo.query(&ProductFilter::by_id(first.id)).unwrap(), vec![second.clone()]);

        let history = repo.price_history(&second).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, 120.0);
    }

    #[test]
    fn unchanged_price_keeps_prev_price_and_history() {
        let repo = repo();
        let mut item = scraped("A1", "Nike", "Air Max", 120.0);
        item.prev_price = Some(150.0);
        let first = repo.upsert(&item).unwrap();
        assert_eq!(first.prev_price, 150.0);

        let second = repo.upsert(&item).unwrap();
        assert_eq!(second.prev_price, 150.0);
        assert!(repo.price_history(&second).unwrap().is_empty());
    }

    #[test]
    fn get_by_id_reports_missing_rows() {
        let repo = seeded();
        assert!(matches!(repo.get_by_id(999), Err(AppError::NotFound(_))));
    }

    #[test]
    fn filters_by_brand_and_search() {
        let repo = seeded();

        let nike = ProductFilter { brand: Some("Nike".into()), ..ProductFilter::all() };
        let codes: Vec<_> = repo.query(&nike).unwrap().into_iter().map(|p| p.product_code).collect();
        assert_eq!(codes, vec!["A1"]);

        let rs = ProductFilter { search: Some("rs".into()), ..ProductFilter::all() };
        let codes: Vec<_> = repo.query(&rs).unwrap().into_iter().map(|p| p.product_code).collect();
        assert_eq!(codes, vec!["B2"]);

        let wildcard = ProductFilter { search: Some("%".into()), ..ProductFilter::all() };
        assert!(repo.query(&wildcard).unwrap().is_empty());
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let repo = seeded();
        repo.upsert(&scraped("C3", "Derimod", "ÇANTA Deri", 450.0)).unwrap();

        for term in ["çanta", "ÇANTA", "Çanta deri"] {
            let filter = ProductFilter { search: Some(term.into()), ..ProductFilter::all() };
            let found = repo.query(&filter).unwrap();
            assert_eq!(found.len(), 1, "search={term}");
            assert_eq!(found[0].product_code, "C3");

            let all = repo.query(&ProductFilter::all()).unwrap();
            let in_memory: Vec<_> = all.into_iter().filter(|p| filter.matches(p)).collect();
            assert_eq!(found, in_memory);
        }
    }

    #[test]
    fn failing_row_rolls_back_whole_batch() {
        let repo = repo();
        let result = repo.upsert_all(&[
            scraped("A1", "Nike", "Air Max", 120.0),
            scraped("B2", "Puma", "RS-X", -1.0),
        ]);
        assert!(result.is_err());
        assert_eq!(repo.count(&ProductFilter::all()).unwrap(), 0);

        // a valid retry after the rollback goes through
        let seeded = seeded();
        let result = seeded.upsert_all(&[
            scraped("A1", "Nike", "Air Max", 99.0),
            scraped("B2", "Puma", "RS-X", -1.0),
        ]);
        assert!(result.is_err());
        let a1 = seeded.query(&ProductFilter::all()).unwrap().remove(0);
        assert_eq!(a1.current_price, 120.0);
        assert!(seeded.price_history(&a1).unwrap().is_empty());
    }

    #[test]
    fn query_page_matches_in_memory_pagination() {
        let repo = seeded();
        let page = repo.query_page(&ProductFilter::all(), 2, 1).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].product_code, "B2");
        assert_eq!(page.meta.total, 2);
        assert!(page.meta.has_prev);
        assert!(!page.meta.has_next);

        let all = repo.query(&ProductFilter::all()).unwrap();
        assert_eq!(page, crate::pagination::paginate(&all, 2, 1));
    }

    #[test]
    fn distinct_brands_skip_empty() {
        let repo = seeded();
        repo.upsert(&scraped("C3", "", "Mystery Box", 5.0)).unwrap();
        repo.upsert(&scraped("D4", "Nike", "Pegasus", 80.0)).unwrap();
        assert_eq!(repo.distinct_brands().unwrap(), vec!["Nike", "Puma"]);
    }
}
