use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::db::repository::ProductRepository;
use crate::error::Result;
use crate::filter::{ListingParams, QueryState};
use crate::models::{ListingView, ProductDetail, ScrapeForm, ScrapeOutcome, ToggleViewForm};
use crate::scrape::ScrapeOrchestrator;
use crate::view_mode::ViewMode;

#[derive(Clone)]
pub struct AppState {
    pub repo: ProductRepository,
    pub orchestrator: ScrapeOrchestrator,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(list_products))
        .route("/", web::post().to(submit_scrape))
        .route("/brand/{brand}", web::get().to(brand_products))
        .route("/toggle_view", web::post().to(toggle_view))
        .route("/product/{id}", web::get().to(product_detail))
        .route("/health", web::get().to(health));
}

async fn list_products(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<ListingParams>,
) -> Result<HttpResponse> {
    render_listing(&state, &req, QueryState::from_params(&params)).await
}

async fn brand_products(
    state: web::Data<AppState>,
    req: HttpRequest,
    brand: web::Path<String>,
    params: web::Query<ListingParams>,
) -> Result<HttpResponse> {
    let mut params = params.into_inner();
    params.brand = Some(brand.into_inner());
    render_listing(&state, &req, QueryState::from_params(&params)).await
}

async fn render_listing(state: &AppState, req: &HttpRequest, query: QueryState) -> Result<HttpResponse> {
    let repo = state.repo.clone();
    let filter = query.filter();
    let (page, per_page) = (query.page, query.per_page.get());

    let (page, brands) = web::block(move || -> Result<_> {
        Ok((repo.query_page(&filter, page, per_page)?, repo.distinct_brands()?))
    })
    .await??;

    let view = ListingView::new(&query, page, brands, ViewMode::current(req));
    Ok(HttpResponse::Ok().json(view))
}

async fn submit_scrape(state: web::Data<AppState>, form: web::Form<ScrapeForm>) -> Result<HttpResponse> {
    let url = form.into_inner().scrape_url.unwrap_or_default();
    let products = state.orchestrator.submit(&url).await?;
    Ok(HttpResponse::Ok().json(ScrapeOutcome::success(products.as_ref().clone())))
}

/// The form carries the mode currently shown; the cookie is the fallback.
async fn toggle_view(req: HttpRequest, form: web::Form<ToggleViewForm>) -> HttpResponse {
    let current = match form.into_inner().toggle_view {
        Some(raw) => ViewMode::parse(Some(&raw)),
        None => ViewMode::current(&req),
    };

    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(current.toggle().cookie())
        .finish()
}

async fn product_detail(state: web::Data<AppState>, id: web::Path<i32>) -> Result<HttpResponse> {
    let repo = state.repo.clone();
    let id = id.into_inner();

    let detail = web::block(move || -> Result<_> {
        let product = repo.get_by_id(id)?;
        let price_history = repo.price_history(&product)?;
        Ok(ProductDetail { product, price_history })
    })
    .await??;

    Ok(HttpResponse::Ok().json(detail))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
