//! Items API Example
//!
//! This example demonstrates:
//! - A generic CRUD viewset over a synchronous in-memory repository
//! - Declared repository errors rendered as problem details
//! - A hand-written, paginated list view with a custom route
//! - The full middleware stack and a health probe with one indicator
//!
//! Run with: cargo run --example items-api
//!
//! Test with:
//!   curl -X POST http://localhost:8080/items \
//!     -H "Content-Type: application/json" \
//!     -d '{"name":"Widget","price":500}'
//!   curl http://localhost:8080/items
//!   curl http://localhost:8080/tags?page_size=2
//!   curl http://localhost:8080/tags/count
//!   curl http://localhost:8080/healthz

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::Method;
use restviews::config::PaginationConfig;
use restviews::prelude::*;

#[derive(Debug, thiserror::Error)]
#[error("price must stay below 1,000,000")]
struct PriceCeiling;

#[derive(Default)]
struct MemoryItems {
    rows: Mutex<BTreeMap<String, Record>>,
}

impl MemoryItems {
    fn key(params: &Record) -> String {
        params
            .get("id")
            .and_then(|id| id.as_str())
            .unwrap_or_default()
            .to_string()
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Record>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SyncRepository for MemoryItems {
    type Entity = Record;

    fn list(&self, _params: Record) -> anyhow::Result<Vec<Record>> {
        Ok(self.rows().values().cloned().collect())
    }

    fn retrieve(&self, params: Record) -> anyhow::Result<Option<Record>> {
        Ok(self.rows().get(&Self::key(&params)).cloned())
    }

    fn create(&self, entity: Record, _params: Record) -> anyhow::Result<Option<Record>> {
        if entity.get("price").and_then(|p| p.as_i64()) >= Some(1_000_000) {
            return Err(PriceCeiling.into());
        }
        self.rows().insert(Self::key(&entity), entity.clone());
        Ok(Some(entity))
    }

    fn update(&self, entity: Record, params: Record) -> anyhow::Result<Option<Record>> {
        Ok(self.rows().get_mut(&Self::key(&params)).map(|row| {
            row.extend(entity);
            row.clone()
        }))
    }

    fn delete(&self, params: Record) -> anyhow::Result<()> {
        self.rows().remove(&Self::key(&params));
        Ok(())
    }
}

struct Tags {
    names: Vec<&'static str>,
    pagination: PaginationConfig,
}

impl ListAction for Tags {
    type Query = PageQuery;
    type Output = Page<&'static str>;

    async fn list(&self, _ctx: &mut ViewContext, query: PageQuery) -> anyhow::Result<Page<&'static str>> {
        let query = query.bounded(&self.pagination)?;
        let start: usize = match &query.page {
            Some(token) => token
                .as_str()
                .parse()
                .map_err(|_| ApiError::bad_request("Unknown page token"))?,
            None => 0,
        };
        let end = (start + query.page_size as usize).min(self.names.len());
        let items = self.names.get(start..end).unwrap_or_default().to_vec();

        let next = (end < self.names.len()).then(|| PageToken::new(end.to_string()));
        let previous = (start > 0).then(|| {
            PageToken::new(start.saturating_sub(query.page_size as usize).to_string())
        });
        Ok(Page::new(items).with_next_page(next).with_previous_page(previous))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let item = Schema::new("Item")
        .field(Field::new("id", FieldType::Uuid))
        .field(Field::new("name", FieldType::String))
        .field(Field::new("price", FieldType::Integer));

    let items = GenericView::new(
        item,
        RepositorySource::shared(Blocking::new(MemoryItems::default())),
    )
    .raises(Raises::new().catch_with::<PriceCeiling>(
        Raise::new().detail("Price is above the catalogue ceiling"),
    ))
    .api(ViewConfig::new("Item"))?;

    let tags = Arc::new(Tags {
        names: vec!["new", "sale", "popular", "limited", "seasonal"],
        pagination: config.pagination.clone(),
    });
    let tag_count = tags.names.len();
    let tags = Viewset::builder(ViewConfig::new("Tag"))
        .list(tags)
        .route(CustomRoute::new(
            "count",
            "/count",
            [Method::GET],
            move |_ctx: &mut ViewContext, _input: RouteInput| {
                Box::pin(async move { Ok(serde_json::json!({ "count": tag_count })) })
            },
        ))
        .build()?;

    let responder = error_responder(&config, ErrorRegistry::builtin());
    let views = view_router(&config, responder)
        .with_viewset(&items, "/items")?
        .with_viewset(&tags, "/tags")?;
    for route in views.routes() {
        tracing::info!(path = %route.path, operation_id = %route.operation_id, "route");
    }

    let health = HealthCheck::from_config(&config.healthcheck).indicator(FnIndicator::new(
        "memory-store",
        || async { Ok(()) },
    ));

    let app = configure_app(views, &config, Some(health))?;
    let result = Server::new(config).serve(app).await;
    shutdown_tracing();
    result
}
