use academy_engine::{db_types::{CourseType, Role}, CatalogApi};
use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::{json, Value};

use super::{
    helpers::{catalog_item, get_request, issue_token, issuer, patch_request, post_request, Credentials},
    mocks::MockCatalogStore,
};
use crate::{
    middleware::JwtAuthMiddlewareFactory,
    routes::{CatalogItemRoute, CatalogRoute, CreateCatalogItemRoute, UpdateCatalogItemRoute},
};

fn mount(cfg: &mut ServiceConfig, store: MockCatalogStore) {
    let api = CatalogApi::new(store);
    let scope = web::scope("/api")
        .wrap(JwtAuthMiddlewareFactory::new(issuer()))
        .service(CreateCatalogItemRoute::<MockCatalogStore>::new())
        .service(UpdateCatalogItemRoute::<MockCatalogStore>::new());
    cfg.app_data(web::Data::new(api))
        .service(CatalogRoute::<MockCatalogStore>::new())
        .service(CatalogItemRoute::<MockCatalogStore>::new())
        .service(scope);
}

#[actix_web::test]
async fn list_published_courses() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Credentials::None, "/catalog/course", |cfg| {
        let mut store = MockCatalogStore::new();
        store
            .expect_fetch_catalog()
            .withf(|kind, published_only| *kind == CourseType::Course && *published_only)
            .times(1)
            .returning(|kind, _| {
                Ok(vec![catalog_item(1, kind, "Intro to Rust", "intro-to-rust"), catalog_item(2, kind, "Async Rust", "async-rust")])
            });
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let items: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["slug"], "intro-to-rust");
    assert_eq!(items[0]["kind"], "course");
}

#[actix_web::test]
async fn unknown_catalog_kind() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Credentials::None, "/catalog/webinar", |cfg| {
        let mut store = MockCatalogStore::new();
        store.expect_fetch_catalog().never();
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Could not read request path: Invalid value: webinar is not a valid course type"}"#);
}

#[actix_web::test]
async fn fetch_item_by_slug() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Credentials::None, "/catalog/skillpath/frontend-101", |cfg| {
        let mut store = MockCatalogStore::new();
        store
            .expect_fetch_catalog_item_by_slug()
            .returning(|kind, slug| Ok(Some(catalog_item(3, kind, "Frontend 101", slug))));
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let item: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(item["id"], 3);
    assert_eq!(item["kind"], "skillpath");
}

#[actix_web::test]
async fn unpublished_items_are_hidden() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Credentials::None, "/catalog/course/draft", |cfg| {
        let mut store = MockCatalogStore::new();
        store.expect_fetch_catalog_item_by_slug().returning(|kind, slug| {
            let mut item = catalog_item(4, kind, "Draft", slug);
            item.published = false;
            Ok(Some(item))
        });
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. There is no course with slug 'draft'"}"#);
}

#[actix_web::test]
async fn instructor_creates_a_course_with_a_free_slug() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(2, "alan@example.com", Role::Instructor);
    let request = json!({ "kind": "course", "title": "  Intro to Rust ", "price": 999.0, "published": true });
    let (status, body) = post_request(Credentials::Bearer(&token), "/api/admin/catalog", request, |cfg| {
        let mut store = MockCatalogStore::new();
        store.expect_slug_exists().returning(|_, slug, _| Ok(slug == "intro-to-rust"));
        store.expect_insert_catalog_item().times(1).returning(|item, slug| {
            let mut created = catalog_item(10, item.kind, &item.title, slug);
            created.price = item.price;
            Ok(created)
        });
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(item["title"], "Intro to Rust");
    assert_eq!(item["slug"], "intro-to-rust-2");
    assert_eq!(item["price"], 999.0);
}

#[actix_web::test]
async fn instructors_cannot_create_skill_paths() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(2, "alan@example.com", Role::Instructor);
    let request = json!({ "kind": "skillpath", "title": "Frontend 101" });
    let (status, body) = post_request(Credentials::Bearer(&token), "/api/admin/catalog", request, |cfg| {
        let mut store = MockCatalogStore::new();
        store.expect_insert_catalog_item().never();
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Insufficient Permissions. Instructors cannot manage skillpath items"}"#);
}

#[actix_web::test]
async fn students_cannot_edit_the_catalog() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(4, "ada@example.com", Role::Student);
    let request = json!({ "kind": "course", "title": "Sneaky" });
    let (status, _) = post_request(Credentials::Bearer(&token), "/api/admin/catalog", request, |cfg| {
        let mut store = MockCatalogStore::new();
        store.expect_insert_catalog_item().never();
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn renaming_an_item_regenerates_its_slug() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(1, "admin@example.com", Role::Admin);
    let (status, body) = patch_request(Credentials::Bearer(&token), "/api/admin/catalog/9", json!({ "title": "Advanced Rust" }), |cfg| {
        let mut store = MockCatalogStore::new();
        store
            .expect_fetch_catalog_item()
            .returning(|id| Ok(Some(catalog_item(id, CourseType::Course, "Intro to Rust", "intro-to-rust"))));
        store.expect_slug_exists().withf(|_, _, exclude| *exclude == Some(9)).returning(|_, _, _| Ok(false));
        store
            .expect_update_catalog_item()
            .withf(|id, update| *id == 9 && update.slug.as_deref() == Some("advanced-rust"))
            .times(1)
            .returning(|id, update| {
                let title = update.title.unwrap_or_default();
                let slug = update.slug.unwrap_or_default();
                Ok(catalog_item(id, CourseType::Course, &title, &slug))
            });
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let item: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(item["slug"], "advanced-rust");
}

#[actix_web::test]
async fn empty_update_is_rejected() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(1, "admin@example.com", Role::Admin);
    let (status, body) = patch_request(Credentials::Bearer(&token), "/api/admin/catalog/9", json!({}), |cfg| {
        let mut store = MockCatalogStore::new();
        store
            .expect_fetch_catalog_item()
            .returning(|id| Ok(Some(catalog_item(id, CourseType::Course, "Intro to Rust", "intro-to-rust"))));
        store.expect_update_catalog_item().never();
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Could not read request body: Nothing to update"}"#);
}
