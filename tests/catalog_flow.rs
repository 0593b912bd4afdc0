//! Integration tests for catalog navigation and mutation against a mock
//! store: drill, back, insert-above-child, delete.
//!
//! Each test runs its own mock server. The store is the only source of
//! truth, so every assertion about the view goes through a refetch; nothing
//! here inspects or mutates client-side state directly except to seed it.

use std::time::Duration;

use curator::api::{ApiClient, CategoryDraft, CategoryId};
use curator::app::App;
use curator::catalog::Navigator;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn row(id: &str, name: &str, parent: Option<&str>, level: u32) -> serde_json::Value {
    json!({
        "_id": id,
        "name": name,
        "slug": name.to_lowercase(),
        "parent_id": parent,
        "level": level,
    })
}

async fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), None, Duration::from_secs(2)).unwrap()
}

async fn app_with_roots(server: &MockServer, roots: serde_json::Value) -> App {
    Mock::given(method("GET"))
        .and(path("/category/level/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(roots))
        .mount(server)
        .await;
    let mut app = App::new(client(server).await, 10);
    assert!(app.refresh().await);
    app
}

// ============================================================================
// Navigation refetches instead of caching
// ============================================================================

#[tokio::test]
async fn test_back_shows_the_stores_current_listing() {
    let server = MockServer::start().await;

    // the root listing changes between the first fetch and the return trip
    Mock::given(method("GET"))
        .and(path("/category/level/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("a", "Art", None, 1)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/category/level/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([row("a", "Art", None, 1), row("b", "Books", None, 1)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/category/children-of-parent/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut app = App::new(client(&server).await, 10);
    assert!(app.refresh().await);
    assert_eq!(app.nav.frontier().len(), 1);

    assert!(app.drill(&CategoryId::from("a")).await);
    assert!(app.back().await);

    // the new row is visible because back refetched
    assert_eq!(app.nav.frontier().len(), 2);
    assert_eq!(app.nav.frontier()[1].name, "Books");

    let root_fetches = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/category/level/1")
        .count();
    assert_eq!(root_fetches, 2, "back must refetch, not replay a cache");
}

#[tokio::test]
async fn test_trail_follows_drill_and_back() {
    let server = MockServer::start().await;
    let mut app = app_with_roots(&server, json!([row("a", "Art", None, 1)])).await;

    Mock::given(method("GET"))
        .and(path("/category/children-of-parent/a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([row("p", "Prints", Some("a"), 2)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/category/children-of-parent/p"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(app.drill(&CategoryId::from("a")).await);
    assert!(app.drill(&CategoryId::from("p")).await);
    assert_eq!(app.nav.trail(), vec!["Art", "Prints"]);
    assert_eq!(app.nav.depth(), 2);

    assert!(app.back().await);
    assert_eq!(app.nav.trail(), vec!["Art"]);
    assert_eq!(app.nav.frontier()[0].name, "Prints");
}

// ============================================================================
// Stale response suppression
// ============================================================================

#[tokio::test]
async fn test_slow_response_for_abandoned_drill_never_lands() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/category/level/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("a", "Art", None, 1)])))
        .mount(&server)
        .await;
    // the drill's children listing is slow enough that the operator's
    // follow-up navigation settles first
    Mock::given(method("GET"))
        .and(path("/category/children-of-parent/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([row("p", "Prints", Some("a"), 2)]))
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&server)
        .await;

    let api = client(&server).await;
    let mut nav = Navigator::new();

    let seed = nav.refresh();
    let roots = api.fetch_frontier(seed.parent()).await.unwrap();
    assert!(nav.absorb(seed, roots));

    // drill into Art; its response is still in flight when the operator
    // backs out
    let drill = nav.drill_into(&CategoryId::from("a")).unwrap();
    let in_flight = {
        let api = api.clone();
        let parent = drill.parent().cloned();
        tokio::spawn(async move { api.fetch_frontier(parent.as_ref()).await })
    };

    let back = nav.go_back().expect("drill pushed a trail entry");
    let rows = api.fetch_frontier(back.parent()).await.unwrap();
    assert!(nav.absorb(back, rows));
    assert_eq!(nav.trail().len(), 0);

    // the slow response finally arrives; it belongs to an abandoned view
    let stale = in_flight.await.unwrap().unwrap();
    assert!(!nav.absorb(drill, stale), "stale rows must be discarded");
    assert_eq!(nav.frontier()[0].name, "Art");
    assert_eq!(nav.depth(), 0);
}

// ============================================================================
// Insert splices and the store re-levels
// ============================================================================

#[tokio::test]
async fn test_insert_shifts_the_child_down_one_level() {
    let server = MockServer::start().await;
    let mut app = app_with_roots(&server, json!([row("t", "Top", None, 1)])).await;

    // before the splice Top's child is Basics at level 2
    Mock::given(method("GET"))
        .and(path("/category/children-of-parent/t"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([row("b", "Basics", Some("t"), 2)])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // afterwards the store reports the spliced node in its place
    Mock::given(method("GET"))
        .and(path("/category/children-of-parent/t"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([row("m", "Middle", Some("t"), 2)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/category/children-of-parent/m"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([row("b", "Basics", Some("m"), 3)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/category/insert"))
        .and(body_json(json!({
            "name": "Middle",
            "parent_id": "t",
            "level": 2,
            "children_id": "b",
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(row("m", "Middle", Some("t"), 2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let top = app.resolve_subject("top").unwrap().clone();
    let draft = CategoryDraft::new("Middle");
    assert!(app.insert_category(&top, &draft, "basics").await);

    // the store owns levels: the old child now sits one deeper, under the
    // spliced node
    assert!(app.drill(&CategoryId::from("t")).await);
    assert_eq!(app.nav.frontier().len(), 1);
    assert_eq!(app.nav.frontier()[0].name, "Middle");
    assert_eq!(app.nav.frontier()[0].level, 2);

    assert!(app.drill(&CategoryId::from("m")).await);
    assert_eq!(app.nav.frontier()[0].name, "Basics");
    assert_eq!(app.nav.frontier()[0].level, 3);
    assert_eq!(
        app.nav.frontier()[0].parent_id,
        Some(CategoryId::from("m"))
    );
}

#[tokio::test]
async fn test_insert_requires_an_existing_child() {
    let server = MockServer::start().await;
    let mut app = app_with_roots(&server, json!([row("t", "Top", None, 1)])).await;

    Mock::given(method("GET"))
        .and(path("/category/children-of-parent/t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let top = app.resolve_subject("top").unwrap().clone();
    let draft = CategoryDraft::new("Middle");
    assert!(!app.insert_category(&top, &draft, "ghost").await);
    let notice = app.take_status().unwrap();
    assert!(notice.contains("not a current child"), "got notice: {notice}");

    // nothing was posted
    let inserts = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/category/insert")
        .count();
    assert_eq!(inserts, 0);
}

// ============================================================================
// Delete reflects whatever the store decided
// ============================================================================

#[tokio::test]
async fn test_delete_shows_the_post_delete_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/category/level/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([row("a", "Art", None, 1), row("b", "Books", None, 1)])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/category/level/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("b", "Books", None, 1)])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/category/a"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut app = App::new(client(&server).await, 10);
    assert!(app.refresh().await);

    let art = app.resolve_subject("art").unwrap().clone();
    app.arm_delete(art);
    assert!(app.confirm_delete().await);

    assert_eq!(app.nav.frontier().len(), 1);
    assert_eq!(app.nav.frontier()[0].name, "Books");
}

#[tokio::test]
async fn test_failed_delete_keeps_the_row() {
    let server = MockServer::start().await;
    let mut app = app_with_roots(&server, json!([row("a", "Art", None, 1)])).await;

    Mock::given(method("DELETE"))
        .and(path("/category/a"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string("category has active placements"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let art = app.resolve_subject("art").unwrap().clone();
    app.arm_delete(art);
    app.take_status();
    assert!(!app.confirm_delete().await);

    let notice = app.take_status().unwrap();
    assert!(notice.contains("Delete failed"), "got notice: {notice}");
    assert_eq!(app.nav.frontier().len(), 1, "row stays until the store drops it");
}
