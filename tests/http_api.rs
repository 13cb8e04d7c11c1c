use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::{json, Value};

use ThreadWalk::config::ConfigBuilder;
use ThreadWalk::http::{route, App};
use ThreadWalk::node::Node;
use ThreadWalk::store::MemStore;

fn app() -> App {
    let cfg = ConfigBuilder::from_default().max_limit(50).default_limit(10).build();
    App::new(Arc::new(MemStore::new()), cfg)
}

fn post(app: &App, comment: &str, parent: Option<&str>) -> Result<String> {
    // createdAt с точностью до мс: разводим вставки, чтобы порядок был детерминирован
    std::thread::sleep(Duration::from_millis(2));
    let body = json!({ "comment": comment, "parentId": parent }).to_string();
    let r = route(app, "POST", "/create", body.as_bytes());
    assert_eq!(r.status, 200, "{}", r.body);
    let v = r.json_body()?;
    Ok(v["comment"]["id"].as_str().unwrap_or_default().to_string())
}

fn get(app: &App, url: &str) -> Result<Value> {
    let r = route(app, "GET", url, b"");
    assert_eq!(r.status, 200, "{} -> {}", url, r.body);
    assert_eq!(r.content_type, "application/json");
    r.json_body()
}

fn ids(v: &Value) -> Vec<String> {
    v["comments"]
        .as_array()
        .map(|a| {
            a.iter()
                .map(|c| c["comment"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn health_and_unknown_routes() {
    let app = app();
    assert_eq!(route(&app, "GET", "/", b"").status, 200);
    assert_eq!(route(&app, "GET", "/health", b"").body, "OK\n");
    assert_eq!(route(&app, "GET", "/nope", b"").status, 404);
    assert_eq!(route(&app, "DELETE", "/comments", b"").status, 404);
}

#[test]
fn create_validates_body_and_parent() -> Result<()> {
    let app = app();
    let bad = route(&app, "POST", "/create", b"{not json");
    assert_eq!(bad.status, 400);
    assert!(bad.json_body()?["error"].is_string());

    let unknown = route(&app, "POST", "/create", br#"{"comment":"x","parentId":"ghost"}"#);
    assert_eq!(unknown.status, 400);

    let root = post(&app, "hello", None)?;
    let r = route(
        &app,
        "POST",
        "/create",
        json!({ "comment": "reply", "parentId": &root }).to_string().as_bytes(),
    );
    let v = r.json_body()?;
    assert_eq!(v["comment"]["parentId"], Value::String(root));
    assert_eq!(v["comment"]["comment"], "reply");
    Ok(())
}

#[test]
fn flat_tree_and_dfs_endpoints() -> Result<()> {
    let app = app();
    let a = post(&app, "A", None)?;
    let a1 = post(&app, "A1", Some(&a))?;
    post(&app, "A1x", Some(&a1))?;
    post(&app, "B", None)?;

    // flat: A, A1, B (внук A1x не попадает)
    let mut seen = Vec::new();
    let mut url = "/comments?limit=1".to_string();
    loop {
        let v = get(&app, &url)?;
        assert_eq!(v["totalComments"], 4);
        assert_eq!(v["totalItemsInPage"], 1);
        seen.extend(ids(&v));
        match v["nextCursor"].as_str() {
            Some(c) => url = format!("/comments?limit=1&cursor={}", c),
            None => break,
        }
    }
    assert_eq!(seen, ["A", "A1", "B"]);

    // tree: оба корня, A с вложенностью
    let v = get(&app, "/comment-with-replies?limit=5")?;
    assert_eq!(ids(&v), ["A", "B"]);
    assert_eq!(v["comments"][0]["_count"]["replies"], 1);
    assert_eq!(v["comments"][0]["replies"][0]["replies"][0]["comment"], "A1x");
    assert!(v["nextCursor"].is_null());
    // старое написание маршрута тоже работает
    assert_eq!(get(&app, "/comment-with-replis?limit=5")?, v);

    // dfs: полный pre-order
    let v = get(&app, "/dfs?limit=10")?;
    assert_eq!(ids(&v), ["A", "A1", "A1x", "B"]);
    assert_eq!(v["totalItemsInPage"], 4);
    assert!(v["nextCursor"].is_null());
    Ok(())
}

#[test]
fn limit_is_defaulted_and_clamped() -> Result<()> {
    let app = app();
    for i in 0..60 {
        post(&app, &format!("r{:02}", i), None)?;
    }
    assert_eq!(get(&app, "/dfs")?["totalItemsInPage"], 10);
    assert_eq!(get(&app, "/dfs?limit=abc")?["totalItemsInPage"], 10);
    assert_eq!(get(&app, "/dfs?limit=-3")?["totalItemsInPage"], 10);
    assert_eq!(get(&app, "/dfs?limit=0")?["totalItemsInPage"], 10);
    assert_eq!(get(&app, "/dfs?limit=500")?["totalItemsInPage"], 50);
    assert_eq!(get(&app, "/comments?limit=7")?["totalItemsInPage"], 7);
    assert_eq!(get(&app, "/dfs?limit=7.9")?["totalItemsInPage"], 7);
    Ok(())
}

#[test]
fn garbage_cursor_means_start() -> Result<()> {
    let app = app();
    post(&app, "first", None)?;
    let v = get(&app, "/dfs?cursor=%%%garbage&limit=1")?;
    assert_eq!(ids(&v), ["first"]);
    Ok(())
}

#[test]
fn metrics_are_exposed_as_prometheus_text() -> Result<()> {
    let app = app();
    post(&app, "x", None)?;
    get(&app, "/comments")?;
    let r = route(&app, "GET", "/metrics", b"");
    assert_eq!(r.status, 200);
    assert!(r.content_type.starts_with("text/plain"));
    assert!(r.body.contains("threadwalk_pages_total"));
    Ok(())
}

#[test]
fn unescaped_legacy_cursor_resumes() -> Result<()> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use chrono::{TimeZone, Utc};

    let at = |ms: i64| Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap();
    let root = |id: &str, ms: i64| Node {
        id: id.to_string(),
        content: id.to_string(),
        parent_id: None,
        created_at: at(ms),
    };
    let store = MemStore::from_nodes(vec![root("a", 1), root("~~~", 2), root("z", 3)]);
    let app = App::new(Arc::new(store), ConfigBuilder::from_default().build());

    // стандартный алфавит с '+' и паддингом, в URL без percent-encoding
    let token = STANDARD.encode(
        r#"{"lastParentId":"~~~","lastParentCreatedAt":"2023-11-14T22:13:20.002Z"}"#,
    );
    assert!(token.contains('+') && token.ends_with('='), "{}", token);
    let v = get(&app, &format!("/comment-with-replies?limit=5&cursor={}", token))?;
    assert_eq!(ids(&v), ["z"]);
    Ok(())
}
