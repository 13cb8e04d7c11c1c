//! http — JSON API над пагинаторами (tiny_http).
//!
//! - handlers.rs — маршруты и ответы (`route` → `Reply`), без сокетов;
//! - query.rs    — разбор query string.
//!
//! serve(): один tiny_http::Server, `http_workers` потоков делят его через Arc и
//! блокируются в recv(). Хранилище общее (Arc<dyn OrderedStore>); состояние
//! между запросами живёт только в курсорах.

pub mod handlers;
pub mod query;

use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use std::io::Read;
use std::sync::Arc;
use std::thread;
use tiny_http::{Header, Request, Response, Server};

use crate::config::WalkConfig;
use crate::store::OrderedStore;

pub use handlers::{route, Reply};

/// Request body cap for POST /create.
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Shared state of the HTTP surface.
pub struct App {
    store: Arc<dyn OrderedStore>,
    cfg: WalkConfig,
}

impl App {
    pub fn new(store: Arc<dyn OrderedStore>, cfg: WalkConfig) -> Self {
        Self { store, cfg }
    }

    pub fn store(&self) -> &dyn OrderedStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &WalkConfig {
        &self.cfg
    }
}

/// Bind `addr` and serve until the process exits.
pub fn serve(addr: &str, app: Arc<App>) -> Result<()> {
    let server = Server::http(addr).map_err(|e| anyhow!("bind http at {}: {}", addr, e))?;
    let server = Arc::new(server);
    let workers = app.config().http_workers.max(1);
    info!("threadwalk listening on {} ({} workers)", addr, workers);
    info!("{}", app.config());

    let mut handles = Vec::with_capacity(workers);
    for i in 0..workers {
        let server = Arc::clone(&server);
        let app = Arc::clone(&app);
        let h = thread::Builder::new()
            .name(format!("tw-http-{}", i))
            .spawn(move || worker_loop(&server, &app))
            .map_err(|e| anyhow!("spawn http worker {}: {}", i, e))?;
        handles.push(h);
    }
    for h in handles {
        if h.join().is_err() {
            error!("http worker panicked");
        }
    }
    Ok(())
}

fn worker_loop(server: &Server, app: &App) {
    loop {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(e) => {
                warn!("http recv error: {}", e);
                continue;
            }
        };
        respond(rq, app);
    }
}

fn respond(mut rq: Request, app: &App) {
    let method = rq.method().as_str().to_string();
    let url = rq.url().to_string();

    let mut body = Vec::new();
    let read = rq.as_reader().take(MAX_BODY_BYTES).read_to_end(&mut body);
    if let Err(e) = read {
        warn!("{} {}: read body: {}", method, url, e);
        let _ = rq.respond(Response::from_string("bad request\n").with_status_code(400));
        return;
    }

    let reply = route(app, &method, &url, &body);
    debug!("{} {} -> {}", method, url, reply.status);

    let mut resp = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(ct) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        resp.add_header(ct);
    }
    if let Err(e) = rq.respond(resp) {
        warn!("{} {}: respond: {}", method, url, e);
    }
}
