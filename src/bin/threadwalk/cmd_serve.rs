use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use ThreadWalk::config::ConfigBuilder;
use ThreadWalk::http::{serve, App};
use ThreadWalk::store::OrderedStore;

use crate::util::open_rw;

pub fn exec(path: PathBuf, addr: String, workers: Option<usize>) -> Result<()> {
    let mut b = ConfigBuilder::new();
    if let Some(n) = workers {
        b = b.http_workers(n);
    }
    let cfg = b.build();

    let store: Arc<dyn OrderedStore> = Arc::new(open_rw(&path, &cfg)?);
    let app = Arc::new(App::new(store, cfg));
    serve(&addr, app)
}
