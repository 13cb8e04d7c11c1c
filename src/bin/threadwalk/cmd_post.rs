use anyhow::Result;
use std::path::PathBuf;

use ThreadWalk::config::WalkConfig;
use ThreadWalk::store::OrderedStore;

use crate::util::open_rw;

pub fn exec(path: PathBuf, comment: String, parent: Option<String>) -> Result<()> {
    let cfg = WalkConfig::from_env();
    let store = open_rw(&path, &cfg)?;
    let node = store.insert(&comment, parent.as_deref())?;
    println!("{}", serde_json::to_string(&node)?);
    Ok(())
}
