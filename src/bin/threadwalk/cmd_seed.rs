use anyhow::Result;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

use ThreadWalk::config::WalkConfig;
use ThreadWalk::store::{JournalStore, OrderedStore};

use crate::util::open_rw;

pub fn exec(path: PathBuf, roots: u32, fanout: u32, depth: u32, seed: u64) -> Result<()> {
    let cfg = WalkConfig::from_env();
    let store = open_rw(&path, &cfg)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut written: u64 = 0;

    for r in 0..roots {
        let root = store.insert(&format!("root #{}", r), None)?;
        written += 1;
        written += grow(&store, &mut rng, &root.id, &format!("{}", r), fanout, depth)?;
    }

    info!(
        "seeded {} nodes ({} roots, fanout<={}, depth<={}, seed={})",
        written, roots, fanout, depth, seed
    );
    println!("seeded {} nodes into {}", written, path.display());
    Ok(())
}

fn grow(
    store: &JournalStore,
    rng: &mut StdRng,
    parent: &str,
    label: &str,
    fanout: u32,
    depth: u32,
) -> Result<u64> {
    if depth == 0 {
        return Ok(0);
    }
    let mut written = 0;
    let kids = rng.gen_range(0..=fanout);
    for k in 0..kids {
        let label = format!("{}.{}", label, k);
        let node = store.insert(&format!("reply {}", label), Some(parent))?;
        written += 1;
        written += grow(store, rng, &node.id, &label, fanout, depth - 1)?;
    }
    Ok(written)
}
