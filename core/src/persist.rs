use crate::IndexStore;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn store(&self) -> PathBuf {
        self.root.join("store.bin")
    }
    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut f = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Persist the whole store. `store.bin` carries its own metadata header, so
/// its rename alone publishes the snapshot; `meta.json` is a human-readable
/// copy written afterwards and never consulted when loading.
pub fn save_store(paths: &IndexPaths, store: &IndexStore) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    let meta = MetaFile {
        num_docs: store.num_docs(),
        num_terms: store.num_terms(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: SNAPSHOT_VERSION,
    };
    let mut bytes = bincode::serialize(&meta)?;
    bincode::serialize_into(&mut bytes, store)?;
    write_atomic(&paths.store(), &bytes)?;
    write_atomic(&paths.meta(), serde_json::to_string_pretty(&meta)?.as_bytes())?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, "snapshot saved");
    Ok(meta)
}

/// Read the informational `meta.json`.
pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())
        .with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn load_store(paths: &IndexPaths) -> Result<IndexStore> {
    let f = File::open(paths.store())
        .with_context(|| format!("opening {}", paths.store().display()))?;
    let mut reader = BufReader::new(f);
    let meta: MetaFile = bincode::deserialize_from(&mut reader).context("reading snapshot header")?;
    if meta.version != SNAPSHOT_VERSION {
        bail!("unsupported snapshot version {} (expected {})", meta.version, SNAPSHOT_VERSION);
    }
    let store: IndexStore =
        bincode::deserialize_from(&mut reader).context("reading snapshot body")?;
    if store.num_docs() != meta.num_docs {
        bail!(
            "snapshot store holds {} docs but its header says {}",
            store.num_docs(),
            meta.num_docs
        );
    }
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, "snapshot loaded");
    Ok(store)
}
