use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use dac_committee_loop::cursor::CursorStore;
use dac_config::NodeConfig;
use dac_fact_store::{Fact, FactStore};
use dac_storage::StorageAdapter;
use dac_tree::EmptySubtreeTable;
use dac_types::{BatchId, Felt, LeafValue, RootSet};
use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};
use crate::storage::NodeStorage;

/// A single archive line (spec.md §4.11). Facts are content-addressed and immutable, so
/// writing the same hash twice on `load-trees` is harmless; `dump-trees` still dedups to
/// keep the archive small.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ArchiveRecord {
    Cursor { next_id: u64 },
    Root { batch_id: u64, state_root: Felt, order_root: Option<Felt> },
    Fact { hash: Felt, fact: ArchivedFact },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ArchivedFact {
    Internal { left: Felt, right: Felt },
    Leaf { hex: String },
}

impl From<Fact> for ArchivedFact {
    fn from(fact: Fact) -> Self {
        match fact {
            Fact::Internal { left, right } => ArchivedFact::Internal { left, right },
            Fact::Leaf(value) => ArchivedFact::Leaf { hex: hex::encode(value.0) },
        }
    }
}

impl ArchivedFact {
    fn into_fact(self) -> NodeResult<Fact> {
        Ok(match self {
            ArchivedFact::Internal { left, right } => Fact::Internal { left, right },
            ArchivedFact::Leaf { hex } => Fact::Leaf(LeafValue(
                hex::decode(hex).map_err(|e| NodeError::Archive(e.to_string()))?,
            )),
        })
    }
}

/// Walks every node reachable from `root` down to its leaves, writing each unseen fact to
/// `out` as it's discovered. Nodes equal to the empty-subtree constant at their height are
/// never stored as facts, so the walk stops there without an I/O call.
async fn walk<S: StorageAdapter>(
    fact_store: &FactStore<S>,
    empty_table: &EmptySubtreeTable,
    root: Felt,
    height: u32,
    seen: &mut HashSet<Felt>,
    out: &mut impl Write,
) -> NodeResult<()> {
    let mut frontier = vec![(root, height)];
    while let Some((hash, h)) = frontier.pop() {
        if hash == empty_table.at(h) || !seen.insert(hash) {
            continue;
        }
        let fact = if h == 0 {
            Fact::Leaf(fact_store.get_leaf(hash).await.map_err(|e| NodeError::Archive(e.to_string()))?)
        } else {
            let (left, right) =
                fact_store.get_node(hash, h).await.map_err(|e| NodeError::Archive(e.to_string()))?;
            frontier.push((left, h - 1));
            frontier.push((right, h - 1));
            Fact::Internal { left, right }
        };
        let record = ArchiveRecord::Fact { hash, fact: fact.into() };
        writeln!(out, "{}", serde_json::to_string(&record).map_err(|e| NodeError::Archive(e.to_string()))?)
            .map_err(|source| NodeError::Io { path: "<archive>".into(), source })?;
    }
    Ok(())
}

pub async fn dump_trees(config: &NodeConfig, storage: NodeStorage, archive_path: &Path) -> NodeResult<()> {
    let fact_store = FactStore::new(storage);
    let cursor = CursorStore::new(fact_store.storage());
    let next_id = cursor.get_next_id().await?;

    let empty_state_table = EmptySubtreeTable::new(config.profile.state_tree_height());
    let empty_order_table = config.profile.order_tree_height().map(EmptySubtreeTable::new);

    let file = File::create(archive_path)
        .map_err(|source| NodeError::Io { path: archive_path.display().to_string(), source })?;
    let mut writer = BufWriter::new(file);

    let cursor_record = ArchiveRecord::Cursor { next_id: next_id.0 };
    writeln!(writer, "{}", serde_json::to_string(&cursor_record).map_err(|e| NodeError::Archive(e.to_string()))?)
        .map_err(|source| NodeError::Io { path: archive_path.display().to_string(), source })?;

    let mut seen = HashSet::new();
    for id in 0..next_id.0 {
        let batch_id = BatchId(id);
        let Some(roots) = cursor.get_root(batch_id).await? else { continue };

        let root_record = ArchiveRecord::Root {
            batch_id: id,
            state_root: roots.state_root,
            order_root: roots.order_root,
        };
        writeln!(
            writer,
            "{}",
            serde_json::to_string(&root_record).map_err(|e| NodeError::Archive(e.to_string()))?
        )
        .map_err(|source| NodeError::Io { path: archive_path.display().to_string(), source })?;

        walk(
            &fact_store,
            &empty_state_table,
            roots.state_root,
            config.profile.state_tree_height(),
            &mut seen,
            &mut writer,
        )
        .await?;

        if let (Some(empty_order_table), Some(order_root)) = (&empty_order_table, roots.order_root) {
            let order_height = config.profile.order_tree_height().expect("order root present implies a height");
            walk(&fact_store, empty_order_table, order_root, order_height, &mut seen, &mut writer).await?;
        }
    }

    writer.flush().map_err(|source| NodeError::Io { path: archive_path.display().to_string(), source })?;
    tracing::info!(facts = seen.len(), next_id = next_id.0, "dumped trees");
    Ok(())
}

pub async fn load_trees(storage: NodeStorage, archive_path: &Path) -> NodeResult<()> {
    let fact_store = FactStore::new(storage);
    let cursor = CursorStore::new(fact_store.storage());

    let file = File::open(archive_path)
        .map_err(|source| NodeError::Io { path: archive_path.display().to_string(), source })?;
    let reader = BufReader::new(file);

    let mut batch = std::collections::HashMap::new();
    const FLUSH_AT: usize = 500;

    for line in reader.lines() {
        let line = line.map_err(|source| NodeError::Io { path: archive_path.display().to_string(), source })?;
        if line.is_empty() {
            continue;
        }
        let record: ArchiveRecord =
            serde_json::from_str(&line).map_err(|e| NodeError::Archive(e.to_string()))?;
        match record {
            ArchiveRecord::Cursor { next_id } => {
                cursor.set_next_id(BatchId(next_id)).await?;
            }
            ArchiveRecord::Root { batch_id, state_root, order_root } => {
                cursor.set_root(BatchId(batch_id), RootSet { state_root, order_root }).await?;
            }
            ArchiveRecord::Fact { hash, fact } => {
                batch.insert(hash, fact.into_fact()?);
                if batch.len() >= FLUSH_AT {
                    fact_store.put_facts(&batch).await?;
                    batch.clear();
                }
            }
        }
    }
    fact_store.put_facts(&batch).await?;
    tracing::info!("loaded trees from archive");
    Ok(())
}
