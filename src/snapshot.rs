use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::store::{HeadToHead, PairKey, PlayerAggregate, StatStore};

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk document. Pair keys are spelled out as two named fields rather
/// than any encoded tuple text, so loading never interprets stored strings.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    players: BTreeMap<String, PlayerAggregate>,
    pairs: Vec<PairEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PairEntry {
    first: String,
    second: String,
    outcomes: Vec<u8>,
    matches: u32,
}

/// Serializes the full store to `path`, atomically (tmp file + rename) and
/// with deterministic ordering.
pub fn save(store: &StatStore, path: &Path) -> Result<()> {
    let players: BTreeMap<String, PlayerAggregate> = store
        .iter_players()
        .map(|(name, agg)| (name.clone(), agg.clone()))
        .collect();

    let mut pairs: Vec<PairEntry> = store
        .iter_pairs()
        .map(|(key, h2h)| PairEntry {
            first: key.first.clone(),
            second: key.second.clone(),
            outcomes: h2h.outcomes.clone(),
            matches: h2h.matches,
        })
        .collect();
    pairs.sort_by(|a, b| (&a.first, &a.second).cmp(&(&b.first, &b.second)));

    let doc = SnapshotFile {
        version: SNAPSHOT_VERSION,
        players,
        pairs,
    };

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).with_context(|| format!("create snapshot dir {}", dir.display()))?;
    }

    let json = serde_json::to_string(&doc).context("serialize snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write snapshot tmp {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("publish snapshot {}", path.display()))?;
    Ok(())
}

/// Loads a snapshot written by `save`. Fails loudly — missing file, bad
/// JSON, wrong version or dangling pair references all abort with a message
/// naming the file; no partially-loaded store is ever returned.
pub fn load(path: &Path) -> Result<StatStore> {
    if !path.exists() {
        bail!(
            "snapshot not found at {} (run the preprocess step first)",
            path.display()
        );
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read snapshot {}", path.display()))?;
    let doc: SnapshotFile = serde_json::from_str(&raw)
        .with_context(|| format!("snapshot {} is corrupt", path.display()))?;
    if doc.version != SNAPSHOT_VERSION {
        bail!(
            "snapshot {} has version {} but this build expects {}",
            path.display(),
            doc.version,
            SNAPSHOT_VERSION
        );
    }

    let players: HashMap<String, PlayerAggregate> = doc.players.into_iter().collect();
    let mut pairs: HashMap<PairKey, HeadToHead> = HashMap::with_capacity(doc.pairs.len());
    for entry in doc.pairs {
        if !players.contains_key(&entry.first) || !players.contains_key(&entry.second) {
            bail!(
                "snapshot {} is corrupt: pair ({}, {}) references an unregistered player",
                path.display(),
                entry.first,
                entry.second
            );
        }
        pairs.insert(
            PairKey::new(&entry.first, &entry.second),
            HeadToHead {
                outcomes: entry.outcomes,
                matches: entry.matches,
            },
        );
    }

    Ok(StatStore::from_parts(players, pairs))
}
