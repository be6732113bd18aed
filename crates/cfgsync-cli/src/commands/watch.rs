use std::collections::BTreeSet;
use tracing::info;

use cfgsync_config::{Config, Snapshot};
use cfgsync_core::Result;

pub(super) async fn cmd_watch(config: Config) -> Result<()> {
    let mut changes = config.store.changes();
    let mut previous = config.store.snapshot();
    println!(
        "watching {} ({} keys, generation {})",
        previous.origin(),
        previous.len(),
        previous.generation()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupt received, stopping watcher");
                break;
            }
            res = changes.changed() => {
                if res.is_err() {
                    break;
                }
                let current = config.store.snapshot();
                println!("generation {}:", current.generation());
                let lines = diff(&previous, &current);
                if lines.is_empty() {
                    println!("  (no changes)");
                }
                for line in lines {
                    println!("  {line}");
                }
                previous = current;
            }
        }
    }

    config.shutdown().await;
    Ok(())
}

/// Per-key differences between two snapshots: `+` added, `-` removed, `~` changed.
pub(super) fn diff(old: &Snapshot, new: &Snapshot) -> Vec<String> {
    let keys: BTreeSet<&str> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter_map(|key| match (old.values().get(key), new.values().get(key)) {
            (None, Some(v)) => Some(format!("+ {key} = {v}")),
            (Some(_), None) => Some(format!("- {key}")),
            (Some(a), Some(b)) if a != b => Some(format!("~ {key}: {a} -> {b}")),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgsync_config::{ConfigStore, EnvSource, Source};

    #[tokio::test]
    async fn test_diff_reports_added_removed_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.yaml");
        std::fs::write(&path, "a: 1\nb: keep\nc: gone\n").unwrap();

        let store = ConfigStore::builder(Source::local(&path))
            .env_source(EnvSource::fixed(Vec::<(String, String)>::new()))
            .load()
            .await
            .unwrap();
        let old = store.snapshot();

        std::fs::write(&path, "a: 2\nb: keep\nd: true\n").unwrap();
        let new = store.reload().await.unwrap();

        assert_eq!(
            diff(&old, &new),
            vec![
                "~ a: 1 -> 2".to_string(),
                "- c".to_string(),
                "+ d = true".to_string(),
            ]
        );
        assert!(diff(&new, &new).is_empty());
    }
}
