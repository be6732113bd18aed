use serde_json::Value;

use super::Cli;
use cfgsync_config::{Config, SearchPaths, Snapshot, Source, locate};
use cfgsync_core::{CfgError, Result};

pub(super) fn cmd_resolve(cli: &Cli) -> Result<()> {
    let search = SearchPaths::for_app(&cli.app);
    let source = locate(cli.config.as_deref(), cli.is_remote_config, &cli.name, &search)?;
    match &source {
        Source::Local { path } => println!("local file: {}", path.display()),
        Source::Remote(desc) => {
            println!("provider:  {}", desc.provider);
            println!("endpoint:  {}", desc.endpoint);
            println!("path:      {}", desc.path);
            println!("encoding:  {}", desc.encoding_type);
        }
    }
    Ok(())
}

pub(super) fn cmd_get(config: &Config, key: &str, json: bool) -> Result<()> {
    let value = config
        .get(key)
        .ok_or_else(|| CfgError::Other(anyhow::anyhow!("key '{key}' is not set")))?;
    println!("{}", render_value(&value, json)?);
    Ok(())
}

pub(super) fn cmd_show(config: &Config, json: bool) -> Result<()> {
    let snapshot = config.store.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.to_nested())?);
    } else {
        for line in flat_lines(&snapshot) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Strings print bare unless JSON output is requested.
pub(super) fn render_value(value: &Value, json: bool) -> Result<String> {
    match value {
        Value::String(s) if !json => Ok(s.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

/// `key = <json value>` for every merged key, in key order.
pub(super) fn flat_lines(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .values()
        .iter()
        .map(|(k, v)| format!("{k} = {v}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("localhost"), false).unwrap(), "localhost");
        assert_eq!(render_value(&json!("localhost"), true).unwrap(), "\"localhost\"");
        assert_eq!(render_value(&json!(8080), false).unwrap(), "8080");
        assert_eq!(render_value(&json!([1, 2]), false).unwrap(), "[1,2]");
    }

    #[tokio::test]
    async fn test_flat_lines_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(&path, "name = \"x\"\n[server]\nport = 80\n").unwrap();

        let store = cfgsync_config::ConfigStore::builder(Source::local(&path))
            .env_source(cfgsync_config::EnvSource::fixed(Vec::<(String, String)>::new()))
            .load()
            .await
            .unwrap();
        assert_eq!(
            flat_lines(&store.snapshot()),
            vec!["name = \"x\"".to_string(), "server.port = 80".to_string()]
        );
    }
}
