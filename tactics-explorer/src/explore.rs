//! Drives one dashboard session from command-line arguments

use crate::cli::Args;
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use tactics_common::config::DashboardConfig;
use tactics_common::events::{EventBus, ViewKind};
use tactics_engine::clustering::KMeans;
use tactics_engine::normalizer::{normalize_with_report, RawRow};
use tactics_engine::{AttributeRegistry, Error, StateManager};
use tracing::{debug, info, warn};

/// Read raw rows from a JSON array file
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse data file {}", path.display()))
}

/// Normalize the rows and build the state manager
pub fn load(rows: &[RawRow], config: DashboardConfig) -> StateManager {
    let registry = AttributeRegistry::tactical_profiles();
    let report = normalize_with_report(&registry, rows);
    for issue in &report.issues {
        warn!("{}", issue);
    }
    if report.dropped_rows > 0 {
        warn!("Dropped {} rows with missing or duplicate identity", report.dropped_rows);
    }
    info!(
        "Loaded {} records ({} fields nulled)",
        report.records.len(),
        report.issues.len()
    );

    let bus = Arc::new(EventBus::new(config.event_capacity));
    StateManager::new(registry, report.records, config, bus)
}

/// Apply the requested selection, in the order a user would set it up
pub fn apply(manager: &mut StateManager, args: &Args) -> Result<()> {
    if !args.leagues.is_empty() {
        manager.set_active_groups(&args.leagues)?;
    }
    if !args.attributes.is_empty() {
        manager.set_active_attributes(&args.attributes)?;
    }

    if !args.weights.is_empty() {
        for (id, value) in &args.weights {
            manager.set_weight(id, *value)?;
        }
        manager.apply_weights();
    }

    if args.k > 0 {
        manager.set_cluster_count(args.k)?;
        if manager.run_clustering(&KMeans::default())?.is_none() {
            debug!("Nothing to cluster for the current selection");
        }
    }

    for (param, value) in &args.display {
        manager.set_display_param(*param, *value)?;
    }
    for (id, range) in &args.brushes {
        manager.set_brush(id, Some(*range))?;
    }
    if let Some(search) = &args.search {
        manager.set_search_text(search);
    }
    for column in &args.sort {
        manager.sort_by(column)?;
    }
    manager.set_page(args.page);
    Ok(())
}

/// Slices keyed by surface name; empty surfaces carry their reason
pub fn render(manager: &StateManager, views: &[ViewKind]) -> Result<Value> {
    let views = if views.is_empty() { &ViewKind::ALL[..] } else { views };

    let mut out = Map::new();
    for kind in views {
        let value = match manager.view_slice(*kind) {
            Ok(slice) => serde_json::to_value(slice)?,
            Err(Error::EmptySelection(reason)) => json!({ "view": kind, "empty": reason }),
            Err(e) => return Err(e.into()),
        };
        out.insert(kind.to_string().to_lowercase(), value);
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ROWS: &str = r#"[
      {"league_name": "England Premier League", "team_name": "Arsenal",
       "buildUpPlaySpeed": 59, "defencePressure": 47, "defenceDefenderLineClass": "Cover"},
      {"league_name": "England Premier League", "team_name": "Stoke City",
       "buildUpPlaySpeed": 52, "defencePressure": 41, "defenceDefenderLineClass": "Cover"},
      {"league_name": "Spain LIGA BBVA", "team_name": "FC Barcelona",
       "buildUpPlaySpeed": 34, "defencePressure": 64, "defenceDefenderLineClass": "Offside Trap"}
    ]"#;

    fn data_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ROWS.as_bytes()).unwrap();
        file
    }

    fn run(extra: &[&str]) -> Result<Value> {
        let file = data_file();
        let path = file.path().to_string_lossy().to_string();
        let mut argv = vec!["tactics-explorer", "--data", path.as_str()];
        argv.extend_from_slice(extra);
        let args = Args::try_parse_from(argv)?;

        let rows = read_rows(&args.data)?;
        let mut manager = load(&rows, DashboardConfig::default());
        apply(&mut manager, &args)?;
        render(&manager, &args.views)
    }

    #[test]
    fn test_all_views_by_default() {
        let out = run(&[]).unwrap();
        for key in ["correlation", "plot", "table", "controls"] {
            assert!(out.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(out["table"]["total_rows"], 3);
    }

    #[test]
    fn test_weighted_sort_descending() {
        let out = run(&[
            "--attr", "buildUpPlaySpeed",
            "--weight", "buildUpPlaySpeed=1",
            "--sort", "weightedScore",
            "--sort", "weightedScore",
            "--view", "table",
        ])
        .unwrap();
        let rows = out["table"]["rows"].as_array().unwrap();
        assert_eq!(rows[0]["key"]["entity"], "Arsenal");
        assert_eq!(rows[2]["key"]["entity"], "FC Barcelona");
    }

    #[test]
    fn test_brush_and_search() {
        let out = run(&["--brush", "defencePressure=40:50", "--search", "stoke", "--view", "table"])
            .unwrap();
        assert_eq!(out["table"]["total_rows"], 1);
        assert_eq!(out["table"]["rows"][0]["key"]["entity"], "Stoke City");
    }

    #[test]
    fn test_clusters_reach_the_plot() {
        let out = run(&["--k", "2", "--view", "plot"]).unwrap();
        assert_eq!(out["plot"]["color_by_cluster"], true);
        let rows = out["plot"]["rows"].as_array().unwrap();
        assert!(rows.iter().all(|r| !r["cluster"].is_null()));
    }

    #[test]
    fn test_unknown_league_is_an_error() {
        assert!(run(&["--league", "Serie Z"]).is_err());
    }

    #[test]
    fn test_missing_data_file() {
        let args = Args::try_parse_from(["tactics-explorer", "--data", "/nonexistent/teams.json"])
            .unwrap();
        assert!(read_rows(&args.data).is_err());
    }
}
