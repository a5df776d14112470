//! Command-line arguments for tactics-explorer

use clap::Parser;
use std::path::PathBuf;
use tactics_common::events::ViewKind;
use tactics_engine::selection::DisplayParam;

/// Command-line arguments for tactics-explorer
#[derive(Parser, Debug)]
#[command(name = "tactics-explorer")]
#[command(about = "Explore team tactical profiles: correlations, weighted scores and clusters")]
#[command(version)]
pub struct Args {
    /// JSON file holding an array of raw team rows
    #[arg(short, long, env = "TACTICS_DATA")]
    pub data: PathBuf,

    /// Config file (overrides TACTICS_CONFIG and the platform default)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Restrict to these leagues (repeatable, default: all)
    #[arg(short, long = "league", value_name = "NAME")]
    pub leagues: Vec<String>,

    /// Restrict to these attribute ids (repeatable, default: all)
    #[arg(short, long = "attr", value_name = "ID")]
    pub attributes: Vec<String>,

    /// Attribute weight, applied before scoring (repeatable)
    #[arg(short, long = "weight", value_name = "ID=VALUE", value_parser = parse_weight)]
    pub weights: Vec<(String, f64)>,

    /// Number of clusters (0 disables clustering)
    #[arg(short, long, default_value = "0")]
    pub k: usize,

    /// Axis brush as an inclusive range (repeatable)
    #[arg(short, long = "brush", value_name = "ID=LO:HI", value_parser = parse_brush)]
    pub brushes: Vec<(String, (f64, f64))>,

    /// Case-insensitive table search
    #[arg(short, long)]
    pub search: Option<String>,

    /// Table header click; repeat a column to flip it to descending
    #[arg(long = "sort", value_name = "COLUMN")]
    pub sort: Vec<String>,

    /// Table page (1-based, clamped)
    #[arg(short, long, default_value = "1")]
    pub page: usize,

    /// Plot display parameter (repeatable)
    #[arg(long = "display", value_name = "PARAM=VALUE", value_parser = parse_display)]
    pub display: Vec<(DisplayParam, f64)>,

    /// Surfaces to print (repeatable, default: all)
    #[arg(long = "view", value_name = "VIEW", value_parser = parse_view)]
    pub views: Vec<ViewKind>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

fn split_assignment(s: &str) -> Result<(&str, &str), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    Ok((key, value.trim()))
}

fn parse_number(s: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", s))
        .and_then(|v| {
            if v.is_finite() {
                Ok(v)
            } else {
                Err(format!("'{}' is not finite", s))
            }
        })
}

/// Parse `id=value`
pub fn parse_weight(s: &str) -> Result<(String, f64), String> {
    let (id, value) = split_assignment(s)?;
    Ok((id.to_string(), parse_number(value)?))
}

/// Parse `id=lo:hi`
pub fn parse_brush(s: &str) -> Result<(String, (f64, f64)), String> {
    let (id, range) = split_assignment(s)?;
    let (lo, hi) = range
        .split_once(':')
        .ok_or_else(|| format!("expected LO:HI, got '{}'", range))?;
    Ok((id.to_string(), (parse_number(lo.trim())?, parse_number(hi.trim())?)))
}

/// Parse `param=value`
pub fn parse_display(s: &str) -> Result<(DisplayParam, f64), String> {
    let (param, value) = split_assignment(s)?;
    let param = param.parse::<DisplayParam>().map_err(|e| e.to_string())?;
    Ok((param, parse_number(value)?))
}

/// Parse a surface name
pub fn parse_view(s: &str) -> Result<ViewKind, String> {
    ViewKind::ALL
        .into_iter()
        .find(|kind| kind.to_string().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown view '{}' (correlation, plot, table, controls)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weight() {
        assert_eq!(
            parse_weight("buildUpPlaySpeed=1.5").unwrap(),
            ("buildUpPlaySpeed".to_string(), 1.5)
        );
        assert!(parse_weight("buildUpPlaySpeed").is_err());
        assert!(parse_weight("=1").is_err());
        assert!(parse_weight("a=fast").is_err());
        assert!(parse_weight("a=NaN").is_err());
    }

    #[test]
    fn test_parse_brush() {
        assert_eq!(
            parse_brush("defencePressure = 40:55").unwrap(),
            ("defencePressure".to_string(), (40.0, 55.0))
        );
        // Reversed bounds are left to the engine to normalize
        assert_eq!(parse_brush("a=5:1").unwrap().1, (5.0, 1.0));
        assert!(parse_brush("a=5").is_err());
        assert!(parse_brush("a=x:1").is_err());
    }

    #[test]
    fn test_parse_display() {
        assert_eq!(
            parse_display("Opacity=0.4").unwrap(),
            (DisplayParam::Opacity, 0.4)
        );
        assert!(parse_display("glow=1").is_err());
    }

    #[test]
    fn test_parse_view() {
        assert_eq!(parse_view("table").unwrap(), ViewKind::Table);
        assert_eq!(parse_view("Correlation").unwrap(), ViewKind::Correlation);
        assert!(parse_view("map").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "tactics-explorer",
            "--data",
            "teams.json",
            "--league",
            "Spain LIGA BBVA",
            "--weight",
            "defencePressure=2",
            "--sort",
            "weightedScore",
            "--sort",
            "weightedScore",
            "--view",
            "table",
        ])
        .unwrap();
        assert_eq!(args.leagues, vec!["Spain LIGA BBVA".to_string()]);
        assert_eq!(args.weights, vec![("defencePressure".to_string(), 2.0)]);
        assert_eq!(args.sort.len(), 2);
        assert_eq!(args.k, 0);
        assert_eq!(args.page, 1);
        assert_eq!(args.views, vec![ViewKind::Table]);
    }
}
