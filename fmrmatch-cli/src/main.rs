use clap::Parser;
use fmrmatch::{
    ComparatorParams, GalleryRecord, GallerySearch, MatchReport, RankedCandidate, SearchConfig,
    SearchError, Threshold,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "fmrmatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ComparatorJson {
    position_tolerance: f32,
    position_cutoff: f32,
    angle_tolerance_deg: f32,
    angle_cutoff_deg: f32,
    unknown_type_weight: f32,
    type_mismatch_weight: f32,
    max_rotation_deg: f32,
}

impl Default for ComparatorJson {
    fn default() -> Self {
        let cfg = ComparatorParams::default();
        Self {
            position_tolerance: cfg.position_tolerance,
            position_cutoff: cfg.position_cutoff,
            angle_tolerance_deg: cfg.angle_tolerance_deg,
            angle_cutoff_deg: cfg.angle_cutoff_deg,
            unknown_type_weight: cfg.unknown_type_weight,
            type_mismatch_weight: cfg.type_mismatch_weight,
            max_rotation_deg: cfg.max_rotation_deg,
        }
    }
}

impl From<ComparatorJson> for ComparatorParams {
    fn from(value: ComparatorJson) -> Self {
        Self {
            position_tolerance: value.position_tolerance,
            position_cutoff: value.position_cutoff,
            angle_tolerance_deg: value.angle_tolerance_deg,
            angle_cutoff_deg: value.angle_cutoff_deg,
            unknown_type_weight: value.unknown_type_weight,
            type_mismatch_weight: value.type_mismatch_weight,
            max_rotation_deg: value.max_rotation_deg,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SearchJson {
    threshold: i64,
    position_aware: bool,
    max_gallery_size: usize,
    parallel: bool,
}

impl Default for SearchJson {
    fn default() -> Self {
        let cfg = SearchConfig::default();
        Self {
            threshold: cfg.threshold.value() as i64,
            position_aware: cfg.position_aware,
            max_gallery_size: cfg.max_gallery_size,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    probe: Option<String>,
    probe_path: Option<String>,
    gallery_path: String,
    output_path: Option<String>,
    topk: usize,
    search: SearchJson,
    comparator: ComparatorJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe: None,
            probe_path: None,
            gallery_path: String::new(),
            output_path: None,
            topk: 1,
            search: SearchJson::default(),
            comparator: ComparatorJson::default(),
        }
    }
}

/// One enrolled person as stored in the gallery file. Fields other than
/// `id` and `fingerprint` are passed through to the output untouched.
#[derive(Debug)]
struct GalleryEntry {
    /// Position in the gallery file, counting skipped elements.
    position: usize,
    id: Option<Value>,
    fingerprint: String,
    extra: Map<String, Value>,
    key: String,
}

impl GalleryEntry {
    /// Accepts objects carrying a string `fingerprint`.
    fn from_value(position: usize, value: Value) -> Option<Self> {
        let Value::Object(mut extra) = value else {
            return None;
        };
        let fingerprint = match extra.remove("fingerprint") {
            Some(Value::String(fingerprint)) => fingerprint,
            _ => return None,
        };
        let id = extra.remove("id");
        let key = identity_key(id.as_ref(), position);
        Some(Self {
            position,
            id,
            fingerprint,
            extra,
            key,
        })
    }
}

/// String ids are used as-is, numeric ids become `id_<n>` with the integer
/// part of the number, anything else falls back to `template_<position>`.
fn identity_key(id: Option<&Value>, position: usize) -> String {
    match id {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => {
            let n = id
                .as_i64()
                .unwrap_or_else(|| id.as_f64().unwrap_or_default() as i64);
            format!("id_{n}")
        }
        _ => format!("template_{position}"),
    }
}

/// Parses the gallery file, returning the usable entries and how many
/// elements were skipped for lacking a string `fingerprint`.
fn parse_gallery(text: &str) -> Result<(Vec<GalleryEntry>, usize), serde_json::Error> {
    let values: Vec<Value> = serde_json::from_str(text)?;
    let total = values.len();
    let entries: Vec<GalleryEntry> = values
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| {
            let entry = GalleryEntry::from_value(position, value);
            if entry.is_none() {
                tracing::warn!(position, "gallery element skipped: no string fingerprint");
            }
            entry
        })
        .collect();
    let skipped = total - entries.len();
    Ok((entries, skipped))
}

impl GalleryRecord for GalleryEntry {
    fn identity_key(&self) -> &str {
        &self.key
    }

    fn encoded_template(&self) -> &str {
        &self.fingerprint
    }
}

#[derive(Debug, Serialize)]
struct RecordOut<'a> {
    key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a Value>,
    fingerprint: &'a str,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl<'a> From<&'a GalleryEntry> for RecordOut<'a> {
    fn from(value: &'a GalleryEntry) -> Self {
        Self {
            key: &value.key,
            id: value.id.as_ref(),
            fingerprint: &value.fingerprint,
            extra: &value.extra,
        }
    }
}

#[derive(Debug, Serialize)]
struct RankedOut<'a> {
    index: usize,
    key: &'a str,
    score: u8,
    is_match: bool,
}

impl<'a> From<RankedCandidate<'a, GalleryEntry>> for RankedOut<'a> {
    fn from(value: RankedCandidate<'a, GalleryEntry>) -> Self {
        Self {
            index: value.record.position,
            key: value.key,
            score: value.score,
            is_match: value.is_match,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output<'a> {
    is_match: bool,
    score: u8,
    percentage: f32,
    threshold: u8,
    band: &'static str,
    best_key: Option<&'a str>,
    best_index: Option<usize>,
    matched_pairs: usize,
    matched_record: Option<RecordOut<'a>>,
    loaded_templates: usize,
    skipped_templates: usize,
    elapsed_ms: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    topk: Vec<RankedOut<'a>>,
}

impl<'a> Output<'a> {
    fn new(
        report: &MatchReport<'a, GalleryEntry>,
        malformed: usize,
        topk: Vec<RankedOut<'a>>,
    ) -> Self {
        Self {
            is_match: report.is_match,
            score: report.score,
            percentage: report.percentage,
            threshold: report.threshold.value(),
            band: report.band.as_str(),
            best_key: report.best_key(),
            best_index: report.best.map(|b| b.record.position),
            matched_pairs: report.best.map_or(0, |b| b.matched_pairs),
            matched_record: report.matched().map(RecordOut::from),
            loaded_templates: report.loaded_templates,
            skipped_templates: report.skipped_templates + malformed,
            elapsed_ms: report.elapsed.as_secs_f64() * 1000.0,
            topk,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("fmrmatch=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.gallery_path.is_empty() {
        return Err("gallery_path must be set in the config".into());
    }
    if config.topk == 0 {
        return Err("topk must be at least 1".into());
    }

    let probe = match (config.probe, config.probe_path) {
        (Some(probe), _) => probe,
        (None, Some(path)) => fs::read_to_string(path)?,
        (None, None) => return Err("probe or probe_path must be set in the config".into()),
    };

    let gallery_text = fs::read_to_string(&config.gallery_path)?;
    let (gallery, malformed) = parse_gallery(&gallery_text)?;

    let search = GallerySearch::new(SearchConfig {
        threshold: Threshold::try_from(config.search.threshold)?,
        position_aware: config.search.position_aware,
        max_gallery_size: config.search.max_gallery_size,
        parallel: config.search.parallel,
        comparator: config.comparator.into(),
    })?;

    let searched = if config.topk > 1 {
        search
            .search_ranked(&probe, &gallery, config.topk)
            .map(|(report, ranked)| {
                let topk = ranked.into_iter().map(RankedOut::from).collect::<Vec<_>>();
                (report, topk)
            })
    } else {
        search.search(&probe, &gallery).map(|report| (report, Vec::new()))
    };
    let (report, topk) = match searched {
        Err(SearchError::NoUsableTemplates { skipped }) => {
            return Err(SearchError::NoUsableTemplates {
                skipped: skipped + malformed,
            }
            .into())
        }
        other => other?,
    };

    let output = Output::new(&report, malformed, topk);
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
