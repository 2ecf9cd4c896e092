use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use encounter_engine::catalog::catalog::StarCatalog;
use encounter_engine::catalog::units::{parsecs_to_ly, per_year_to_per_century};
use encounter_engine::data::write_catalog_to_file;
use encounter_engine::{StarRecord, Velocity};
use log::{info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// Distance placeholder HYG uses for stars with no reliable parallax.
const HYG_MISSING_DIST_PC: f64 = 100000.0;

/// Source rows excluded by identity rather than by table position: the Sun's
/// own row and HYG's duplicate Alpha Centauri A entry.
const EXCLUDED_IDS: &[u64] = &[0, 71455];

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

#[derive(Debug, Serialize)]
struct DatasetMetadata {
    release_tag: String,
    asset_name: String,
    asset_url: String,
    records: usize,
    skipped_rows: usize,
    generated_at_epoch: u64,
}

/// Subset of the HYG columns the engine needs; remaining columns are
/// ignored by name.
#[derive(Debug, Deserialize)]
struct HygRow {
    id: u64,
    hip: Option<u64>,
    gl: Option<String>,
    proper: Option<String>,
    /// Distance in parsecs.
    dist: f64,
    /// Equatorial Cartesian position, parsecs.
    x: f64,
    y: f64,
    z: f64,
    /// Equatorial Cartesian velocity, parsecs per year.
    vx: Option<f64>,
    vy: Option<f64>,
    vz: Option<f64>,
}

#[derive(Debug, Default)]
struct BuildStats {
    rows: usize,
    excluded_by_identity: usize,
    unbounded_distance: usize,
    missing_velocity: usize,
}

impl BuildStats {
    fn skipped(&self) -> usize {
        self.excluded_by_identity + self.unbounded_distance + self.missing_velocity
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let client = Client::builder()
        .user_agent("encounter-engine-dataset-builder/0.1")
        .build()?;

    let release = fetch_latest_release(&client)?;
    let asset = select_csv_asset(&release)?;

    info!(
        "Downloading catalog asset {} from {}",
        asset.name, asset.browser_download_url
    );

    let temp_file = download_asset(&client, &asset.browser_download_url)?;
    let (catalog, stats) = build_catalog_from_csv(temp_file.path())
        .with_context(|| "failed to build catalog from HYG CSV")?;

    let output_dir = PathBuf::from("data");
    fs::create_dir_all(&output_dir).context("failed to create data output directory")?;
    let dataset_path = output_dir.join("encounters.bin");
    write_catalog_to_file(&catalog, &dataset_path)
        .with_context(|| format!("failed to write dataset to {}", dataset_path.display()))?;

    let metadata = DatasetMetadata {
        release_tag: release.tag_name.clone(),
        asset_name: asset.name.clone(),
        asset_url: asset.browser_download_url.clone(),
        records: catalog.len(),
        skipped_rows: stats.skipped(),
        generated_at_epoch: current_epoch_seconds(),
    };

    let metadata_path = output_dir.join("encounters.meta.json");
    let metadata_json = serde_json::to_vec_pretty(&metadata)?;
    fs::write(&metadata_path, metadata_json)
        .with_context(|| format!("failed to write metadata to {}", metadata_path.display()))?;

    info!(
        "Wrote compact dataset to {} ({} records kept, {} of {} source rows skipped)",
        dataset_path.display(),
        metadata.records,
        stats.skipped(),
        stats.rows,
    );

    Ok(())
}

fn fetch_latest_release(client: &Client) -> Result<Release> {
    let url = "https://api.github.com/repos/astronexus/hyg-database/releases/latest";
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to query {url}"))?
        .error_for_status()
        .context("GitHub API returned an error status")?;
    let release: Release = response.json().context("failed to parse release payload")?;
    Ok(release)
}

fn select_csv_asset(release: &Release) -> Result<&Asset> {
    release
        .assets
        .iter()
        .find(|asset| asset.name.ends_with(".csv"))
        .ok_or_else(|| anyhow!("latest release does not contain a CSV asset"))
}

fn download_asset(client: &Client, url: &str) -> Result<NamedTempFile> {
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to download {url}"))?
        .error_for_status()
        .context("catalog download returned an error status")?;
    let mut file = NamedTempFile::new()?;
    response.copy_to(&mut file)?;
    Ok(file)
}

fn build_catalog_from_csv(path: &Path) -> Result<(StarCatalog, BuildStats)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open HYG CSV at {}", path.display()))?;

    let mut records = Vec::new();
    let mut stats = BuildStats::default();

    for row in reader.deserialize() {
        let row: HygRow = match row {
            Ok(row) => row,
            Err(err) => {
                warn!("Skipping unparseable HYG row: {err}");
                continue;
            }
        };
        stats.rows += 1;

        if EXCLUDED_IDS.contains(&row.id) {
            stats.excluded_by_identity += 1;
            continue;
        }
        if row.dist >= HYG_MISSING_DIST_PC {
            stats.unbounded_distance += 1;
            continue;
        }
        let (Some(vx), Some(vy), Some(vz)) = (row.vx, row.vy, row.vz) else {
            stats.missing_velocity += 1;
            continue;
        };

        let designation = row
            .gl
            .clone()
            .or_else(|| row.hip.map(|hip| format!("HIP {hip}")));

        records.push(StarRecord {
            id: row.id,
            proper: row.proper,
            designation,
            pos: [
                parsecs_to_ly(row.x),
                parsecs_to_ly(row.y),
                parsecs_to_ly(row.z),
            ],
            velocity: Velocity::Cartesian([
                per_year_to_per_century(parsecs_to_ly(vx)),
                per_year_to_per_century(parsecs_to_ly(vy)),
                per_year_to_per_century(parsecs_to_ly(vz)),
            ]),
        });
    }

    Ok((StarCatalog::new(records), stats))
}

fn current_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
