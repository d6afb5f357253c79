use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub map: MapConfig,
    pub scoring: ScoringConfig,
    pub heatmap: HeatmapConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// County-level boundary file (.shp or .geojson).
    pub counties: PathBuf,
    /// State-level boundary file (.shp or .geojson).
    pub states: PathBuf,
    #[serde(default = "default_state_column")]
    pub state_column: String,
    #[serde(default = "default_geoid_column")]
    pub geoid_column: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    /// Named equal-area projection, resolved by `projection::named`.
    #[serde(default = "default_projection")]
    pub projection: String,
    #[serde(default = "default_map_width")]
    pub width: u32,
    #[serde(default = "default_map_height")]
    pub height: u32,
    pub output: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    /// JSON file holding the linear model coefficients.
    pub model: PathBuf,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub pairs: Vec<PairConfig>,
    pub output: PathBuf,
}

/// One labeled data set rendered as one confusion-matrix panel.
#[derive(Debug, Deserialize, Clone)]
pub struct PairConfig {
    pub title: String,
    pub data_csv: PathBuf,
    pub label_column: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HeatmapConfig {
    pub data_csv: PathBuf,
    pub x_column: String,
    pub y_column: String,
    pub label_column: String,
    /// Label value marking the highlighted subset (defaulted loans).
    #[serde(default)]
    pub default_value: f64,
    #[serde(default = "default_fine_bins")]
    pub fine_bins: usize,
    #[serde(default = "default_coarse_bins")]
    pub coarse_bins: usize,
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    #[serde(default = "default_levels")]
    pub levels: usize,
    #[serde(default = "default_x_limits")]
    pub x_limits: [f64; 2],
    #[serde(default = "default_y_limits")]
    pub y_limits: [f64; 2],
    pub x_label: String,
    pub y_label: String,
    #[serde(default = "default_plot_width")]
    pub width: u32,
    #[serde(default = "default_plot_height")]
    pub height: u32,
    pub output: PathBuf,
}

fn default_state_column() -> String {
    "STATEFP".to_string()
}

fn default_geoid_column() -> String {
    "GEOID".to_string()
}

fn default_projection() -> String {
    "esri:102003".to_string()
}

fn default_map_width() -> u32 {
    1600
}

fn default_map_height() -> u32 {
    1000
}

fn default_threshold() -> f64 {
    0.5
}

fn default_fine_bins() -> usize {
    1000
}

fn default_coarse_bins() -> usize {
    20
}

fn default_sigma() -> f64 {
    16.0
}

fn default_levels() -> usize {
    10
}

fn default_x_limits() -> [f64; 2] {
    [2.0, 6.0]
}

fn default_y_limits() -> [f64; 2] {
    [600.0, 820.0]
}

fn default_plot_width() -> u32 {
    900
}

fn default_plot_height() -> u32 {
    700
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config_with_defaults() {
        let toml_str = r#"
            [input]
            counties = "data/cb_2018_us_county_500k.shp"
            states = "data/cb_2018_us_state_500k.shp"

            [map]
            output = "out/basemap.png"

            [scoring]
            model = "models/default_risk.json"
            output = "out/scoring.png"
            [[scoring.pairs]]
            title = "Train"
            data_csv = "data/train.csv"
            label_column = "loan_status"

            [heatmap]
            data_csv = "data/loans.csv"
            x_column = "int_rate"
            y_column = "fico"
            label_column = "loan_status"
            x_label = "Interest Rate"
            y_label = "Fico Score"
            output = "out/heatmap.png"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.input.state_column, "STATEFP");
        assert_eq!(config.map.projection, "esri:102003");
        assert_eq!(config.scoring.threshold, 0.5);
        assert_eq!(config.scoring.pairs.len(), 1);
        assert_eq!(config.heatmap.fine_bins, 1000);
        assert_eq!(config.heatmap.sigma, 16.0);
        assert_eq!(config.heatmap.x_limits, [2.0, 6.0]);
        assert_eq!(config.heatmap.y_limits, [600.0, 820.0]);
        assert_eq!(config.heatmap.default_value, 0.0);
    }
}
