use crate::domain::selection::{Catalog, DatasetId, ModelLabel};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub artifacts: ArtifactSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub page: PageSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactSettings {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogSettings {
    #[serde(default = "default_datasets")]
    pub datasets: Vec<String>,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PageSettings {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_subtitle")]
    pub subtitle: String,
    #[serde(default = "default_footer")]
    pub footer: String,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    #[serde(default = "default_pipeline_steps")]
    pub pipeline_steps: Vec<String>,
}

fn default_bind() -> String {
    "0.0.0.0:8501".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_preview_rows() -> usize {
    5
}

fn default_datasets() -> Vec<String> {
    Catalog::default()
        .datasets()
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_models() -> Vec<String> {
    Catalog::default()
        .models()
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_title() -> String {
    "Arshyan & Moiz Data Mining Project".to_string()
}

fn default_subtitle() -> String {
    "Multi-Sector Stock Market Analysis & Prediction System".to_string()
}

fn default_footer() -> String {
    "Developed by Arshyan & Moiz | SEECS Batch '23".to_string()
}

fn default_frame_height() -> u32 {
    1000
}

fn default_pipeline_steps() -> Vec<String> {
    [
        "Cleaning: Null handling (ffill/bfill)",
        "Scaling: Volatility & RSI standardized",
        "Engineering: 50-Day MA, 7-Day Volatility",
        "Clustering: K-Means Regime Labeling",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            root: default_root(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            datasets: default_datasets(),
            models: default_models(),
        }
    }
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: default_subtitle(),
            footer: default_footer(),
            frame_height: default_frame_height(),
            pipeline_steps: default_pipeline_steps(),
        }
    }
}

impl DashboardConfig {
    pub fn catalog(&self) -> anyhow::Result<Catalog> {
        let datasets = self.catalog.datasets.iter().map(DatasetId::new).collect();
        let models = self.catalog.models.iter().map(ModelLabel::new).collect();
        Ok(Catalog::new(datasets, models)?)
    }

    fn validate(self) -> anyhow::Result<Self> {
        if self.artifacts.preview_rows == 0 {
            anyhow::bail!("artifacts.preview_rows must be at least 1");
        }
        self.catalog()?;
        Ok(self)
    }
}

/// Load `config/dashboard.{toml,yaml,json}` if present, otherwise fall back to defaults.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .build()?;

    settings.try_deserialize::<DashboardConfig>()?.validate()
}
