use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::data::anomaly::{engine_channels, POWERCARS};
use crate::data::model::{ReadingTable, SPEED};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "rail-dash.toml";

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// TOML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Which dashboard to show.
    #[arg(long, value_enum)]
    pub variant: Option<Variant>,

    /// Override the data file.
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    pub debug: bool,
}

/// The three dashboards sharing one data layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// PC1 / PC2 charts, outside temperature and a position map.
    #[default]
    Basic,
    /// Per-powercar engine charts with anomaly markers and a red/blue map.
    Anomaly,
    /// Vehicle detail page plus a fleet map filtered by province.
    Fleet,
}

impl Variant {
    pub fn default_data_path(self) -> &'static str {
        match self {
            Variant::Basic => "veh182.csv",
            Variant::Anomaly => "veh182_anomalies.csv",
            Variant::Fleet => "fleet_anomalies.csv",
        }
    }

    /// Whether the variant has a `/map` page.
    pub fn has_router(self) -> bool {
        self == Variant::Fleet
    }

    pub fn default_groups(self) -> Vec<ChannelGroup> {
        match self {
            Variant::Basic => POWERCARS
                .iter()
                .map(|pc| ChannelGroup {
                    title: pc.to_string(),
                    channels: Vec::new(),
                    matching: Some(pc.to_string()),
                    highlight_anomalies: false,
                })
                .collect(),
            Variant::Anomaly | Variant::Fleet => POWERCARS
                .iter()
                .map(|pc| {
                    let mut channels = engine_channels(pc);
                    channels.push(SPEED.to_string());
                    ChannelGroup {
                        title: pc.to_string(),
                        channels,
                        matching: None,
                        highlight_anomalies: true,
                    }
                })
                .collect(),
        }
    }
}

/// One line chart: a set of channels drawn against time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelGroup {
    pub title: String,
    #[serde(default)]
    pub channels: Vec<String>,
    /// Take every numeric column whose name contains this text instead.
    #[serde(default)]
    pub matching: Option<String>,
    #[serde(default)]
    pub highlight_anomalies: bool,
}

impl ChannelGroup {
    /// Concrete channel list against a loaded table.
    pub fn resolve(&self, table: &ReadingTable) -> Vec<String> {
        match &self.matching {
            Some(needle) if self.channels.is_empty() => table.channels_matching(needle),
            _ => self.channels.clone(),
        }
    }
}

/// How to read the source file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
    pub delimiter: char,
    pub vehicle_column: String,
    pub timestamp_column: String,
    pub province_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: ';',
            vehicle_column: "mapped_veh_id".into(),
            timestamp_column: "timestamps_UTC".into(),
            province_column: "province".into(),
        }
    }
}

impl DataConfig {
    /// The delimiter as a byte; non-ASCII delimiters fall back to `;`.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .unwrap_or(b';')
    }
}

/// Contents of the TOML file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub variant: Option<Variant>,
    pub data: DataConfig,
    pub groups: Option<Vec<ChannelGroup>>,
}

pub fn load(path: &Path) -> Result<FileConfig> {
    let data = fs::read_to_string(path).context("Failed to read config")?;
    parse(&data)
}

fn parse(data: &str) -> Result<FileConfig> {
    let config = toml::from_str(data).context("Failed to parse config")?;
    Ok(config)
}

/// Fully resolved settings: CLI over file over per-variant defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub variant: Variant,
    pub data_path: PathBuf,
    pub data: DataConfig,
    pub groups: Vec<ChannelGroup>,
    pub debug: bool,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match cli.config.as_deref() {
            Some(path) => load(path)?,
            None if Path::new(DEFAULT_CONFIG).exists() => load(Path::new(DEFAULT_CONFIG))?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    fn merge(cli: &Cli, file: FileConfig) -> Self {
        let variant = cli.variant.or(file.variant).unwrap_or_default();
        let data_path = cli
            .data
            .clone()
            .or_else(|| file.data.path.clone())
            .unwrap_or_else(|| PathBuf::from(variant.default_data_path()));
        let groups = file.groups.unwrap_or_else(|| variant.default_groups());
        Settings {
            variant,
            data_path,
            data: file.data,
            groups,
            debug: cli.debug,
        }
    }
}
