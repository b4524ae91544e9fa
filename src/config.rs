use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::trajectory::{Schema, REFERENCE, REFERENCE_EXP0};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// 参照ファイルの列レイアウト
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceLayout {
    /// 部位ごとに pos + quat の 28 列
    #[default]
    Compact,
    /// Exp0 記録形式（timestamp + 部位ごとに pos, euler, quat）の 41 列
    Exp0,
}

impl ReferenceLayout {
    pub fn schema(&self) -> &'static Schema {
        match self {
            Self::Compact => &REFERENCE,
            Self::Exp0 => &REFERENCE_EXP0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    /// 記録データ（正解）のCSV
    #[serde(default = "default_reference_path")]
    pub reference_path: String,
    #[serde(default)]
    pub reference_layout: ReferenceLayout,
    /// モデル予測のCSV（省略時は参照のみ再生）
    #[serde(default)]
    pub prediction_path: Option<String>,
    /// scaler.json
    #[serde(default)]
    pub scaler_path: Option<String>,
    /// 区切り文字
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// 連続再生時のフレームレート
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// ランダムシークのシード（省略時はOS乱数）
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_reference_path() -> String { "data/reference.csv".to_string() }
fn default_delimiter() -> char { ',' }
fn default_target_fps() -> u32 { 72 }

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            reference_path: default_reference_path(),
            reference_layout: ReferenceLayout::default(),
            prediction_path: None,
            scaler_path: None,
            delimiter: default_delimiter(),
            target_fps: default_target_fps(),
            seed: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// ファイルが無ければデフォルト。読めるが不正な場合はエラー。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }
}
