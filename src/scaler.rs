//! 特徴量ごとの正規化パラメータと逆変換。
//!
//! 形式 (JSON):
//! ```json
//! {"scalers": [
//!   {"feature_key": "tracker1Posx", "min": -0.4, "max": 0.6},
//!   {"feature_key": "headPosy", "mean": 1.6, "std": 0.1},
//!   {"type": "tracker1Posz", "min": 0.5, "scale": 2.0, "data_min": -0.25, "data_max": 0.25}
//! ]}
//! ```
//! 3つ目は学習スクリプトが書き出す形式（`X_scaled = X * scale + min`）。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{ReplayError, Result};

/// 予測トラッカー位置の特徴量キー (x, y, z)
pub const TRACKER_POSITION_KEYS: [&str; 3] = ["tracker1Posx", "tracker1Posy", "tracker1Posz"];

/// 1特徴量の正規化パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scaler {
    /// `X_scaled = X * scale + min`
    OffsetScale { min: f64, scale: f64 },
    /// `X_scaled = (X - min) / (max - min)`
    MinMax { min: f64, max: f64 },
    /// `X_scaled = (X - mean) / std`
    Standard { mean: f64, std: f64 },
}

impl Scaler {
    /// パラメータの妥当性チェック
    pub fn validate(&self) -> std::result::Result<(), String> {
        let finite = |vals: &[f64]| vals.iter().all(|v| v.is_finite());
        match *self {
            Self::OffsetScale { min, scale } => {
                if !finite(&[min, scale]) || scale == 0.0 {
                    return Err(format!(
                        "scale must be finite and non-zero (min={}, scale={})",
                        min, scale
                    ));
                }
            }
            Self::MinMax { min, max } => {
                if !finite(&[min, max]) || max <= min {
                    return Err(format!(
                        "max must be greater than min (min={}, max={})",
                        min, max
                    ));
                }
            }
            Self::Standard { mean, std } => {
                if !finite(&[mean, std]) || std <= 0.0 {
                    return Err(format!(
                        "std must be positive (mean={}, std={})",
                        mean, std
                    ));
                }
            }
        }
        Ok(())
    }

    /// 正規化値 → 実値
    pub fn inverse_transform(&self, value: f64) -> f64 {
        match *self {
            Self::OffsetScale { min, scale } => (value - min) / scale,
            Self::MinMax { min, max } => value * (max - min) + min,
            Self::Standard { mean, std } => value * std + mean,
        }
    }

    /// 実値 → 正規化値
    pub fn transform(&self, value: f64) -> f64 {
        match *self {
            Self::OffsetScale { min, scale } => value * scale + min,
            Self::MinMax { min, max } => (value - min) / (max - min),
            Self::Standard { mean, std } => (value - mean) / std,
        }
    }
}

const ACCEPTED_PARAMETER_SETS: &str = "{min, max}, {mean, std} or {min, scale}";

/// JSON 上の1エントリ。data_min などの付随フィールドは読み捨てる。
#[derive(Debug, Deserialize)]
struct ScalerDescriptor {
    #[serde(alias = "type")]
    feature_key: String,
    min: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
    std: Option<f64>,
    scale: Option<f64>,
}

impl ScalerDescriptor {
    /// {min, max} / {mean, std} / {min, scale} のいずれか1組だけを受け付ける
    fn into_scaler(self) -> Result<(String, Scaler)> {
        let scaler = match (self.min, self.max, self.mean, self.std, self.scale) {
            (Some(min), Some(max), None, None, None) => Scaler::MinMax { min, max },
            (None, None, Some(mean), Some(std), None) => Scaler::Standard { mean, std },
            (Some(min), None, None, None, Some(scale)) => Scaler::OffsetScale { min, scale },
            _ => {
                return Err(ReplayError::Config(format!(
                    "scaler '{}': expected exactly one of {}",
                    self.feature_key, ACCEPTED_PARAMETER_SETS
                )))
            }
        };
        Ok((self.feature_key, scaler))
    }
}

#[derive(Debug, Deserialize)]
struct ScalerDocument {
    scalers: Vec<ScalerDescriptor>,
}

/// 特徴量キー → Scaler。ロード後は変更しない。
#[derive(Debug, Clone, Default)]
pub struct ScalerRegistry {
    scalers: HashMap<String, Scaler>,
}

impl ScalerRegistry {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let content = String::from_utf8(bytes).map_err(|e| {
            ReplayError::Config(format!("{} is not valid UTF-8: {}", path.display(), e))
        })?;
        let registry = Self::from_json(&content)?;
        info!(path = %path.display(), scalers = registry.len(), "scaler registry loaded");
        Ok(registry)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ScalerDocument = serde_json::from_str(json)
            .map_err(|e| ReplayError::Config(format!("invalid scaler document: {}", e)))?;
        let scalers = doc
            .scalers
            .into_iter()
            .map(ScalerDescriptor::into_scaler)
            .collect::<Result<Vec<_>>>()?;
        Self::from_scalers(scalers)
    }

    /// キーの重複は上書きせずエラーにする
    pub fn from_scalers<I, K>(scalers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Scaler)>,
        K: Into<String>,
    {
        let mut map = HashMap::new();
        for (key, scaler) in scalers {
            let key = key.into();
            scaler
                .validate()
                .map_err(|msg| ReplayError::Config(format!("scaler '{}': {}", key, msg)))?;
            if map.contains_key(&key) {
                return Err(ReplayError::Config(format!("duplicate feature key '{}'", key)));
            }
            map.insert(key, scaler);
        }
        Ok(Self { scalers: map })
    }

    pub fn len(&self) -> usize {
        self.scalers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scalers.is_empty()
    }

    pub fn get(&self, key: &str) -> Result<&Scaler> {
        self.scalers
            .get(key)
            .ok_or_else(|| ReplayError::UnknownFeature(key.to_string()))
    }

    pub fn inverse_transform(&self, key: &str, value: f64) -> Result<f64> {
        Ok(self.get(key)?.inverse_transform(value))
    }

    pub fn transform(&self, key: &str, value: f64) -> Result<f64> {
        Ok(self.get(key)?.transform(value))
    }

    /// 3成分をそれぞれのキーで逆変換
    pub fn inverse_position(&self, keys: &[&str; 3], value: &[f32; 3]) -> Result<[f32; 3]> {
        let mut out = [0.0; 3];
        for ((o, key), v) in out.iter_mut().zip(keys).zip(value) {
            *o = self.inverse_transform(key, *v as f64)? as f32;
        }
        Ok(out)
    }
}
