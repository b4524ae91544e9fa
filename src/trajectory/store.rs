use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ReplayError, Result};

use super::row::{data_rows, split_row};
use super::schema::{decode, Frame, Schema};

/// 1ストリーム分のフレーム列。ロード後は読み取り専用。
#[derive(Debug, Clone)]
pub struct Trajectory<F> {
    frames: Vec<F>,
    schema_name: &'static str,
}

impl<F: Frame> Trajectory<F> {
    /// ファイルから読み込む
    pub fn load<P: AsRef<Path>>(path: P, schema: &Schema, delimiter: char) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let content = String::from_utf8(bytes).map_err(|e| {
            ReplayError::Format(format!("{} is not valid UTF-8: {}", path.display(), e))
        })?;
        let trajectory = Self::parse(&content, schema, delimiter)?;
        info!(
            path = %path.display(),
            schema = schema.name,
            frames = trajectory.len(),
            "trajectory loaded"
        );
        Ok(trajectory)
    }

    /// テキスト全体をデコードする。
    ///
    /// 1行でも不正なら全体が失敗し、途中までのフレームは返さない。
    pub fn parse(text: &str, schema: &Schema, delimiter: char) -> Result<Self> {
        schema.check_for::<F>()?;

        let frames = data_rows(text)
            .map(|(line, row)| {
                decode(&split_row(row, delimiter), schema).map_err(|e| e.at_line(line))
            })
            .collect::<Result<Vec<F>>>()?;

        Ok(Self {
            frames,
            schema_name: schema.name,
        })
    }
}

impl<F> Trajectory<F> {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    /// 範囲外なら Index エラー
    pub fn frame_at(&self, index: usize) -> Result<&F> {
        self.frames.get(index).ok_or(ReplayError::Index {
            index: index as isize,
            len: self.frames.len(),
        })
    }
}
