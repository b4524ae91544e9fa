use thiserror::Error;

/// リプレイ処理のエラー
#[derive(Debug, Error)]
pub enum ReplayError {
    /// 行・ファイルの形式不正（ロード全体を中断）
    #[error("Format error: {0}")]
    Format(String),

    /// スケーラー定義・スキーマ指定の不正
    #[error("Config error: {0}")]
    Config(String),

    /// レジストリに存在しない特徴量キー
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// カーソル・シーク先が範囲外
    #[error("Index {index} out of range (len {len})")]
    Index { index: isize, len: usize },

    /// ロード完了前の操作
    #[error("Not ready: {0}")]
    NotReady(&'static str),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplayError {
    /// Format エラーに行番号を付与する。他のバリアントはそのまま。
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Self::Format(msg) => Self::Format(format!("line {}: {}", line, msg)),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplayError>;
