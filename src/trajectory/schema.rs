use crate::error::{ReplayError, Result};
use crate::pose::{Joint, Pose};

/// フィールドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 位置 (x, y, z)
    Position,
    /// 回転クォータニオン (x, y, z, w)
    Orientation,
}

impl FieldKind {
    pub fn arity(&self) -> usize {
        match self {
            Self::Position => 3,
            Self::Orientation => 4,
        }
    }
}

/// 1フィールドの列割り当て
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub joint: Joint,
    pub kind: FieldKind,
    /// 先頭列のインデックス
    pub offset: usize,
}

const fn pos(joint: Joint, offset: usize) -> FieldSpec {
    FieldSpec { joint, kind: FieldKind::Position, offset }
}

const fn rot(joint: Joint, offset: usize) -> FieldSpec {
    FieldSpec { joint, kind: FieldKind::Orientation, offset }
}

/// 位置ベースの行スキーマ。列名による参照はしない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    /// 1行に必要な列数
    pub columns: usize,
    pub fields: &'static [FieldSpec],
}

/// 参照ストリーム（コンパクト形式）: 部位ごとに pos xyz + quat xyzw
pub const REFERENCE: Schema = Schema {
    name: "reference",
    columns: 28,
    fields: &[
        pos(Joint::Head, 0),
        rot(Joint::Head, 3),
        pos(Joint::RightHand, 7),
        rot(Joint::RightHand, 10),
        pos(Joint::LeftHand, 14),
        rot(Joint::LeftHand, 17),
        pos(Joint::Tracker, 21),
        rot(Joint::Tracker, 24),
    ],
};

/// Exp0 記録形式: timestamp, 以降部位ごとに pos xyz, euler xyz, quat xyzw。
/// timestamp とオイラー角の列は読まない。
pub const REFERENCE_EXP0: Schema = Schema {
    name: "reference_exp0",
    columns: 41,
    fields: &[
        pos(Joint::Head, 1),
        rot(Joint::Head, 7),
        pos(Joint::RightHand, 11),
        rot(Joint::RightHand, 17),
        pos(Joint::LeftHand, 21),
        rot(Joint::LeftHand, 27),
        pos(Joint::Tracker, 31),
        rot(Joint::Tracker, 37),
    ],
};

/// 予測ストリーム: トラッカーの pos xyz + quat xyzw（正規化空間）
pub const PREDICTION: Schema = Schema {
    name: "prediction",
    columns: 7,
    fields: &[pos(Joint::Tracker, 0), rot(Joint::Tracker, 3)],
};

impl Schema {
    /// 指定部位の位置と回転を両方持つか
    pub fn provides(&self, joint: Joint) -> bool {
        let has = |kind: FieldKind| self.fields.iter().any(|f| f.joint == joint && f.kind == kind);
        has(FieldKind::Position) && has(FieldKind::Orientation)
    }

    /// フレーム型が要求する部位をすべて持つか検証
    pub fn check_for<F: Frame>(&self) -> Result<()> {
        match F::JOINTS.iter().find(|j| !self.provides(**j)) {
            Some(missing) => Err(ReplayError::Config(format!(
                "schema '{}' has no {} pose",
                self.name,
                missing.name()
            ))),
            None => Ok(()),
        }
    }
}

/// デコード済みの部位ごとのポーズ
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseSet {
    poses: [Option<Pose>; Joint::COUNT],
}

impl PoseSet {
    pub fn get(&self, joint: Joint) -> Option<Pose> {
        self.poses[joint as usize]
    }
}

/// 1行から組み立てられるフレーム型
pub trait Frame: Sized {
    /// 必須部位
    const JOINTS: &'static [Joint];

    /// 必須部位が揃っていなければ None
    fn from_poses(poses: &PoseSet) -> Option<Self>;
}

fn parse_value(token: &str, column: usize) -> Result<f32> {
    let value: f32 = token.parse().map_err(|_| {
        ReplayError::Format(format!("column {}: '{}' is not a number", column, token))
    })?;
    if !value.is_finite() {
        return Err(ReplayError::Format(format!(
            "column {}: '{}' is not finite",
            column, token
        )));
    }
    Ok(value)
}

fn parse_group<const N: usize>(tokens: &[&str], offset: usize) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for (i, v) in out.iter_mut().enumerate() {
        *v = parse_value(tokens[offset + i], offset + i)?;
    }
    Ok(out)
}

/// トークン列をスキーマに従って部位ごとのポーズに変換する。
///
/// 列数がスキーマと一致しない、数値変換できない、回転が長さ0 の場合は Format エラー。
pub fn decode_poses(tokens: &[&str], schema: &Schema) -> Result<PoseSet> {
    if tokens.len() != schema.columns {
        return Err(ReplayError::Format(format!(
            "expected {} columns for '{}', got {}",
            schema.columns,
            schema.name,
            tokens.len()
        )));
    }

    let mut positions: [Option<[f32; 3]>; Joint::COUNT] = [None; Joint::COUNT];
    let mut rotations: [Option<[f32; 4]>; Joint::COUNT] = [None; Joint::COUNT];
    for field in schema.fields {
        let slot = field.joint as usize;
        match field.kind {
            FieldKind::Position => positions[slot] = Some(parse_group(tokens, field.offset)?),
            FieldKind::Orientation => rotations[slot] = Some(parse_group(tokens, field.offset)?),
        }
    }

    let mut set = PoseSet::default();
    for joint in Joint::ALL {
        let slot = joint as usize;
        if let (Some(position), Some(rotation)) = (positions[slot], rotations[slot]) {
            let pose = Pose::normalized(position, rotation).ok_or_else(|| {
                ReplayError::Format(format!("{} rotation is not a valid quaternion", joint.name()))
            })?;
            set.poses[slot] = Some(pose);
        }
    }
    Ok(set)
}

/// トークン列を型付きフレームに変換する。
pub fn decode<F: Frame>(tokens: &[&str], schema: &Schema) -> Result<F> {
    let poses = decode_poses(tokens, schema)?;
    F::from_poses(&poses).ok_or_else(|| {
        ReplayError::Config(format!("schema '{}' does not provide the required poses", schema.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::frame::{PredictionFrame, ReferenceFrame};
    use crate::trajectory::row::split_row;

    const ROW: &str = "1,0,0,0,0,0,1, 2,0,0,0,0,0,1, 3,0,0,0,0,0,1, 0,1,0,0,0,0,1";

    #[test]
    fn test_reference_scenario() {
        let tokens = split_row(ROW, ',');
        let frame: ReferenceFrame = decode(&tokens, &REFERENCE).unwrap();
        assert_eq!(frame.head.position, [1.0, 0.0, 0.0]);
        assert_eq!(frame.head.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(frame.right_hand.position, [2.0, 0.0, 0.0]);
        assert_eq!(frame.left_hand.position, [3.0, 0.0, 0.0]);
        assert_eq!(frame.tracker.position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_prediction_decode() {
        let tokens = split_row("0.1, 0.2, 0.3, 0, 0, 0, 1", ',');
        let frame: PredictionFrame = decode(&tokens, &PREDICTION).unwrap();
        assert_eq!(frame.tracker.position, [0.1, 0.2, 0.3]);
        assert_eq!(frame.tracker.rotation, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_exp0_skips_timestamp_and_euler() {
        // timestamp + 部位ごとに pos(3) euler(3) quat(4)
        let mut cols = vec!["12.5".to_string()];
        for j in 0..4 {
            let p = (j + 1) as f32;
            cols.extend([p, p, p].iter().map(|v| v.to_string()));
            cols.extend(["90", "180", "270"].iter().map(|v| v.to_string()));
            cols.extend(["0", "0", "0", "1"].iter().map(|v| v.to_string()));
        }
        let tokens: Vec<&str> = cols.iter().map(String::as_str).collect();
        let frame: ReferenceFrame = decode(&tokens, &REFERENCE_EXP0).unwrap();
        assert_eq!(frame.head.position, [1.0, 1.0, 1.0]);
        assert_eq!(frame.tracker.position, [4.0, 4.0, 4.0]);
        assert_eq!(frame.tracker.rotation, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_column_count_mismatch() {
        let tokens = split_row("0,0,0,0,0,1", ',');
        let err = decode::<PredictionFrame>(&tokens, &PREDICTION).unwrap_err();
        assert!(matches!(err, ReplayError::Format(_)));

        let tokens = split_row("0,0,0,0,0,0,1,9", ',');
        let err = decode::<PredictionFrame>(&tokens, &PREDICTION).unwrap_err();
        assert!(matches!(err, ReplayError::Format(_)));
    }

    #[test]
    fn test_non_numeric_token() {
        let tokens = split_row("0,abc,0,0,0,0,1", ',');
        let err = decode::<PredictionFrame>(&tokens, &PREDICTION).unwrap_err();
        match err {
            ReplayError::Format(msg) => assert!(msg.contains("column 1"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_token() {
        let tokens = split_row("0,NaN,0,0,0,0,1", ',');
        assert!(decode::<PredictionFrame>(&tokens, &PREDICTION).is_err());
    }

    #[test]
    fn test_zero_quaternion_rejected() {
        let tokens = split_row("0,0,0,0,0,0,0", ',');
        let err = decode::<PredictionFrame>(&tokens, &PREDICTION).unwrap_err();
        assert!(matches!(err, ReplayError::Format(_)));
    }

    #[test]
    fn test_rotation_normalized_on_decode() {
        let tokens = split_row("0,0,0,0,0,0,4", ',');
        let frame: PredictionFrame = decode(&tokens, &PREDICTION).unwrap();
        assert_eq!(frame.tracker.rotation, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_prediction_schema_cannot_build_reference() {
        assert!(PREDICTION.check_for::<ReferenceFrame>().is_err());
        assert!(PREDICTION.check_for::<PredictionFrame>().is_ok());
        assert!(REFERENCE.check_for::<PredictionFrame>().is_ok());
    }

    #[test]
    fn test_builtin_schemas_fit_their_columns() {
        for schema in [&REFERENCE, &REFERENCE_EXP0, &PREDICTION] {
            let mut used = vec![false; schema.columns];
            for field in schema.fields {
                for c in field.offset..field.offset + field.kind.arity() {
                    assert!(c < schema.columns, "{}: column {} out of range", schema.name, c);
                    assert!(!used[c], "{}: column {} assigned twice", schema.name, c);
                    used[c] = true;
                }
            }
        }
    }
}
