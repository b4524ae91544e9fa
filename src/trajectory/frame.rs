use crate::pose::{sub_position, Joint, Pose};

use super::schema::{Frame, PoseSet};

/// 参照ストリームの1フレーム（記録された正解データ）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub head: Pose,
    pub right_hand: Pose,
    pub left_hand: Pose,
    /// 腰トラッカー
    pub tracker: Pose,
}

impl ReferenceFrame {
    pub fn pose(&self, joint: Joint) -> &Pose {
        match joint {
            Joint::Head => &self.head,
            Joint::RightHand => &self.right_hand,
            Joint::LeftHand => &self.left_hand,
            Joint::Tracker => &self.tracker,
        }
    }

    /// 頭基準の相対位置 (head - joint)。学習時の relative* 特徴量と同じ定義。
    pub fn head_relative(&self, joint: Joint) -> [f32; 3] {
        sub_position(&self.head.position, &self.pose(joint).position)
    }
}

impl Frame for ReferenceFrame {
    const JOINTS: &'static [Joint] = &Joint::ALL;

    fn from_poses(poses: &PoseSet) -> Option<Self> {
        Some(Self {
            head: poses.get(Joint::Head)?,
            right_hand: poses.get(Joint::RightHand)?,
            left_hand: poses.get(Joint::LeftHand)?,
            tracker: poses.get(Joint::Tracker)?,
        })
    }
}

/// 予測ストリームの1フレーム（モデル出力空間）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionFrame {
    pub tracker: Pose,
}

impl Frame for PredictionFrame {
    const JOINTS: &'static [Joint] = &[Joint::Tracker];

    fn from_poses(poses: &PoseSet) -> Option<Self> {
        Some(Self {
            tracker: poses.get(Joint::Tracker)?,
        })
    }
}
