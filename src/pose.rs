use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// 記録対象の部位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Joint {
    Head = 0,
    RightHand = 1,
    LeftHand = 2,
    Tracker = 3,
}

impl Joint {
    pub const COUNT: usize = 4;
    pub const ALL: [Joint; Joint::COUNT] =
        [Joint::Head, Joint::RightHand, Joint::LeftHand, Joint::Tracker];

    /// 記録CSVのカラム名プレフィックス
    pub fn name(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::RightHand => "handR",
            Self::LeftHand => "handL",
            Self::Tracker => "tracker1",
        }
    }
}

/// 位置と回転
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// 位置 (x, y, z)、親座標系のローカル
    pub position: [f32; 3],
    /// 回転 (クォータニオン: x, y, z, w)
    pub rotation: [f32; 4],
}

impl Pose {
    pub fn new(position: [f32; 3], rotation: [f32; 4]) -> Self {
        Self { position, rotation }
    }

    /// 原点、回転なし
    pub fn identity() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// 回転を正規化して作成。長さ0や非有限値なら None。
    pub fn normalized(position: [f32; 3], rotation: [f32; 4]) -> Option<Self> {
        normalize_quat(&rotation).map(|rotation| Self { position, rotation })
    }

    /// 回転をオイラー角（度）で返す。
    ///
    /// 記録エンジンと同じ Z → X → Y の適用順で、各成分は [0, 360)。
    pub fn euler_degrees(&self) -> [f32; 3] {
        quat_to_euler_degrees(&self.rotation)
    }
}

/// クォータニオンを単位長に正規化
pub fn normalize_quat(q: &[f32; 4]) -> Option<[f32; 4]> {
    if q.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len <= f32::EPSILON {
        return None;
    }
    Some([q[0] / len, q[1] / len, q[2] / len, q[3] / len])
}

/// a - b
pub fn sub_position(a: &[f32; 3], b: &[f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// 2点間のユークリッド距離
pub fn distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    (Vector3::from(*a) - Vector3::from(*b)).norm()
}

fn quat_to_euler_degrees(q: &[f32; 4]) -> [f32; 3] {
    // nalgebra の Quaternion::new は (w, i, j, k) の順
    let unit = UnitQuaternion::from_quaternion(Quaternion::new(q[3], q[0], q[1], q[2]));
    let m = unit.to_rotation_matrix();
    let m = m.matrix();

    // R = Ry * Rx * Rz
    let sin_x = (-m[(1, 2)]).clamp(-1.0, 1.0);
    let (x, y, z) = if sin_x.abs() < 0.99999 {
        (
            sin_x.asin(),
            f32::atan2(m[(0, 2)], m[(2, 2)]),
            f32::atan2(m[(1, 0)], m[(1, 1)]),
        )
    } else {
        // ジンバルロック: zを0に固定
        (sin_x.asin(), f32::atan2(-m[(2, 0)], m[(0, 0)]), 0.0)
    };

    [
        wrap_degrees(x.to_degrees()),
        wrap_degrees(y.to_degrees()),
        wrap_degrees(z.to_degrees()),
    ]
}

fn wrap_degrees(deg: f32) -> f32 {
    let d = deg.rem_euclid(360.0);
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}
