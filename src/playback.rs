//! 参照ストリームと予測ストリームを共通カーソルで同期再生する。

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{ReplayError, Result};
use crate::pose::{distance, sub_position};
use crate::scaler::{ScalerRegistry, TRACKER_POSITION_KEYS};
use crate::trajectory::{PredictionFrame, ReferenceFrame, Trajectory};

/// 参照フレームと予測フレームから作る比較用ポーズ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPose {
    /// 参照の頭位置 - 予測トラッカー位置
    pub position: [f32; 3],
    /// 予測回転（逆変換なし）
    pub rotation: [f32; 4],
    /// 予測回転のオイラー角（度）
    pub euler_degrees: [f32; 3],
}

impl AlignedPose {
    /// 予測位置は頭からの相対変位として扱い、参照トラッカーと同じ座標系に戻す。
    /// 回転はそのまま通す。
    pub fn derive(reference: &ReferenceFrame, prediction: &PredictionFrame) -> Self {
        Self {
            position: sub_position(&reference.head.position, &prediction.tracker.position),
            rotation: prediction.tracker.rotation,
            euler_degrees: prediction.tracker.euler_degrees(),
        }
    }
}

/// 1ティック分の出力
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick<'a> {
    pub index: usize,
    pub reference: &'a ReferenceFrame,
    pub prediction: Option<&'a PredictionFrame>,
    pub aligned: Option<AlignedPose>,
}

impl Tick<'_> {
    /// 参照トラッカー位置と比較用ポーズ位置の距離
    pub fn position_error(&self) -> Option<f32> {
        self.aligned
            .map(|aligned| distance(&self.reference.tracker.position, &aligned.position))
    }
}

/// 1周分の位置誤差
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub frames: usize,
    pub mean_position_error: f32,
    pub max_position_error: f32,
}

/// 再生カーソル
///
/// ストアとスケーラーは借用のみ。カーソルを書き換えるのはこの型だけ。
#[derive(Debug, Default)]
pub struct Synchronizer<'a> {
    reference: Option<&'a Trajectory<ReferenceFrame>>,
    prediction: Option<&'a Trajectory<PredictionFrame>>,
    scalers: Option<&'a ScalerRegistry>,
    cursor: usize,
    playing: bool,
}

impl<'a> Synchronizer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 参照ストリームを接続し、カーソルを0に戻す
    pub fn attach_reference(&mut self, reference: &'a Trajectory<ReferenceFrame>) -> &mut Self {
        self.reference = Some(reference);
        self.cursor = 0;
        self.warn_on_length_mismatch();
        self
    }

    pub fn attach_prediction(&mut self, prediction: &'a Trajectory<PredictionFrame>) -> &mut Self {
        self.prediction = Some(prediction);
        self.warn_on_length_mismatch();
        self
    }

    pub fn attach_scalers(&mut self, scalers: &'a ScalerRegistry) -> &mut Self {
        self.scalers = Some(scalers);
        self
    }

    fn warn_on_length_mismatch(&self) {
        if let (Some(reference), Some(prediction)) = (self.reference, self.prediction) {
            if reference.len() != prediction.len() {
                warn!(
                    reference = reference.len(),
                    prediction = prediction.len(),
                    "stream lengths differ"
                );
            }
        }
    }

    fn reference(&self) -> Result<&'a Trajectory<ReferenceFrame>> {
        self.reference
            .ok_or(ReplayError::NotReady("no reference trajectory attached"))
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 参照ストリームの長さ（ラップ位置）
    pub fn len(&self) -> Result<usize> {
        Ok(self.reference()?.len())
    }

    /// 全ストリームで有効なインデックスの数
    pub fn aligned_len(&self) -> Result<usize> {
        let len = self.reference()?.len();
        Ok(match self.prediction {
            Some(prediction) => len.min(prediction.len()),
            None => len,
        })
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    fn tick_at(&self, index: usize) -> Result<Tick<'a>> {
        let reference = self.reference()?.frame_at(index)?;
        let prediction = self.prediction.map(|p| p.frame_at(index)).transpose()?;
        Ok(Tick {
            index,
            reference,
            prediction,
            aligned: prediction.map(|p| AlignedPose::derive(reference, p)),
        })
    }

    /// カーソル位置のフレームを出力して1進める。末尾では0に戻して何も出力しない。
    ///
    /// 予測ストリームが短い場合、その範囲を超えた時点で Index エラー（カーソルは動かない）。
    pub fn step(&mut self) -> Result<Option<Tick<'a>>> {
        let len = self.reference()?.len();
        if self.cursor < len {
            let tick = self.tick_at(self.cursor)?;
            self.cursor += 1;
            Ok(Some(tick))
        } else {
            debug!(len, "playback wrapped to start");
            self.cursor = 0;
            Ok(None)
        }
    }

    /// 再生中のみ step する
    pub fn tick(&mut self) -> Result<Option<Tick<'a>>> {
        if self.playing {
            self.step()
        } else {
            Ok(None)
        }
    }

    /// カーソル位置のフレーム（カーソルは動かさない）
    pub fn current(&self) -> Result<Tick<'a>> {
        self.tick_at(self.cursor)
    }

    /// 範囲外はクランプせず Index エラー
    pub fn seek(&mut self, target: isize) -> Result<()> {
        let len = self.reference()?.len();
        if target < 0 || target as usize >= len {
            return Err(ReplayError::Index { index: target, len });
        }
        if let Some(prediction) = self.prediction {
            if target as usize >= prediction.len() {
                return Err(ReplayError::Index {
                    index: target,
                    len: prediction.len(),
                });
            }
        }
        self.cursor = target as usize;
        debug!(cursor = self.cursor, "seek");
        Ok(())
    }

    /// [0, aligned_len) から一様に選んだ位置へ移動
    pub fn seek_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize> {
        let len = self.aligned_len()?;
        if len == 0 {
            return Err(ReplayError::Index { index: 0, len });
        }
        self.cursor = rng.gen_range(0..len);
        debug!(cursor = self.cursor, "random seek");
        Ok(self.cursor)
    }

    /// カーソル位置の予測トラッカー位置をスケーラーで逆変換した値。
    ///
    /// 比較用ポーズ（頭基準の差分）とは別経路。
    pub fn denormalized_tracker_position(&self) -> Result<[f32; 3]> {
        let scalers = self
            .scalers
            .ok_or(ReplayError::NotReady("no scaler registry attached"))?;
        let prediction = self
            .prediction
            .ok_or(ReplayError::NotReady("no prediction trajectory attached"))?;
        let frame = prediction.frame_at(self.cursor)?;
        scalers.inverse_position(&TRACKER_POSITION_KEYS, &frame.tracker.position)
    }

    /// 有効範囲を1周して位置誤差を集計する。カーソルは変えない。
    pub fn evaluate(&self) -> Result<Evaluation> {
        if self.prediction.is_none() {
            return Err(ReplayError::NotReady("no prediction trajectory attached"));
        }
        let len = self.aligned_len()?;
        let mut sum = 0.0f32;
        let mut max = 0.0f32;
        for index in 0..len {
            let error = self.tick_at(index)?.position_error().unwrap_or(0.0);
            sum += error;
            max = max.max(error);
        }
        Ok(Evaluation {
            frames: len,
            mean_position_error: if len > 0 { sum / len as f32 } else { 0.0 },
            max_position_error: max,
        })
    }
}
