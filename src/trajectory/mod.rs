pub mod frame;
pub mod row;
pub mod schema;
pub mod store;

pub use frame::{PredictionFrame, ReferenceFrame};
pub use row::{data_rows, split_row, DEFAULT_DELIMITER};
pub use schema::{
    decode, decode_poses, FieldKind, FieldSpec, Frame, PoseSet, Schema, PREDICTION, REFERENCE,
    REFERENCE_EXP0,
};
pub use store::Trajectory;
