//! Head pose frontality.
//!
//! Compound measure: one component per rotation axis. The raw score is the
//! angle in degrees; the scalar is `clamp(round(100 · cos²(angle)), 0, 100)`,
//! so a frontal pose (0°) scores 100 and a profile (90°) scores 0.

use crate::error::FaceQaError;
use crate::measures::{write_result, Measure};
use crate::session::Session;
use crate::types::MeasureId;

/// Scores yaw, pitch, and roll frontality from the estimated pose.
#[derive(Debug, Default)]
pub struct HeadPose;

fn angle_scalar(degrees: f64) -> f64 {
    let c = degrees.to_radians().cos();
    (100.0 * c * c).round().clamp(0.0, 100.0)
}

impl Measure for HeadPose {
    fn id(&self) -> MeasureId {
        MeasureId::HeadPose
    }

    fn execute(&self, session: &mut Session) -> Result<(), FaceQaError> {
        let pose = session.pose();
        for (key, angle) in [
            (MeasureId::HeadPoseYaw, pose.yaw),
            (MeasureId::HeadPosePitch, pose.pitch),
            (MeasureId::HeadPoseRoll, pose.roll),
        ] {
            write_result(session, key, angle, angle_scalar(angle));
        }
        Ok(())
    }
}
