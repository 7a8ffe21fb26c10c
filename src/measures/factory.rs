//! Construction of measures from configuration.

use log::warn;

use crate::config::{Settings, KEY_MEASURES};
use crate::error::FaceQaError;
use crate::measures::{
    BackgroundUniformity, CropOfTheFaceImage, DynamicRange, HeadPose, Luminance, Measure,
    SingleFacePresent,
};
use crate::types::MeasureId;

/// Builds measure instances from the configured identifier list.
pub struct MeasureFactory;

impl MeasureFactory {
    /// Construct one measure by identifier.
    ///
    /// Returns `None` for identifiers without a built-in implementation,
    /// such as component keys that are written by their compound measure.
    pub fn create(id: MeasureId, settings: &Settings) -> Option<Box<dyn Measure>> {
        match id {
            MeasureId::SingleFacePresent => Some(Box::new(SingleFacePresent)),
            MeasureId::HeadPose => Some(Box::new(HeadPose)),
            MeasureId::DynamicRange => Some(Box::new(DynamicRange)),
            MeasureId::Luminance => Some(Box::new(Luminance::new(settings))),
            MeasureId::CropOfTheFaceImage => Some(Box::new(CropOfTheFaceImage::new(settings))),
            MeasureId::BackgroundUniformity => Some(Box::new(BackgroundUniformity::new(settings))),
            _ => None,
        }
    }

    /// Resolve the configured `measures` list into ordered measure ids and
    /// instances.
    ///
    /// Unrecognized names and identifiers without a constructor are logged
    /// and skipped. An empty measure list is a configuration error.
    pub fn create_configured(
        settings: &Settings,
    ) -> Result<(Vec<MeasureId>, Vec<Box<dyn Measure>>), FaceQaError> {
        let names = settings.get_string_list(KEY_MEASURES)?;
        let mut ids = Vec::new();
        let mut measures = Vec::new();
        for name in &names {
            let Some(id) = MeasureId::parse(name) else {
                warn!("unrecognized measure {name:?} in configuration, skipping");
                continue;
            };
            match Self::create(id, settings) {
                Some(measure) => {
                    ids.push(id);
                    measures.push(measure);
                }
                None => warn!("no implementation for measure {name:?}, skipping"),
            }
        }
        if measures.is_empty() {
            return Err(FaceQaError::MissingConfigParam(
                "no usable entries in the measures list".into(),
            ));
        }
        Ok((ids, measures))
    }
}
