use thiserror::Error;

/// Error type returned by faceqa operations.
#[derive(Debug, Error)]
pub enum FaceQaError {
    #[error("face detection failed: {0}")]
    FaceDetection(String),

    #[error("facial landmark extraction failed: {0}")]
    FaceLandmarkExtraction(String),

    #[error("face occlusion segmentation failed: {0}")]
    FaceOcclusionSegmentation(String),

    #[error("face parsing failed: {0}")]
    FaceParsing(String),

    #[error("missing configuration parameter: {0}")]
    MissingConfigParam(String),

    #[error("quality assessment failed: {0}")]
    QualityAssessment(String),

    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl FaceQaError {
    /// Stable machine-readable code for the error category, reported in
    /// [`crate::QualityReport::status`].
    pub fn code(&self) -> StatusCode {
        match self {
            FaceQaError::FaceDetection(_) => StatusCode::FaceDetectionError,
            FaceQaError::FaceLandmarkExtraction(_) => StatusCode::FaceLandmarkExtractionError,
            FaceQaError::FaceOcclusionSegmentation(_) => StatusCode::FaceOcclusionSegmentationError,
            FaceQaError::FaceParsing(_) => StatusCode::FaceParsingError,
            FaceQaError::MissingConfigParam(_) => StatusCode::MissingConfigParamError,
            FaceQaError::QualityAssessment(_) => StatusCode::QualityAssessmentError,
            FaceQaError::ImageDecode(_) => StatusCode::ImageDecodeError,
            FaceQaError::NotImplemented(_) => StatusCode::NotImplemented,
            FaceQaError::Unknown(_) => StatusCode::UnknownError,
        }
    }
}

/// Status of a top-level API call. Errors never cross the API boundary as
/// panics; they are converted to a status code plus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// The call completed and produced results.
    Success,
    /// Face detection failed or found no face.
    FaceDetectionError,
    /// Landmark extraction failed.
    FaceLandmarkExtractionError,
    /// Occlusion segmentation failed.
    FaceOcclusionSegmentationError,
    /// Face parsing failed.
    FaceParsingError,
    /// A required configuration parameter is missing or malformed.
    MissingConfigParamError,
    /// A quality measure could not be assessed.
    QualityAssessmentError,
    /// The input bytes could not be decoded as an image.
    ImageDecodeError,
    /// The requested operation has no implementation.
    NotImplemented,
    /// Uncategorized failure.
    UnknownError,
}

impl StatusCode {
    /// Whether the call succeeded.
    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_maps_to_matching_code() {
        let err = FaceQaError::FaceDetection("no face".into());
        assert_eq!(err.code(), StatusCode::FaceDetectionError);
        assert!(!err.code().is_success());
    }

    #[test]
    fn error_message_includes_detail() {
        let err = FaceQaError::MissingConfigParam("measures".into());
        assert!(err.to_string().contains("measures"));
    }
}
