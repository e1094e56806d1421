//! Object detection capability boundary.
//!
//! The core treats the inference engine as a black box: anything that can
//! turn a decoded raster into labeled, scored, boxed detections satisfies
//! [`ObjectDetect`] and is substitutable. One concrete engine ships here, a
//! YOLO-class ONNX detector over the COCO vocabulary.

pub mod onnx;

use image::DynamicImage;

use ugc_models::Detection;

use crate::error::MediaResult;

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Inference capability: decoded raster in, raw detections out.
///
/// Implementations must be safe to share behind an `Arc` and reuse across
/// calls; loading happens once per session (cold start is acceptable).
pub trait ObjectDetect: Send + Sync {
    /// Detect objects in an image, returning raw (unfiltered) detections
    /// with pixel-space bounding boxes.
    fn detect(&self, image: &DynamicImage) -> MediaResult<Vec<Detection>>;
}

pub use onnx::{OnnxDetector, OnnxDetectorConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_vocabulary() {
        assert_eq!(COCO_CLASSES.len(), 80);
        assert_eq!(COCO_CLASSES[0], "person");
        assert_eq!(COCO_CLASSES[26], "handbag");
    }

    #[test]
    fn test_allow_list_labels_exist_in_vocabulary() {
        for label in ugc_models::ALLOWED_LABELS {
            // "shoe" is the one allow-list entry COCO does not know; it can
            // only match engines with a richer vocabulary.
            if *label == "shoe" {
                continue;
            }
            assert!(COCO_CLASSES.contains(label), "{} missing from COCO", label);
        }
    }
}
