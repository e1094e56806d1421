//! YOLO-class object detection via ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use image::{DynamicImage, GenericImageView};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use ugc_models::{Detection, PixelRect};

use crate::detection::{ObjectDetect, COCO_CLASSES};
use crate::error::{MediaError, MediaResult};

/// YOLOv8-style output geometry: 4 box coords + 80 class scores per
/// candidate, 8400 candidates at 640x640 input.
const NUM_CLASSES: usize = 80;
const NUM_BOXES: usize = 8400;
const NUM_FEATURES: usize = 84;

/// Configuration for the ONNX detector.
#[derive(Debug, Clone)]
pub struct OnnxDetectorConfig {
    /// Path to ONNX model file
    pub model_path: String,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for OnnxDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// ONNX Runtime detector producing labeled pixel-space detections.
pub struct OnnxDetector {
    session: Mutex<Session>,
    config: OnnxDetectorConfig,
}

impl OnnxDetector {
    /// Load the model and prepare a session.
    ///
    /// Returns an error if the model file is missing or cannot be loaded.
    pub fn new(config: OnnxDetectorConfig) -> MediaResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Object detector initialized"
        );

        Ok(Self { session, config })
    }

    /// Preprocess: resize to the model's square input, normalize to [0,1],
    /// NCHW layout.
    fn preprocess(&self, img: &DynamicImage) -> MediaResult<Value> {
        let input_size = self.config.input_size;

        let resized = img.resize_exact(
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let rgb = resized.to_rgb8();
        let (w, h) = (input_size as usize, input_size as usize);

        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::inference_failed(format!("failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::inference_failed("session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::inference_failed(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::inference_failed("missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::inference_failed(format!("failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }

    fn postprocess(
        &self,
        outputs: &[f32],
        orig_width: u32,
        orig_height: u32,
    ) -> MediaResult<Vec<Detection>> {
        let candidates = decode_candidates(
            outputs,
            orig_width,
            orig_height,
            self.config.input_size,
            self.config.confidence_threshold,
        )?;
        Ok(non_maximum_suppression(candidates, self.config.nms_threshold))
    }
}

impl ObjectDetect for OnnxDetector {
    fn detect(&self, image: &DynamicImage) -> MediaResult<Vec<Detection>> {
        let (width, height) = image.dimensions();
        let input = self.preprocess(image)?;
        let outputs = self.run_inference(input)?;
        let detections = self.postprocess(&outputs, width, height)?;

        debug!(count = detections.len(), "Object detection completed");
        Ok(detections)
    }
}

/// Decode the raw `[1, 84, 8400]` output into thresholded pixel-space
/// candidates.
fn decode_candidates(
    outputs: &[f32],
    orig_width: u32,
    orig_height: u32,
    input_size: u32,
    confidence_threshold: f32,
) -> MediaResult<Vec<Detection>> {
    if outputs.len() != NUM_FEATURES * NUM_BOXES {
        return Err(MediaError::inference_failed(format!(
            "unexpected output size: expected {}, got {}",
            NUM_FEATURES * NUM_BOXES,
            outputs.len()
        )));
    }

    // Output is [84, 8400]; transpose to iterate candidates.
    let output_array = Array::from_shape_vec((NUM_FEATURES, NUM_BOXES), outputs.to_vec())
        .map_err(|e| MediaError::inference_failed(format!("failed to reshape output: {}", e)))?;
    let transposed = output_array.t();

    let scale_w = orig_width as f32 / input_size as f32;
    let scale_h = orig_height as f32 / input_size as f32;

    let mut candidates = Vec::new();
    for i in 0..NUM_BOXES {
        // Box is in center format in model coordinates
        let cx = transposed[[i, 0]];
        let cy = transposed[[i, 1]];
        let w = transposed[[i, 2]];
        let h = transposed[[i, 3]];

        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for c in 0..NUM_CLASSES {
            let score = transposed[[i, 4 + c]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < confidence_threshold {
            continue;
        }

        // Corner format, scaled to source pixels, clamped to the frame
        let x = ((cx - w / 2.0) * scale_w).clamp(0.0, orig_width as f32);
        let y = ((cy - h / 2.0) * scale_h).clamp(0.0, orig_height as f32);
        let width = (w * scale_w).min(orig_width as f32 - x);
        let height = (h * scale_h).min(orig_height as f32 - y);

        // Clamping can collapse boxes that sat outside the frame
        let bbox = PixelRect::new(x, y, width, height);
        if !bbox.is_within(orig_width, orig_height) {
            continue;
        }

        candidates.push(Detection::new(COCO_CLASSES[best_class], best_score, bbox));
    }

    Ok(candidates)
}

/// Non-maximum suppression, per label, highest confidence wins.
fn non_maximum_suppression(mut detections: Vec<Detection>, nms_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }

        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].label != detections[j].label {
                continue;
            }
            if iou(&detections[i].bbox, &detections[j].bbox) > nms_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection over union of two pixel rects.
fn iou(a: &PixelRect, b: &PixelRect) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Create ONNX Runtime session (CPU execution).
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::inference_failed(format!("failed to read model file: {}", e)))?;

    Session::builder()
        .map_err(|e| MediaError::inference_failed(format!("failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::inference_failed(format!("failed to set optimization level: {}", e)))?
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::inference_failed(format!("failed to load ONNX model: {}", e)))
}
