//! Session orchestration.
//!
//! One `Session` owns the artifacts of one user's select → enhance →
//! detect → synthesize flow. Selecting a new source bumps a generation
//! counter and releases every derived artifact; async work that started
//! under an older generation discards its result when it resolves, so the
//! UI can never observe an artifact that belongs to a stale source.
//!
//! Each action is mutually exclusive with itself (no duplicate in-flight
//! invocation) but independent actions may interleave. Capability handles
//! are lazily initialized once per session and reused.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use ugc_media::{MediaError, MediaResult, ObjectDetect};
use ugc_models::{filter_and_rank, resolve_scale, Detection, EnhancementParameters, VideoSynthesisParameters};

use crate::capabilities::{EnhanceCapability, SynthesisCapability};
use crate::error::{SessionError, SessionResult};

/// MIME types accepted for upload; anything else is rejected before any
/// processing starts.
pub const ACCEPTED_IMAGE_MIME: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Where the session currently is in the user flow. Tracks the most recent
/// transition; artifacts from earlier successful actions stay available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FileSelected,
    Enhancing,
    Enhanced,
    EnhancementFailed,
    Detecting,
    Detected,
    DetectionFailed,
    Synthesizing,
    VideoReady,
    SynthesisFailed,
}

/// The three user-triggered async actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Enhance,
    Detect,
    Synthesize,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Action::Enhance => "enhance",
            Action::Detect => "detect",
            Action::Synthesize => "synthesize",
        }
    }

    fn running_phase(self) -> Phase {
        match self {
            Action::Enhance => Phase::Enhancing,
            Action::Detect => Phase::Detecting,
            Action::Synthesize => Phase::Synthesizing,
        }
    }

    fn failed_phase(self) -> Phase {
        match self {
            Action::Enhance => Phase::EnhancementFailed,
            Action::Detect => Phase::DetectionFailed,
            Action::Synthesize => Phase::SynthesisFailed,
        }
    }
}

/// Result payload carried from a completed action back into the state.
enum Outcome {
    Enhanced(Vec<u8>),
    Detections(Vec<Detection>),
    Video(Vec<u8>),
}

struct SourceImage {
    bytes: Arc<Vec<u8>>,
    mime: String,
}

struct SessionState {
    generation: u64,
    source: Option<SourceImage>,
    enhanced: Option<Arc<Vec<u8>>>,
    detections: Vec<Detection>,
    video: Option<Arc<Vec<u8>>>,
    enhancing: bool,
    detecting: bool,
    synthesizing: bool,
    phase: Phase,
}

impl SessionState {
    fn new() -> Self {
        Self {
            generation: 0,
            source: None,
            enhanced: None,
            detections: Vec::new(),
            video: None,
            enhancing: false,
            detecting: false,
            synthesizing: false,
            phase: Phase::Idle,
        }
    }

    fn in_flight(&mut self, action: Action) -> &mut bool {
        match action {
            Action::Enhance => &mut self.enhancing,
            Action::Detect => &mut self.detecting,
            Action::Synthesize => &mut self.synthesizing,
        }
    }
}

type DetectorFactory = Box<dyn Fn() -> MediaResult<Arc<dyn ObjectDetect>> + Send + Sync>;
type SynthesizerFactory = Box<dyn Fn() -> MediaResult<Arc<dyn SynthesisCapability>> + Send + Sync>;

/// Orchestrator for one upload/enhance/detect/synthesize session.
pub struct Session {
    state: Mutex<SessionState>,
    enhancer: Arc<dyn EnhanceCapability>,
    detector: OnceCell<Arc<dyn ObjectDetect>>,
    detector_factory: DetectorFactory,
    synthesizer: OnceCell<Arc<dyn SynthesisCapability>>,
    synthesizer_factory: SynthesizerFactory,
}

impl Session {
    /// Create a session with explicit capabilities. The detector and
    /// synthesizer are built lazily on first use and then reused.
    pub fn new(
        enhancer: Arc<dyn EnhanceCapability>,
        detector_factory: DetectorFactory,
        synthesizer_factory: SynthesizerFactory,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState::new()),
            enhancer,
            detector: OnceCell::new(),
            detector_factory,
            synthesizer: OnceCell::new(),
            synthesizer_factory,
        }
    }

    /// Create a session wired to the in-process capabilities.
    pub fn with_local_capabilities(detector_config: ugc_media::OnnxDetectorConfig) -> Self {
        Self::new(
            Arc::new(crate::capabilities::LocalEnhancer::new()),
            Box::new(move || {
                Ok(Arc::new(ugc_media::OnnxDetector::new(detector_config.clone())?)
                    as Arc<dyn ObjectDetect>)
            }),
            Box::new(|| {
                Ok(Arc::new(ugc_media::VideoSynthesizer::new()?)
                    as Arc<dyn SynthesisCapability>)
            }),
        )
    }

    /// Select a new source image, invalidating all derived artifacts.
    pub fn select_source(&self, bytes: Vec<u8>, mime: &str) -> SessionResult<()> {
        if !ACCEPTED_IMAGE_MIME.contains(&mime) {
            return Err(SessionError::UnsupportedMime(mime.to_string()));
        }

        let mut state = self.lock()?;
        state.generation += 1;
        state.source = Some(SourceImage {
            bytes: Arc::new(bytes),
            mime: mime.to_string(),
        });
        state.enhanced = None;
        state.detections.clear();
        state.video = None;
        state.phase = Phase::FileSelected;

        info!(generation = state.generation, mime, "Source image selected");
        Ok(())
    }

    /// Enhance the current source image.
    ///
    /// `requested_scale` is the raw form value; it is resolved leniently
    /// (default 2, clamped to 1..=4). On success the enhanced PNG becomes
    /// the preferred input for detection and synthesis.
    pub async fn enhance(&self, requested_scale: Option<&str>) -> SessionResult<Arc<Vec<u8>>> {
        let (generation, source) = self.begin(Action::Enhance)?;

        let result = async {
            let scale = resolve_scale(requested_scale);
            let (width, height) = ugc_media::read_dimensions(&source)?;
            let params = EnhancementParameters::compute(width, height, scale)?;
            debug!(width, height, %scale, "Enhancing source image");
            self.enhancer.enhance(&source, &params).await
        }
        .await;

        self.finish(Action::Enhance, generation, result.map(Outcome::Enhanced))?;
        self.lock()?
            .enhanced
            .clone()
            .ok_or_else(|| MediaError::internal("enhanced artifact missing after apply").into())
    }

    /// Run detection over the most recently enhanced image (or the raw
    /// source when no enhancement has completed), filtered to the
    /// clothing/accessory allow-list and ranked by confidence.
    pub async fn detect(&self) -> SessionResult<Vec<Detection>> {
        let (generation, bytes) = self.begin(Action::Detect)?;

        let result = async {
            let detector = self
                .detector
                .get_or_try_init(|| async { (self.detector_factory)() })
                .await?
                .clone();

            let raw = tokio::task::spawn_blocking(move || {
                let img = image::load_from_memory(&bytes).map_err(|e| {
                    MediaError::inference_failed(format!("decode for inference failed: {}", e))
                })?;
                detector.detect(&img)
            })
            .await
            .map_err(|e| MediaError::internal(format!("detect task panicked: {}", e)))??;

            Ok(filter_and_rank(&raw))
        }
        .await;

        self.finish(Action::Detect, generation, result.map(Outcome::Detections))?;
        Ok(self.lock()?.detections.clone())
    }

    /// Synthesize the short looped video from the enhanced image (or the
    /// raw source as fallback).
    pub async fn synthesize(&self) -> SessionResult<Arc<Vec<u8>>> {
        let (generation, still) = self.begin(Action::Synthesize)?;

        let result = async {
            let synthesizer = self
                .synthesizer
                .get_or_try_init(|| async { (self.synthesizer_factory)() })
                .await?
                .clone();

            let params = VideoSynthesisParameters::plan();
            synthesizer.synthesize(&still, &params).await
        }
        .await;

        self.finish(Action::Synthesize, generation, result.map(Outcome::Video))?;
        self.lock()?
            .video
            .clone()
            .ok_or_else(|| MediaError::internal("video artifact missing after apply").into())
    }

    /// Current phase of the flow.
    pub fn phase(&self) -> Phase {
        self.lock().map(|s| s.phase).unwrap_or(Phase::Idle)
    }

    /// Current generation (bumped on every source selection).
    pub fn generation(&self) -> u64 {
        self.lock().map(|s| s.generation).unwrap_or(0)
    }

    /// Declared MIME type of the current source, if one is selected.
    pub fn source_mime(&self) -> Option<String> {
        self.lock()
            .ok()
            .and_then(|s| s.source.as_ref().map(|src| src.mime.clone()))
    }

    /// The enhanced PNG, if an enhancement has completed for the current
    /// source.
    pub fn enhanced_image(&self) -> Option<Arc<Vec<u8>>> {
        self.lock().ok().and_then(|s| s.enhanced.clone())
    }

    /// Detections from the most recent completed inference pass.
    pub fn detections(&self) -> Vec<Detection> {
        self.lock().map(|s| s.detections.clone()).unwrap_or_default()
    }

    /// The synthesized video, if one has been produced for the current
    /// source.
    pub fn video(&self) -> Option<Arc<Vec<u8>>> {
        self.lock().ok().and_then(|s| s.video.clone())
    }

    fn lock(&self) -> SessionResult<MutexGuard<'_, SessionState>> {
        self.state
            .lock()
            .map_err(|_| MediaError::internal("session state poisoned").into())
    }

    /// Validate preconditions, mark the action in flight, and capture the
    /// generation plus the bytes the action operates on.
    fn begin(&self, action: Action) -> SessionResult<(u64, Arc<Vec<u8>>)> {
        let mut state = self.lock()?;

        let source = state.source.as_ref().ok_or(SessionError::NoSource)?;
        let source_bytes = source.bytes.clone();

        let bytes = match action {
            Action::Enhance => source_bytes,
            // Detection and synthesis observe the most recently completed
            // enhancement, never a partial one: the artifact reference is
            // only ever written by a fully resolved action.
            Action::Detect | Action::Synthesize => {
                state.enhanced.clone().unwrap_or(source_bytes)
            }
        };

        let in_flight = state.in_flight(action);
        if *in_flight {
            return Err(SessionError::ActionInFlight(action.name()));
        }
        *in_flight = true;
        state.phase = action.running_phase();

        Ok((state.generation, bytes))
    }

    /// Clear the in-flight flag and apply or discard the action's result.
    ///
    /// A result belonging to an older generation is dropped without
    /// touching the artifacts of the current one.
    fn finish(
        &self,
        action: Action,
        generation: u64,
        result: MediaResult<Outcome>,
    ) -> SessionResult<()> {
        let mut state = self.lock()?;
        *state.in_flight(action) = false;

        if state.generation != generation {
            warn!(
                action = action.name(),
                stale_generation = generation,
                current_generation = state.generation,
                "Discarding result of superseded action"
            );
            return Err(SessionError::Superseded);
        }

        match result {
            Ok(Outcome::Enhanced(png)) => {
                state.enhanced = Some(Arc::new(png));
                state.phase = Phase::Enhanced;
            }
            Ok(Outcome::Detections(detections)) => {
                state.detections = detections;
                state.phase = Phase::Detected;
            }
            Ok(Outcome::Video(mp4)) => {
                state.video = Some(Arc::new(mp4));
                state.phase = Phase::VideoReady;
            }
            Err(e) => {
                // A failed action leaves artifacts from prior successful
                // actions intact.
                state.phase = action.failed_phase();
                return Err(e.into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Cursor;
    use tokio::sync::Notify;
    use ugc_models::PixelRect;

    fn test_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 80, 40]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    /// Enhancer that waits for a gate before returning, so tests can
    /// interleave supersession with in-flight work.
    struct GatedEnhancer {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl EnhanceCapability for GatedEnhancer {
        async fn enhance(
            &self,
            source: &[u8],
            _params: &EnhancementParameters,
        ) -> MediaResult<Vec<u8>> {
            self.gate.notified().await;
            Ok(source.to_vec())
        }
    }

    struct FixedDetector {
        detections: Vec<Detection>,
    }

    impl ObjectDetect for FixedDetector {
        fn detect(&self, _image: &image::DynamicImage) -> MediaResult<Vec<Detection>> {
            Ok(self.detections.clone())
        }
    }

    struct FixedSynthesizer;

    #[async_trait]
    impl SynthesisCapability for FixedSynthesizer {
        async fn synthesize(
            &self,
            _still: &[u8],
            _params: &VideoSynthesisParameters,
        ) -> MediaResult<Vec<u8>> {
            Ok(b"mp4".to_vec())
        }
    }

    struct FailingSynthesizer;

    #[async_trait]
    impl SynthesisCapability for FailingSynthesizer {
        async fn synthesize(
            &self,
            _still: &[u8],
            _params: &VideoSynthesisParameters,
        ) -> MediaResult<Vec<u8>> {
            Err(MediaError::synthesis_failed("encoder exploded", None))
        }
    }

    fn session_with(
        enhancer: Arc<dyn EnhanceCapability>,
        detections: Vec<Detection>,
        failing_synth: bool,
    ) -> Session {
        Session::new(
            enhancer,
            Box::new(move || {
                Ok(Arc::new(FixedDetector {
                    detections: detections.clone(),
                }) as Arc<dyn ObjectDetect>)
            }),
            Box::new(move || {
                if failing_synth {
                    Ok(Arc::new(FailingSynthesizer) as Arc<dyn SynthesisCapability>)
                } else {
                    Ok(Arc::new(FixedSynthesizer) as Arc<dyn SynthesisCapability>)
                }
            }),
        )
    }

    fn det(label: &str, score: f32) -> Detection {
        Detection::new(label, score, PixelRect::new(0.0, 0.0, 5.0, 5.0))
    }

    fn open_gate() -> (Arc<Notify>, Arc<dyn EnhanceCapability>) {
        let gate = Arc::new(Notify::new());
        // Pre-store a permit so ungated tests pass straight through
        gate.notify_one();
        let enhancer = Arc::new(GatedEnhancer { gate: gate.clone() });
        (gate, enhancer)
    }

    #[test]
    fn test_rejects_unsupported_mime() {
        let (_, enhancer) = open_gate();
        let session = session_with(enhancer, vec![], false);
        let err = session.select_source(vec![1, 2, 3], "image/gif").unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedMime(_)));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_enhance_without_source_fails() {
        let (_, enhancer) = open_gate();
        let session = session_with(enhancer, vec![], false);
        assert!(matches!(
            session.enhance(Some("2")).await,
            Err(SessionError::NoSource)
        ));
    }

    #[tokio::test]
    async fn test_full_flow() {
        let (_, enhancer) = open_gate();
        let session = session_with(
            enhancer,
            vec![det("car", 0.95), det("shoe", 0.4), det("bottle", 0.8)],
            false,
        );

        session.select_source(test_png(8, 8), "image/png").unwrap();
        assert_eq!(session.phase(), Phase::FileSelected);
        assert_eq!(session.source_mime().as_deref(), Some("image/png"));

        session.enhance(Some("2")).await.unwrap();
        assert_eq!(session.phase(), Phase::Enhanced);
        assert!(session.enhanced_image().is_some());

        let detections = session.detect().await.unwrap();
        assert_eq!(session.phase(), Phase::Detected);
        let labels: Vec<_> = detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["bottle", "shoe"]); // car filtered, ranked desc

        let video = session.synthesize().await.unwrap();
        assert_eq!(session.phase(), Phase::VideoReady);
        assert_eq!(video.as_slice(), b"mp4");
    }

    #[tokio::test]
    async fn test_detect_works_without_enhancement() {
        let (_, enhancer) = open_gate();
        let session = session_with(enhancer, vec![det("person", 0.9)], false);
        session.select_source(test_png(4, 4), "image/jpeg").unwrap();

        let detections = session.detect().await.unwrap();
        assert_eq!(detections.len(), 1);
    }

    #[tokio::test]
    async fn test_new_selection_releases_artifacts() {
        let (_, enhancer) = open_gate();
        let session = session_with(enhancer, vec![det("person", 0.9)], false);

        session.select_source(test_png(4, 4), "image/png").unwrap();
        session.enhance(None).await.unwrap();
        session.detect().await.unwrap();
        assert!(session.enhanced_image().is_some());
        assert!(!session.detections().is_empty());

        session.select_source(test_png(6, 6), "image/png").unwrap();
        assert!(session.enhanced_image().is_none());
        assert!(session.detections().is_empty());
        assert!(session.video().is_none());
        assert_eq!(session.generation(), 2);
    }

    #[tokio::test]
    async fn test_superseded_enhancement_is_discarded() {
        let gate = Arc::new(Notify::new());
        let enhancer = Arc::new(GatedEnhancer { gate: gate.clone() });
        let session = Arc::new(session_with(enhancer, vec![], false));

        session.select_source(test_png(4, 4), "image/png").unwrap();

        let in_flight = {
            let session = session.clone();
            tokio::spawn(async move { session.enhance(Some("2")).await })
        };

        // Let the enhance reach its await point, then supersede it
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        session.select_source(test_png(8, 8), "image/png").unwrap();
        gate.notify_one();

        let result = in_flight.await.unwrap();
        assert!(matches!(result, Err(SessionError::Superseded)));
        // The stale result must never surface as the new source's artifact
        assert!(session.enhanced_image().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_enhance_is_rejected() {
        let gate = Arc::new(Notify::new());
        let enhancer = Arc::new(GatedEnhancer { gate: gate.clone() });
        let session = Arc::new(session_with(enhancer, vec![], false));

        session.select_source(test_png(4, 4), "image/png").unwrap();

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.enhance(None).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let second = session.enhance(None).await;
        assert!(matches!(second, Err(SessionError::ActionInFlight("enhance"))));

        gate.notify_one();
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_failed_synthesis_keeps_enhanced_artifact() {
        let (_, enhancer) = open_gate();
        let session = session_with(enhancer, vec![], true);

        session.select_source(test_png(4, 4), "image/png").unwrap();
        session.enhance(None).await.unwrap();

        let result = session.synthesize().await;
        assert!(matches!(
            result,
            Err(SessionError::Media(MediaError::SynthesisFailed { .. }))
        ));
        assert_eq!(session.phase(), Phase::SynthesisFailed);
        assert!(session.enhanced_image().is_some());
    }
}
