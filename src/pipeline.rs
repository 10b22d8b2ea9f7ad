//! Pipeline orchestration: preprocess, frame, dispatch transforms, rebuild.
//!
//! One invocation processes one signal to completion; stages hand fresh
//! buffers to each other and share nothing. Per-frame transforms are
//! independent, so they fan out over a bounded worker pool and are re-paired
//! with their source offsets before overlap-add. The transform call is the
//! only suspension point, and the only one a stop flag can interrupt.

use crate::config::ModelConfig;
use crate::dsp;
use crate::error::PipelineError;
use crate::signal::SignalBuffer;
use crate::transform::FrameTransform;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

/// Cap on transform workers so batch runs don't max out every core.
const MAX_WORKERS: usize = 8;

/// Preprocessing toggles applied before framing. Both default off and they
/// are independent of each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Rescale to unit peak amplitude first.
    pub normalize: bool,
    /// Strip leading/trailing near-silence after normalization.
    pub trim_silence: bool,
    /// Absolute-amplitude threshold used when `trim_silence` is set.
    pub silence_threshold: f32,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            normalize: false,
            trim_silence: false,
            silence_threshold: dsp::DEFAULT_SILENCE_THRESHOLD,
        }
    }
}

/// Counters and timings for one invocation, for logging and CI smoke checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineMetrics {
    pub input_samples: usize,
    /// Sample count after normalization/trimming, i.e. what was framed.
    pub processed_samples: usize,
    pub output_samples: usize,
    pub frames_total: usize,
    pub workers: usize,
    pub normalize_applied: bool,
    pub trim_applied: bool,
    pub preprocess_ms: u64,
    pub transform_ms: u64,
    pub reconstruct_ms: u64,
}

/// Result of a successful invocation.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub signal: SignalBuffer,
    pub metrics: PipelineMetrics,
}

/// Batch frame-processing pipeline bound to one transform capability.
///
/// Construct once, run any number of invocations; nothing is shared between
/// them except the (stateless) transform itself.
pub struct Pipeline {
    config: ModelConfig,
    transform: Arc<dyn FrameTransform>,
    workers: usize,
}

impl Pipeline {
    /// Validates the frame geometry up front so invocations can't fail on it.
    pub fn new(
        config: ModelConfig,
        transform: Arc<dyn FrameTransform>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            transform,
            workers: num_cpus::get().min(MAX_WORKERS),
        })
    }

    /// Override the worker pool size (tests and benchmarks).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Run one invocation to completion.
    pub fn process(
        &self,
        signal: &SignalBuffer,
        options: &ProcessingOptions,
    ) -> Result<PipelineOutput, PipelineError> {
        self.process_with_cancel(signal, options, &AtomicBool::new(false))
    }

    /// Run one invocation, abandoning outstanding frame transforms as soon as
    /// `cancel` is observed set. A cancelled invocation reports
    /// [`PipelineError::Cancelled`] and never partial output.
    pub fn process_with_cancel(
        &self,
        signal: &SignalBuffer,
        options: &ProcessingOptions,
        cancel: &AtomicBool,
    ) -> Result<PipelineOutput, PipelineError> {
        if signal.sample_rate == 0 {
            return Err(PipelineError::InvalidConfig(
                "signal sample rate must be positive".to_string(),
            ));
        }
        if signal.is_empty() {
            return Err(PipelineError::EmptySignal);
        }
        if signal.sample_rate != self.config.sampling_rate {
            warn!(
                signal_rate = signal.sample_rate,
                model_rate = self.config.sampling_rate,
                "signal rate differs from the rate the model expects"
            );
        }

        let mut metrics = PipelineMetrics {
            input_samples: signal.len(),
            workers: self.workers,
            normalize_applied: options.normalize,
            trim_applied: options.trim_silence,
            ..PipelineMetrics::default()
        };

        let preprocess_start = Instant::now();
        let mut processed = signal.samples.clone();
        if options.normalize {
            processed = dsp::normalize_peak(&processed);
        }
        if options.trim_silence {
            processed = dsp::trim_silence(&processed, options.silence_threshold);
        }
        metrics.processed_samples = processed.len();
        metrics.preprocess_ms = preprocess_start.elapsed().as_millis() as u64;

        let frames = dsp::split_into_frames(
            &processed,
            self.config.frame_length,
            self.config.hop_length,
        );
        metrics.frames_total = frames.len();
        debug!(
            input_samples = metrics.input_samples,
            processed_samples = metrics.processed_samples,
            frames = frames.len(),
            transform = self.transform.name(),
            "framed signal"
        );

        let transform_start = Instant::now();
        let transformed = self.transform_frames(frames, cancel)?;
        metrics.transform_ms = transform_start.elapsed().as_millis() as u64;

        // The caller gets back a signal of the length it put in, even when
        // trimming shortened what was framed; everything past the last full
        // frame stays silent.
        let reconstruct_start = Instant::now();
        let output = dsp::overlap_add(&transformed, signal.len());
        metrics.reconstruct_ms = reconstruct_start.elapsed().as_millis() as u64;
        metrics.output_samples = output.len();
        debug!(
            frames = metrics.frames_total,
            transform_ms = metrics.transform_ms,
            reconstruct_ms = metrics.reconstruct_ms,
            "invocation complete"
        );

        Ok(PipelineOutput {
            signal: SignalBuffer::new(output, signal.sample_rate),
            metrics,
        })
    }

    /// Parallel map over the frames, then re-pair outputs with their source
    /// offsets in original order.
    fn transform_frames(
        &self,
        frames: Vec<dsp::Frame>,
        cancel: &AtomicBool,
    ) -> Result<Vec<(usize, Vec<f32>)>, PipelineError> {
        if cancel.load(Ordering::Relaxed) {
            return Err(PipelineError::Cancelled);
        }
        if frames.is_empty() {
            return Ok(Vec::new());
        }

        let total = frames.len();
        let workers = self.workers.min(total);
        let frame_length = self.config.frame_length;
        let transform: &dyn FrameTransform = self.transform.as_ref();
        // A worker flips this on the first failure so siblings stop pulling
        // work; the caller's flag stays untouched.
        let abort = AtomicBool::new(false);

        thread::scope(|scope| {
            let (work_tx, work_rx) = crossbeam_channel::bounded::<(usize, dsp::Frame)>(total);
            let (result_tx, result_rx) =
                crossbeam_channel::bounded::<(usize, Result<(usize, Vec<f32>), PipelineError>)>(
                    total,
                );
            for item in frames.into_iter().enumerate() {
                // Cannot fail: the channel holds every frame.
                let _ = work_tx.send(item);
            }
            drop(work_tx);

            let abort = &abort;
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok((idx, frame)) = work_rx.recv() {
                        if cancel.load(Ordering::Relaxed) || abort.load(Ordering::Relaxed) {
                            break;
                        }
                        let outcome = run_transform(transform, frame_length, idx, frame);
                        if outcome.is_err() {
                            abort.store(true, Ordering::Relaxed);
                        }
                        if result_tx.send((idx, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            let mut results: Vec<Option<(usize, Vec<f32>)>> = vec![None; total];
            let mut first_error = None;
            for (idx, outcome) in result_rx {
                match outcome {
                    Ok(pair) => results[idx] = Some(pair),
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }

            if let Some(err) = first_error {
                return Err(err);
            }
            if cancel.load(Ordering::Relaxed) {
                return Err(PipelineError::Cancelled);
            }
            // Every slot must be filled by now; a hole means a worker bailed
            // out between our cancel check and its own.
            results
                .into_iter()
                .map(|slot| slot.ok_or(PipelineError::Cancelled))
                .collect()
        })
    }
}

fn run_transform(
    transform: &dyn FrameTransform,
    frame_length: usize,
    idx: usize,
    frame: dsp::Frame,
) -> Result<(usize, Vec<f32>), PipelineError> {
    let out = transform
        .transform(&frame.samples)
        .map_err(|err| PipelineError::Inference {
            frame: idx,
            message: format!("{err:#}"),
        })?;
    if out.len() != frame_length {
        return Err(PipelineError::LengthMismatch {
            frame: idx,
            expected: frame_length,
            got: out.len(),
        });
    }
    Ok((frame.start, out))
}

/// Handle the caller uses to poll a background invocation.
pub struct PipelineJob {
    pub receiver: mpsc::Receiver<PipelineJobMessage>,
    pub handle: Option<thread::JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
}

impl PipelineJob {
    /// Abandon pending and in-flight frame transforms. The job still delivers
    /// exactly one message ([`PipelineJobMessage::Cancelled`] unless it had
    /// already finished).
    pub fn cancel(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

/// Terminal message sent once per background invocation.
#[derive(Debug)]
pub enum PipelineJobMessage {
    Completed(Box<PipelineOutput>),
    Cancelled,
    Failed(String),
}

/// Run an invocation on a worker thread and report back over a channel, so a
/// caller with a UI loop can keep polling.
pub fn start_pipeline_job(
    pipeline: Arc<Pipeline>,
    signal: SignalBuffer,
    options: ProcessingOptions,
) -> PipelineJob {
    let (tx, rx) = mpsc::sync_channel(1);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();

    let handle = thread::spawn(move || {
        let message = match pipeline.process_with_cancel(&signal, &options, &stop_flag_clone) {
            Ok(output) => PipelineJobMessage::Completed(Box::new(output)),
            Err(PipelineError::Cancelled) => PipelineJobMessage::Cancelled,
            Err(err) => PipelineJobMessage::Failed(err.to_string()),
        };
        let _ = tx.send(message);
    });

    PipelineJob {
        receiver: rx,
        handle: Some(handle),
        stop_flag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{GainTransform, PassthroughTransform};
    use anyhow::anyhow;

    fn config(frame_length: usize, hop_length: usize) -> ModelConfig {
        ModelConfig {
            frame_length,
            hop_length,
            sampling_rate: 16_000,
        }
    }

    fn sine(len: usize) -> SignalBuffer {
        let samples = (0..len).map(|i| (i as f32 * 0.31).sin() * 0.8).collect();
        SignalBuffer::new(samples, 16_000)
    }

    fn passthrough_pipeline(frame_length: usize, hop_length: usize) -> Pipeline {
        Pipeline::new(config(frame_length, hop_length), Arc::new(PassthroughTransform))
            .expect("valid config")
    }

    #[test]
    fn passthrough_reproduces_the_covered_signal() {
        let pipeline = passthrough_pipeline(8, 2);
        let signal = sine(64);
        let out = pipeline
            .process(&signal, &ProcessingOptions::default())
            .expect("process");
        assert_eq!(out.signal.len(), signal.len());
        for (i, (a, b)) in out.signal.samples.iter().zip(&signal.samples).enumerate() {
            assert!((a - b).abs() < 1e-5, "sample {i}: got {a}, expected {b}");
        }
        assert_eq!(out.metrics.frames_total, 29); // (64 - 8) / 2 + 1
        assert_eq!(out.metrics.input_samples, 64);
        assert_eq!(out.metrics.output_samples, 64);
    }

    #[test]
    fn reference_scenario_round_trips() {
        let pipeline = passthrough_pipeline(2, 1).with_workers(1);
        let signal = SignalBuffer::new(vec![0.5, -0.5, 0.25, -0.25], 16_000);
        let out = pipeline
            .process(&signal, &ProcessingOptions::default())
            .expect("process");
        for (a, b) in out.signal.samples.iter().zip(&signal.samples) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn gain_is_applied_per_frame() {
        let pipeline = Pipeline::new(config(4, 4), Arc::new(GainTransform::new(0.5)))
            .expect("valid config");
        let signal = SignalBuffer::new(vec![0.8; 8], 16_000);
        let out = pipeline
            .process(&signal, &ProcessingOptions::default())
            .expect("process");
        for sample in &out.signal.samples {
            assert!((sample - 0.4).abs() < 1e-6);
        }
    }

    #[test]
    fn signal_shorter_than_a_frame_comes_back_silent() {
        let pipeline = passthrough_pipeline(16, 4);
        let signal = SignalBuffer::new(vec![0.5; 7], 16_000);
        let out = pipeline
            .process(&signal, &ProcessingOptions::default())
            .expect("process");
        assert_eq!(out.metrics.frames_total, 0);
        assert_eq!(out.signal.samples, vec![0.0; 7]);
    }

    #[test]
    fn empty_signal_is_rejected() {
        let pipeline = passthrough_pipeline(8, 4);
        let signal = SignalBuffer::new(Vec::new(), 16_000);
        let result = pipeline.process(&signal, &ProcessingOptions::default());
        assert!(matches!(result, Err(PipelineError::EmptySignal)));
    }

    #[test]
    fn zero_rate_signal_is_rejected() {
        let pipeline = passthrough_pipeline(8, 4);
        let signal = SignalBuffer::new(vec![0.1; 16], 0);
        let result = pipeline.process(&signal, &ProcessingOptions::default());
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn invalid_geometry_is_rejected_at_construction() {
        let result = Pipeline::new(config(0, 4), Arc::new(PassthroughTransform));
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn normalization_and_trimming_feed_the_framer() {
        let pipeline = passthrough_pipeline(2, 1);
        let mut samples = vec![0.001f32; 4];
        samples.extend([0.5, -0.25, 0.5, -0.25]);
        samples.extend(vec![0.001f32; 4]);
        let signal = SignalBuffer::new(samples, 16_000);
        let options = ProcessingOptions {
            normalize: true,
            trim_silence: true,
            ..ProcessingOptions::default()
        };
        let out = pipeline.process(&signal, &options).expect("process");
        // Normalized peak is 1.0 and trimming moved the loud span to the
        // front; output keeps the original length with a silent tail.
        assert_eq!(out.metrics.processed_samples, 4);
        assert_eq!(out.signal.len(), signal.len());
        assert!((out.signal.samples[0] - 1.0).abs() < 1e-6);
        assert!(out.signal.samples[6..].iter().all(|s| *s == 0.0));
    }

    struct FailingTransform;

    impl FrameTransform for FailingTransform {
        fn transform(&self, _frame: &[f32]) -> anyhow::Result<Vec<f32>> {
            Err(anyhow!("model exploded"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn transform_failure_aborts_the_invocation() {
        let pipeline =
            Pipeline::new(config(4, 2), Arc::new(FailingTransform)).expect("valid config");
        let result = pipeline.process(&sine(32), &ProcessingOptions::default());
        match result {
            Err(PipelineError::Inference { message, .. }) => {
                assert!(message.contains("model exploded"), "got: {message}");
            }
            other => panic!("expected inference error, got {other:?}"),
        }
    }

    struct WrongLengthTransform;

    impl FrameTransform for WrongLengthTransform {
        fn transform(&self, frame: &[f32]) -> anyhow::Result<Vec<f32>> {
            Ok(frame[..frame.len() / 2].to_vec())
        }
    }

    #[test]
    fn wrong_length_output_is_rejected() {
        let pipeline =
            Pipeline::new(config(4, 4), Arc::new(WrongLengthTransform)).expect("valid config");
        let result = pipeline.process(&sine(16), &ProcessingOptions::default());
        assert!(matches!(
            result,
            Err(PipelineError::LengthMismatch {
                expected: 4,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn cancel_before_dispatch_reports_cancelled() {
        let pipeline = passthrough_pipeline(4, 2);
        let cancel = AtomicBool::new(true);
        let result =
            pipeline.process_with_cancel(&sine(32), &ProcessingOptions::default(), &cancel);
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    /// Blocks every frame until released, so tests can cancel a job while its
    /// first frame is still in flight.
    struct GatedTransform {
        release: Arc<AtomicBool>,
    }

    impl FrameTransform for GatedTransform {
        fn transform(&self, frame: &[f32]) -> anyhow::Result<Vec<f32>> {
            while !self.release.load(Ordering::Relaxed) {
                thread::yield_now();
            }
            Ok(frame.to_vec())
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    #[test]
    fn background_job_can_be_cancelled() {
        let release = Arc::new(AtomicBool::new(false));
        let transform = Arc::new(GatedTransform {
            release: release.clone(),
        });
        let pipeline =
            Arc::new(Pipeline::new(config(4, 4), transform).expect("valid config").with_workers(1));
        let job = start_pipeline_job(pipeline, sine(32), ProcessingOptions::default());

        job.cancel();
        release.store(true, Ordering::Relaxed);

        match job.receiver.recv().expect("job message") {
            PipelineJobMessage::Cancelled => {}
            other => panic!("expected cancellation, got {other:?}"),
        }
        if let Some(handle) = job.handle {
            handle.join().expect("worker thread");
        }
    }

    #[test]
    fn background_job_delivers_completion() {
        let pipeline = Arc::new(passthrough_pipeline(8, 4));
        let job = start_pipeline_job(pipeline, sine(64), ProcessingOptions::default());
        match job.receiver.recv().expect("job message") {
            PipelineJobMessage::Completed(output) => {
                assert_eq!(output.signal.len(), 64);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn background_job_surfaces_failures() {
        let pipeline =
            Arc::new(Pipeline::new(config(4, 2), Arc::new(FailingTransform)).expect("valid config"));
        let job = start_pipeline_job(pipeline, sine(32), ProcessingOptions::default());
        match job.receiver.recv().expect("job message") {
            PipelineJobMessage::Failed(message) => {
                assert!(message.contains("model exploded"), "got: {message}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
