use std::sync::Arc;
use wavemend::{
    wav, ModelConfig, PassthroughTransform, Pipeline, ProcessingOptions, SignalBuffer,
};

fn config(frame_length: usize, hop_length: usize, sampling_rate: u32) -> ModelConfig {
    ModelConfig {
        frame_length,
        hop_length,
        sampling_rate,
    }
}

fn tone(len: usize, rate: u32) -> SignalBuffer {
    let samples = (0..len)
        .map(|i| (i as f32 * std::f32::consts::TAU * 440.0 / rate as f32).sin() * 0.6)
        .collect();
    SignalBuffer::new(samples, rate)
}

#[test]
fn decode_process_encode_preserves_a_passthrough_tone() {
    let original = tone(2048, 16_000);
    let bytes = wav::encode(&original);

    let decoded = wav::decode(&bytes).expect("decode");
    let pipeline = Pipeline::new(
        config(512, 128, 16_000),
        Arc::new(PassthroughTransform),
    )
    .expect("pipeline");
    let output = pipeline
        .process(&decoded, &ProcessingOptions::default())
        .expect("process");

    assert_eq!(output.signal.len(), original.len());
    assert_eq!(output.signal.sample_rate, 16_000);
    // Fully covered region survives quantization plus the round trip.
    let covered = 512 + ((2048 - 512) / 128) * 128;
    for (i, (a, b)) in output
        .signal
        .samples
        .iter()
        .zip(&original.samples)
        .take(covered)
        .enumerate()
    {
        assert!((a - b).abs() < 2e-3, "sample {i}: got {a}, expected {b}");
    }

    let reencoded = wav::encode(&output.signal);
    let final_signal = wav::decode(&reencoded).expect("decode output");
    assert_eq!(final_signal.len(), original.len());
}

#[test]
fn preprocessing_runs_end_to_end() {
    let rate = 16_000;
    let mut samples = vec![0.002f32; 300];
    samples.extend(tone(1024, rate).samples.iter().map(|s| s * 0.5));
    samples.extend(vec![0.002f32; 300]);
    let signal = SignalBuffer::new(samples, rate);

    let pipeline =
        Pipeline::new(config(256, 64, rate), Arc::new(PassthroughTransform)).expect("pipeline");
    let options = ProcessingOptions {
        normalize: true,
        trim_silence: true,
        ..ProcessingOptions::default()
    };
    let output = pipeline.process(&signal, &options).expect("process");

    assert_eq!(output.signal.len(), signal.len());
    // Trimming strips the padded silence, and may shave near-zero samples at
    // the edges of the tone itself.
    assert!(
        output.metrics.processed_samples <= 1024 && output.metrics.processed_samples > 1000,
        "processed {} samples",
        output.metrics.processed_samples
    );
    assert!(output.metrics.normalize_applied);
    assert!(output.metrics.trim_applied);
    // Normalization lifts the attenuated tone back toward a unit peak.
    let peak = output
        .signal
        .samples
        .iter()
        .fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!(peak > 0.99 && peak <= 1.0 + 1e-4, "peak was {peak}");

    let bytes = wav::encode(&output.signal);
    let decoded = wav::decode(&bytes).expect("decode");
    assert_eq!(decoded.len(), signal.len());
}
