use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use android_audio_oboe::audio::capture::FrameSink;
use android_audio_oboe::audio::playback::{EventSink, PlaybackEvent, SampleSource};
use android_audio_oboe::audio::CapturedFrame;
use android_audio_oboe::config::CaptureConfig;
use android_audio_oboe::BridgeContext;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bridge-diag error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "bridge-diag", about = "Drive the audio bridge engines against real devices")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn execute(self) -> Result<()> {
        let ctx = BridgeContext::new();
        info!("backend: {}", ctx.backend_name());
        match self.command {
            Command::Play(args) => play_command(&ctx, args),
            Command::Record(args) => record_command(&ctx, args),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a 16-bit mono WAV file through the playback engine.
    Play(PlayArgs),
    /// Record from an input device into a 32-bit float WAV file.
    Record(RecordArgs),
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// 16-bit PCM mono WAV file to play.
    #[arg(long)]
    wav: PathBuf,
    /// Give up waiting for the end event after this many milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// Seconds to record.
    #[arg(long, default_value_t = 3)]
    seconds: u64,
    /// Destination WAV file.
    #[arg(long)]
    out: PathBuf,
    /// Requested sample rate in Hz.
    #[arg(long, default_value_t = 48_000)]
    sample_rate: i32,
    /// Frames per callback (0 = stream default).
    #[arg(long, default_value_t = 0)]
    frames_per_callback: i32,
    /// Input device selector (0 = default device).
    #[arg(long, default_value_t = 0)]
    device: i32,
}

fn load_wav(path: &Path) -> Result<Vec<i16>> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 || spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        bail!(
            "expected 16-bit mono PCM, got {} channel(s) {}-bit {:?}",
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        );
    }
    info!("{}: {} Hz", path.display(), spec.sample_rate);
    reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .context("decoding samples")
}

fn play_command(ctx: &BridgeContext, args: PlayArgs) -> Result<()> {
    // The engine borrows the buffer for the rest of the process
    let samples: &'static [i16] = Box::leak(load_wav(&args.wav)?.into_boxed_slice());
    ctx.load_samples(SampleSource::from_static(samples))?;

    let (tx, rx) = mpsc::channel();
    let notifier: EventSink = Box::new(move |event: PlaybackEvent| {
        let _ = tx.send(event);
    });
    ctx.play(Some(notifier))?;

    let deadline = Instant::now() + Duration::from_millis(args.timeout_ms);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(event) => {
                let at = event.timestamp();
                println!("event {} at {}.{:06}", event.code(), at.sec, at.usec);
                if !matches!(event, PlaybackEvent::Started(_)) {
                    break;
                }
            }
            Err(_) => {
                warn!("no end event within {} ms", args.timeout_ms);
                break;
            }
        }
    }

    let stats = ctx.playback().stats()?;
    if let Err(err) = ctx.stop_playback() {
        warn!("stop: {}", err);
    }
    if let Some(stats) = stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}

fn record_command(ctx: &BridgeContext, args: RecordArgs) -> Result<()> {
    ctx.configure_capture(CaptureConfig {
        sample_rate_hz: args.sample_rate,
        frames_per_callback: args.frames_per_callback,
        device_id: args.device,
    })?;

    let (tx, rx) = mpsc::channel::<CapturedFrame>();
    let on_frame: FrameSink = Box::new(move |frame: CapturedFrame| {
        let _ = tx.send(frame);
    });
    ctx.start_capture(on_frame, Some(Box::new(|code: i32| eprintln!("stream closed: {code}"))))?;

    std::thread::sleep(Duration::from_secs(args.seconds));
    let stats = ctx.capture().stats()?;
    ctx.stop_capture()?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: args.sample_rate.max(1) as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&args.out, spec)
        .with_context(|| format!("creating {}", args.out.display()))?;
    let mut written = 0usize;
    for frame in rx.try_iter() {
        for sample in frame.as_slice() {
            writer.write_sample(*sample)?;
        }
        written += frame.len();
    }
    writer.finalize()?;

    println!("wrote {} frames to {}", written, args.out.display());
    if let Some(stats) = stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}
