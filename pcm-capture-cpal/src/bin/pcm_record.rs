//! pcm-record: capture raw PCM from a microphone for a fixed duration.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use pcm_capture_core::storage::metadata;
use pcm_capture_core::{
    CaptureError, CapturePipeline, ChannelLayout, DeferredStop, RecordingConfig,
    RecordingMetadata, SampleFormat,
};
use pcm_capture_cpal::{CpalBackend, DeviceEnumerator};

#[derive(Parser, Debug)]
#[command(name = "pcm-record")]
#[command(about = "Record headerless PCM audio from an input device")]
#[command(version)]
struct Cli {
    /// Output file (raw little-endian PCM, no header)
    #[arg(required_unless_present = "list_devices")]
    output: Option<PathBuf>,

    /// Stop recording after this many milliseconds
    #[arg(short, long, default_value_t = 8000)]
    duration_ms: u64,

    #[arg(short = 'r', long, default_value_t = 44100)]
    sample_rate: u32,

    #[arg(short, long, value_enum, default_value_t = ChannelsArg::Mono)]
    channels: ChannelsArg,

    #[arg(short, long, value_enum, default_value_t = FormatArg::S16)]
    format: FormatArg,

    /// Transfer chunk size as a multiple of the driver minimum
    #[arg(long, default_value_t = 2)]
    safety_factor: u32,

    /// Input device name (default device if omitted)
    #[arg(long)]
    device: Option<String>,

    /// Skip writing the <OUTPUT>.metadata.json sidecar
    #[arg(long)]
    no_metadata: bool,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ChannelsArg {
    Mono,
    Stereo,
}

impl From<ChannelsArg> for ChannelLayout {
    fn from(arg: ChannelsArg) -> Self {
        match arg {
            ChannelsArg::Mono => ChannelLayout::Mono,
            ChannelsArg::Stereo => ChannelLayout::Stereo,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    S16,
    S24,
    S32,
}

impl From<FormatArg> for SampleFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::S16 => SampleFormat::S16Le,
            FormatArg::S24 => SampleFormat::S24Le,
            FormatArg::S32 => SampleFormat::S32Le,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pcm-record: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CaptureError> {
    if cli.list_devices {
        return list_devices();
    }
    let Some(output) = cli.output else {
        return Err(CaptureError::Io("no output file given".into()));
    };

    let config = RecordingConfig {
        sample_rate_hz: cli.sample_rate,
        channel_layout: cli.channels.into(),
        sample_format: cli.format.into(),
        safety_factor: cli.safety_factor,
    };
    let backend = match cli.device {
        Some(name) => CpalBackend::with_device(name),
        None => CpalBackend::default_device(),
    };

    let mut pipeline = CapturePipeline::new(backend);
    pipeline.start(config, &output)?;
    log::info!("Recording to {} for {} ms", output.display(), cli.duration_ms);

    let duration = Duration::from_millis(cli.duration_ms);
    let timer = DeferredStop::schedule(pipeline.stop_handle(), duration)?;
    let result = pipeline.join();
    timer.cancel();
    let summary = result?;

    println!(
        "Wrote {} bytes ({:.2} s, {} cycles, {} short reads) to {}",
        summary.bytes_written,
        summary.duration_secs(),
        summary.cycles,
        summary.short_reads,
        summary.file_path.display()
    );
    println!("sha256 {}", summary.checksum);

    if !cli.no_metadata {
        let recording_metadata = RecordingMetadata::from_summary(&summary);
        let sidecar = metadata::write_metadata(&recording_metadata, &output)?;
        println!("Metadata written to {}", sidecar.display());
    }
    Ok(())
}

fn list_devices() -> Result<(), CaptureError> {
    let devices = DeviceEnumerator::new().list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
    }
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("{}{}", device.name, marker);
    }
    Ok(())
}
