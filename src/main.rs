//! wavcast: re-broadcast a decoder's PCM output as live WAV over HTTP.
//!
//! Run with:
//!   wavcast --device-name "Living room" --bitrate 320
//!   some-decoder | wavcast --stdin
//!
//! Listen with:
//!   mpv http://localhost:6000/
//!   vlc http://localhost:6000/

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wavcast::source::DecoderProcess;
use wavcast::{
    AudioFormat, AudioSource, BroadcastHub, DecoderConfig, ReadErrorPolicy, ServerConfig,
    Shutdown, SourceConfig, SourceExit, StreamServer,
};

#[derive(Parser, Debug)]
#[command(name = "wavcast", version, about)]
struct Args {
    /// HTTP bind address
    #[arg(long, default_value = "0.0.0.0:6000")]
    bind: SocketAddr,

    /// Read PCM from stdin instead of spawning the decoder
    #[arg(long)]
    stdin: bool,

    /// Decoder executable
    #[arg(long, default_value = "librespot")]
    decoder: PathBuf,

    /// Device name the decoder advertises
    #[arg(long, default_value = "wavcast")]
    device_name: String,

    /// Decoder bitrate in kbit/s
    #[arg(long, default_value_t = 160)]
    bitrate: u32,

    /// Decoder initial volume (0-100)
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    initial_volume: u8,

    /// PCM sample rate in Hz
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,

    /// PCM bits per sample
    #[arg(long, default_value_t = 16)]
    bits: u16,

    /// PCM channel count
    #[arg(long, default_value_t = 2)]
    channels: u16,

    /// Maximum concurrent listeners (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// What to do when reading the PCM input fails: halt or silence
    #[arg(long, default_value = "halt")]
    on_read_error: ReadErrorPolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let format = AudioFormat::new(args.sample_rate, args.bits, args.channels)
        .context("invalid PCM format")?;

    let shutdown = Shutdown::new();
    let hub = Arc::new(BroadcastHub::new(format, shutdown.clone()));

    let source_config = SourceConfig::default().on_read_error(args.on_read_error);
    let mut source = AudioSource::new(Arc::clone(&hub), source_config);

    let mut decoder: Option<DecoderProcess> = None;
    if args.stdin {
        tracing::info!("Reading PCM from stdin");
        source.start(tokio::io::stdin());
    } else {
        let config = DecoderConfig::default()
            .program(args.decoder.as_os_str())
            .device_name(args.device_name.clone())
            .bitrate(args.bitrate)
            .initial_volume(args.initial_volume);

        let mut process = config
            .spawn()
            .with_context(|| format!("failed to start decoder {}", args.decoder.display()))?;
        let stdout = process
            .take_stdout()
            .context("decoder stdout unavailable")?;
        source.start(stdout);
        decoder = Some(process);
    }

    let server_config = ServerConfig::default()
        .bind(args.bind)
        .max_connections(args.max_connections);
    let server = StreamServer::new(server_config, Arc::clone(&hub));
    let mut serving = tokio::spawn(async move { server.run().await });

    let interrupted = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => interrupted.trigger(),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    // The server only returns early if binding fails
    let served = tokio::select! {
        served = &mut serving => Some(served),
        _ = shutdown.wait() => None,
    };

    match source.stop().await {
        Some(SourceExit::ReadFailed(e)) => tracing::error!(error = %e, "Audio input failed"),
        Some(SourceExit::Shutdown) | None => {}
    }

    let served = match served {
        Some(served) => served,
        None => serving.await,
    };

    if let Some(mut process) = decoder {
        if let Err(e) = process.kill().await {
            tracing::warn!(error = %e, "Failed to stop decoder");
        }
    }

    let stats = hub.stats().await;
    tracing::info!(
        chunks = stats.chunks_appended,
        bytes = stats.bytes_appended,
        listeners = stats.total_subscriptions,
        "Shut down"
    );

    served
        .context("server task panicked")?
        .with_context(|| format!("server on {} failed", args.bind))?;
    Ok(())
}
