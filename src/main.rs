mod audio;
mod cancel;
mod config;
mod error;
mod format;
mod player;
mod source;

use std::process::ExitCode;

use clap::Parser;

use audio::StreamEnd;
use cancel::CancellationToken;
use config::{Config, OutputTarget};

/// Stream a WAV or MP3 file, or an http:// URL, to an audio output.
#[derive(Debug, Parser)]
#[command(name = env!("APP_NAME"), version = env!("APP_VERSION"))]
struct Args {
    /// Local path or http://host[:port]/path URL
    input: String,

    /// ALSA device name, file:<path> for a raw dump, or framed:<path> for a chunk device
    #[arg(long)]
    output: Option<String>,

    /// Transfer chunk size in bytes
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Write the short final chunk instead of dropping it
    #[arg(long)]
    flush_partial: bool,

    /// Require RIFF/WAVE magic in .wav input
    #[arg(long)]
    strict_wav: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output = OutputTarget::parse(output);
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        config.flush_partial |= self.flush_partial;
        config.strict_wav |= self.strict_wav;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // 加载配置
    let mut config = Config::new().unwrap_or_else(|e| {
        log::warn!("{}, using built-in defaults", e);
        Config::default()
    });
    args.apply(&mut config);

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = cancel::watch_signals(token).await {
                log::error!("Signal watcher failed: {}", e);
            }
        });
    }

    // 播放在阻塞线程中顺序执行，不占用异步运行时
    let input = args.input.clone();
    let result = tokio::task::spawn_blocking(move || player::play(&input, &config, &token)).await;

    match result {
        Ok(Ok(report)) => {
            if let StreamEnd::ReadError(e) = &report.end {
                log::warn!("Stream ended early: {}", e);
            }
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            log::error!("{}: {}", args.input, e);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            log::error!("Playback task failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
