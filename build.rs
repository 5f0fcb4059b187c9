use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    http: Http,
    playback: Playback,
    output: Output,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Http {
    connect_timeout_secs: u64,
    response_grace_ms: u64,
    header_limit: usize,
    default_port: u16,
}

#[derive(Deserialize)]
struct Playback {
    chunk_size: usize,
    buffer_threshold_percent: u8,
    flush_partial: bool,
    strict_wav: bool,
}

#[derive(Deserialize)]
struct Output {
    device: String,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    // 应用信息
    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // HTTP 配置
    println!("cargo:rustc-env=HTTP_CONNECT_TIMEOUT_SECS={}", config.http.connect_timeout_secs);
    println!("cargo:rustc-env=HTTP_RESPONSE_GRACE_MS={}", config.http.response_grace_ms);
    println!("cargo:rustc-env=HTTP_HEADER_LIMIT={}", config.http.header_limit);
    println!("cargo:rustc-env=HTTP_DEFAULT_PORT={}", config.http.default_port);

    // 播放配置
    println!("cargo:rustc-env=PLAYBACK_CHUNK_SIZE={}", config.playback.chunk_size);
    println!(
        "cargo:rustc-env=PLAYBACK_BUFFER_THRESHOLD_PERCENT={}",
        config.playback.buffer_threshold_percent
    );
    println!("cargo:rustc-env=PLAYBACK_FLUSH_PARTIAL={}", config.playback.flush_partial);
    println!("cargo:rustc-env=PLAYBACK_STRICT_WAV={}", config.playback.strict_wav);

    // 输出配置
    println!("cargo:rustc-env=OUTPUT_DEVICE={}", config.output.device);
}
