use std::time::Duration;

/// Output target selected by the `device` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// ALSA PCM device name (e.g. "default", "plughw:0,0")
    Alsa(String),
    /// Raw dump of every chunk to a file
    File(String),
    /// Length-prefixed chunks written to a file or character device
    Framed(String),
}

impl OutputTarget {
    pub fn parse(value: &str) -> Self {
        if let Some(path) = value.strip_prefix("file:") {
            OutputTarget::File(path.to_string())
        } else if let Some(path) = value.strip_prefix("framed:") {
            OutputTarget::Framed(path.to_string())
        } else {
            OutputTarget::Alsa(value.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // HTTP 配置
    pub connect_timeout: Duration,
    pub response_grace: Duration,
    pub header_limit: usize,
    pub default_port: u16,

    // 播放配置
    pub chunk_size: usize,
    pub buffer_threshold_percent: u8,
    pub flush_partial: bool,
    pub strict_wav: bool,

    // 输出配置
    pub output: OutputTarget,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            connect_timeout: Duration::from_secs(
                env!("HTTP_CONNECT_TIMEOUT_SECS")
                    .parse()
                    .map_err(|_| "Failed to parse HTTP_CONNECT_TIMEOUT_SECS")?,
            ),
            response_grace: Duration::from_millis(
                env!("HTTP_RESPONSE_GRACE_MS")
                    .parse()
                    .map_err(|_| "Failed to parse HTTP_RESPONSE_GRACE_MS")?,
            ),
            header_limit: env!("HTTP_HEADER_LIMIT").parse()
                .map_err(|_| "Failed to parse HTTP_HEADER_LIMIT")?,
            default_port: env!("HTTP_DEFAULT_PORT").parse()
                .map_err(|_| "Failed to parse HTTP_DEFAULT_PORT")?,

            chunk_size: env!("PLAYBACK_CHUNK_SIZE").parse()
                .map_err(|_| "Failed to parse PLAYBACK_CHUNK_SIZE")?,
            buffer_threshold_percent: env!("PLAYBACK_BUFFER_THRESHOLD_PERCENT").parse()
                .map_err(|_| "Failed to parse PLAYBACK_BUFFER_THRESHOLD_PERCENT")?,
            flush_partial: env!("PLAYBACK_FLUSH_PARTIAL").parse()
                .map_err(|_| "Failed to parse PLAYBACK_FLUSH_PARTIAL")?,
            strict_wav: env!("PLAYBACK_STRICT_WAV").parse()
                .map_err(|_| "Failed to parse PLAYBACK_STRICT_WAV")?,

            output: OutputTarget::parse(env!("OUTPUT_DEVICE")),
        })
    }
}

impl Default for Config {
    /// Built-in fallback matching the shipped config.toml.
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            response_grace: Duration::from_millis(100),
            header_limit: 256,
            default_port: 80,
            chunk_size: 1024,
            buffer_threshold_percent: 98,
            flush_partial: false,
            strict_wav: false,
            output: OutputTarget::Alsa("default".to_string()),
        }
    }
}
