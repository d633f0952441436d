use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use wormhole_core::CodeReusePolicy;
use wormhole_generator::{Alphabet, GeneratorError};
use wormhole_telemetry::LogFormat;

pub const LISTEN_ADDR_ENV: &str = "WORMHOLE_GATEWAY_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "WORMHOLE_PUBLIC_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "WORMHOLE_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "WORMHOLE_MYSQL_DSN";
pub const GENERATOR_ENV: &str = "WORMHOLE_GENERATOR";
pub const CODE_LENGTH_ENV: &str = "WORMHOLE_CODE_LENGTH";
pub const CODE_ALPHABET_ENV: &str = "WORMHOLE_CODE_ALPHABET";
pub const GENERATOR_PREFIX_ENV: &str = "WORMHOLE_GENERATOR_PREFIX";
pub const GENERATOR_OFFSET_ENV: &str = "WORMHOLE_GENERATOR_OFFSET";
pub const MAX_ATTEMPTS_ENV: &str = "WORMHOLE_MAX_ATTEMPTS";
pub const MAX_URL_LENGTH_ENV: &str = "WORMHOLE_MAX_URL_LENGTH";
pub const CODE_REUSE_POLICY_ENV: &str = "WORMHOLE_CODE_REUSE_POLICY";
pub const STORE_TIMEOUT_MS_ENV: &str = "WORMHOLE_STORE_TIMEOUT_MS";
pub const CLICK_QUEUE_CAPACITY_ENV: &str = "WORMHOLE_CLICK_QUEUE_CAPACITY";
pub const CACHE_CAPACITY_ENV: &str = "WORMHOLE_CACHE_CAPACITY";
pub const CACHE_TTL_SECONDS_ENV: &str = "WORMHOLE_CACHE_TTL_SECONDS";
pub const LOG_FORMAT_ENV: &str = "WORMHOLE_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "WORMHOLE_OTLP_ENDPOINT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:8080";
pub const BASE62_KEYWORD: &str = "base62";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorArg {
    Random,
    Seq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReusePolicyArg {
    Reuse,
    Retire,
}

impl From<ReusePolicyArg> for CodeReusePolicy {
    fn from(value: ReusePolicyArg) -> Self {
        match value {
            ReusePolicyArg::Reuse => CodeReusePolicy::Reuse,
            ReusePolicyArg::Retire => CodeReusePolicy::Retire,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// `base62` or a literal list of symbols.
fn parse_alphabet(raw: &str) -> Result<Alphabet, GeneratorError> {
    if raw == BASE62_KEYWORD {
        return Ok(Alphabet::default());
    }
    raw.parse()
}

#[derive(Debug, Parser)]
#[command(name = "wormhole-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Prefix for the `short_url` returned by `POST /shorten`.
    #[arg(long, env = PUBLIC_BASE_URL_ENV, default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = GENERATOR_ENV, value_enum, default_value_t = GeneratorArg::Random)]
    pub generator: GeneratorArg,

    #[arg(long, env = CODE_LENGTH_ENV, default_value_t = 7)]
    pub code_length: usize,

    #[arg(
        long,
        env = CODE_ALPHABET_ENV,
        default_value = BASE62_KEYWORD,
        value_parser = parse_alphabet,
    )]
    pub code_alphabet: Alphabet,

    #[arg(long, env = GENERATOR_PREFIX_ENV, default_value = "")]
    pub generator_prefix: String,

    /// Lowest counter value the `seq` generator may hand out.
    #[arg(long, env = GENERATOR_OFFSET_ENV, default_value_t = 0)]
    pub generator_offset: u64,

    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = 5)]
    pub max_attempts: u32,

    #[arg(long, env = MAX_URL_LENGTH_ENV, default_value_t = 2048)]
    pub max_url_length: usize,

    #[arg(
        long,
        env = CODE_REUSE_POLICY_ENV,
        value_enum,
        default_value_t = ReusePolicyArg::Reuse
    )]
    pub code_reuse_policy: ReusePolicyArg,

    #[arg(long, env = STORE_TIMEOUT_MS_ENV, default_value_t = 2000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = CLICK_QUEUE_CAPACITY_ENV, default_value_t = 10_000)]
    pub click_queue_capacity: usize,

    /// Redirect cache entries; 0 disables the cache.
    #[arg(long, env = CACHE_CAPACITY_ENV, default_value_t = 10_000)]
    pub cache_capacity: u64,

    /// Lifetime of a cached redirect; 0 keeps entries until evicted.
    #[arg(long, env = CACHE_TTL_SECONDS_ENV, default_value_t = 60)]
    pub cache_ttl_seconds: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,
}
