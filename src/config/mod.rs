use serde::Deserialize;
use std::collections::BTreeMap;

/// Broker endpoint for the message bus
///
/// Immutable after process start. Credentials come from configuration or
/// environment, never from source.
#[derive(Clone, Debug, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Keep-alive ping interval in seconds
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_broker_port() -> u16 {
    4222
}

fn default_keepalive_secs() -> u64 {
    60
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            username: String::new(),
            password: String::new(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

impl BrokerConfig {
    /// Bus address in URL form
    pub fn url(&self) -> String {
        format!("nats://{}:{}", self.host, self.port)
    }

    /// Apply environment overrides (secrets and deploy-varying values)
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PULSE_BROKER_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("PULSE_BROKER_PORT") {
            if let Ok(p) = v.parse::<u16>() {
                self.port = p;
            }
        }
        if let Ok(v) = std::env::var("PULSE_BROKER_USERNAME") {
            self.username = v;
        }
        if let Ok(v) = std::env::var("PULSE_BROKER_PASSWORD") {
            self.password = v;
        }
    }
}

/// Topic names forming the pipeline
///
/// Each stage publishes on the next stage's work topic; the final scores
/// topic is consumed by the operator service.
#[derive(Clone, Debug, Deserialize)]
pub struct TopicsConfig {
    #[serde(default = "default_stats_work_topic")]
    pub stats_work: String,
    #[serde(default = "default_sentiment_work_topic")]
    pub sentiment_work: String,
    #[serde(default = "default_scores_topic")]
    pub scores: String,
    #[serde(default = "default_intake_topic")]
    pub intake: String,
}

fn default_stats_work_topic() -> String {
    "pulse.work.stats".to_string()
}

fn default_sentiment_work_topic() -> String {
    "pulse.work.sentiment".to_string()
}

fn default_scores_topic() -> String {
    "pulse.scores".to_string()
}

fn default_intake_topic() -> String {
    "pulse.intake".to_string()
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            stats_work: default_stats_work_topic(),
            sentiment_work: default_sentiment_work_topic(),
            scores: default_scores_topic(),
            intake: default_intake_topic(),
        }
    }
}

/// Operator-facing service settings
#[derive(Clone, Debug, Deserialize)]
pub struct OperatorConfig {
    /// The single identity allowed to run privileged commands
    #[serde(default = "default_privileged_user")]
    pub privileged_user: String,
    /// Minimum interval between analysis commands, in seconds
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    /// Symbols the pipeline may be asked to track
    #[serde(default = "default_supported_symbols")]
    pub supported_symbols: Vec<String>,
    /// Directory where workers drop generated artifacts
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_privileged_user() -> String {
    "operator".to_string()
}

fn default_min_interval_secs() -> u64 {
    300
}

fn default_supported_symbols() -> Vec<String> {
    ["BTCUSDT", "ETHUSDT", "BNBUSDT", "ADAUSDT", "SOLUSDT"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_data_dir() -> String {
    "/data".to_string()
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            privileged_user: default_privileged_user(),
            min_interval_secs: default_min_interval_secs(),
            supported_symbols: default_supported_symbols(),
            data_dir: default_data_dir(),
        }
    }
}

impl OperatorConfig {
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PULSE_PRIVILEGED_USER") {
            self.privileged_user = v;
        }
        if let Ok(v) = std::env::var("PULSE_DATA_DIR") {
            self.data_dir = v;
        }
    }
}

/// Market-analysis settings
#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisConfig {
    /// Price increase (percent) that maps to a full-strength signal
    #[serde(default = "default_target_increase_pct")]
    pub target_increase_pct: f64,
    /// Historical window queried per analysis, in hours
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
    /// Candle interval understood by the market data source
    #[serde(default = "default_candle_interval")]
    pub candle_interval: String,
    /// Forecast horizon, in candle steps
    #[serde(default = "default_horizon_steps")]
    pub horizon_steps: usize,
}

fn default_target_increase_pct() -> f64 {
    10.0
}

fn default_lookback_hours() -> i64 {
    6
}

fn default_candle_interval() -> String {
    "5m".to_string()
}

fn default_horizon_steps() -> usize {
    12
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_increase_pct: default_target_increase_pct(),
            lookback_hours: default_lookback_hours(),
            candle_interval: default_candle_interval(),
            horizon_steps: default_horizon_steps(),
        }
    }
}

/// One entry in the command table
#[derive(Clone, Debug, Deserialize)]
pub struct CommandSpec {
    pub description: String,
    #[serde(default)]
    pub privileged: bool,
}

/// Command table: name -> spec. Names must resolve to known commands at
/// startup; see `command::CommandRouter::new`.
pub type CommandsConfig = BTreeMap<String, CommandSpec>;

fn default_commands() -> CommandsConfig {
    fn spec(description: &str, privileged: bool) -> CommandSpec {
        CommandSpec {
            description: description.to_string(),
            privileged,
        }
    }

    BTreeMap::from([
        ("help".to_string(), spec("list available commands", false)),
        (
            "target".to_string(),
            spec("track one or more symbols for analysis", false),
        ),
        (
            "untarget".to_string(),
            spec("stop tracking one or more symbols", false),
        ),
        (
            "setlog".to_string(),
            spec("use this channel for analysis results", true),
        ),
        (
            "clearlog".to_string(),
            spec("stop posting analysis results", true),
        ),
        (
            "analyze".to_string(),
            spec("run the analysis pipeline over tracked symbols", false),
        ),
        (
            "showlast".to_string(),
            spec("post the last generated artifact per tracked symbol", false),
        ),
    ])
}

/// Complete pulse configuration
#[derive(Clone, Debug, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub topics: TopicsConfig,
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default = "default_commands")]
    pub commands: CommandsConfig,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            topics: TopicsConfig::default(),
            operator: OperatorConfig::default(),
            analysis: AnalysisConfig::default(),
            commands: default_commands(),
        }
    }
}

impl PulseConfig {
    /// Load configuration: TOML file named by `PULSE_CONFIG` if set,
    /// defaults otherwise, then environment overrides on top.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("PULSE_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => PulseConfig::default(),
        };
        config.broker.apply_env();
        config.operator.apply_env();
        Ok(config)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &str) -> anyhow::Result<PulseConfig> {
    use anyhow::Context;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path))?;
    let config: PulseConfig =
        toml::from_str(&contents).with_context(|| format!("invalid config file '{}'", path))?;
    Ok(config)
}
