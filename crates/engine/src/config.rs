//! Engine configuration from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::use_cases::{ChallengeSettings, CooldownDurations};

const DEFAULT_DATABASE_URL: &str = "sqlite:tidewatch.db?mode=rwc";
const DEFAULT_TOKEN_AUDIENCE: &str = "tidewatch";
const DEFAULT_FISH_STORAGE_LIMIT: u64 = 1_000;
const DEFAULT_SPAWN_WINDOW: Duration = Duration::from_millis(1_500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Origins allowed for CORS and WebSocket upgrades. Empty allows any.
    pub allowed_origins: Vec<String>,
    /// HS256 secret for identity tokens. Without one every join is refused.
    pub token_secret: Option<String>,
    pub token_audience: String,
    pub cooldowns: CooldownDurations,
    pub challenge: ChallengeSettings,
    pub fish_storage_limit: u64,
    pub spawn_window: Duration,
    /// Amber spent by a player summon.
    pub raid_summon_cost: u64,
    pub raid_schedule_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            allowed_origins: Vec::new(),
            token_secret: None,
            token_audience: DEFAULT_TOKEN_AUDIENCE.to_string(),
            cooldowns: CooldownDurations::default(),
            challenge: ChallengeSettings::default(),
            fish_storage_limit: DEFAULT_FISH_STORAGE_LIMIT,
            spawn_window: DEFAULT_SPAWN_WINDOW,
            raid_summon_cost: 0,
            raid_schedule_enabled: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take their defaults; values
    /// that do not parse are logged and also take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let cooldowns = CooldownDurations {
            fishing_base: millis(&get, "FISHING_COOLDOWN_BASE_MS", defaults.cooldowns.fishing_base),
            fishing_reduction: millis(
                &get,
                "FISHING_COOLDOWN_REDUCTION_MS",
                defaults.cooldowns.fishing_reduction,
            ),
            exploration: millis(&get, "EXPLORATION_COOLDOWN_MS", defaults.cooldowns.exploration),
            raid: millis(&get, "RAID_ATTACK_COOLDOWN_MS", defaults.cooldowns.raid),
        };

        let challenge = ChallengeSettings {
            timeout: Duration::from_secs(parsed(
                &get,
                "CHALLENGE_TIMEOUT_SECS",
                defaults.challenge.timeout.as_secs(),
            )),
            probability_percent: parsed(
                &get,
                "CHALLENGE_PROBABILITY_PERCENT",
                defaults.challenge.probability_percent,
            )
            .min(100),
        };

        let server_port = match get("SERVER_PORT").or_else(|| get("PORT")) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid SERVER_PORT, using default");
                defaults.server_port
            }),
            None => defaults.server_port,
        };

        Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            allowed_origins: get("ALLOWED_ORIGIN")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            token_secret: get("TOKEN_SECRET"),
            token_audience: get("TOKEN_AUDIENCE").unwrap_or(defaults.token_audience),
            cooldowns,
            challenge,
            fish_storage_limit: parsed(&get, "FISH_STORAGE_LIMIT", defaults.fish_storage_limit),
            spawn_window: millis(&get, "SPAWN_WINDOW_MS", defaults.spawn_window),
            raid_summon_cost: parsed(&get, "RAID_SUMMON_COST", defaults.raid_summon_cost),
            raid_schedule_enabled: parsed(
                &get,
                "RAID_SCHEDULE_ENABLED",
                defaults.raid_schedule_enabled,
            ),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// `*` means any origin, same as leaving the variable unset.
fn parse_origins(raw: &str) -> Vec<String> {
    if raw == "*" {
        return Vec::new();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(variable = key, value = %raw, "Invalid configuration value, using default");
            default
        }),
        None => default,
    }
}

fn millis(get: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(parsed(get, key, default_ms))
}
