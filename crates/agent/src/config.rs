use std::fmt;
use std::path::PathBuf;

use edgeguard_cloudflare::api::DEFAULT_API_BASE;
use edgeguard_cloudflare::security_level::SECURITY_LEVEL_SETTING;
use edgeguard_cloudflare::zone::ZoneRef;
use edgeguard_core::error::CoreError;
use edgeguard_core::posture::{Posture, PostureControl};
use edgeguard_core::thresholds::Thresholds;

use crate::process::is_safe_pattern;

/// Default load-average source on Linux.
pub const DEFAULT_LOADAVG_PATH: &str = "/proc/loadavg";

const DEFAULT_MAX_LOAD: f64 = 4.5;
const DEFAULT_MIN_LOAD: f64 = 1.0;

/// Invalid or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Which Cloudflare setting the run governs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    SecurityLevel { setting_id: String },
    Rule { ruleset_id: String, rule_id: String },
}

/// Connection details for the Cloudflare API.
#[derive(Clone)]
pub struct CloudflareConfig {
    pub api_token: String,
    pub api_base: String,
    pub zone: ZoneRef,
    pub target: RemoteTarget,
}

impl fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareConfig")
            .field("api_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("zone", &self.zone)
            .field("target", &self.target)
            .finish()
    }
}

/// Where the health probes read from.
#[derive(Clone)]
pub struct SignalConfig {
    pub loadavg_path: PathBuf,
    /// `None` skips the database probe.
    pub database_url: Option<String>,
    /// `pgrep -f` pattern; `None` skips the worker-process probe.
    pub worker_pattern: Option<String>,
}

impl fmt::Debug for SignalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalConfig")
            .field("loadavg_path", &self.loadavg_path)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("worker_pattern", &self.worker_pattern)
            .finish()
    }
}

/// Everything one run needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub control: PostureControl,
    pub thresholds: Thresholds,
    pub cloudflare: CloudflareConfig,
    pub signals: SignalConfig,
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                  | Default                   |
    /// |--------------------------|---------------------------|
    /// | `CLOUDFLARE_API_TOKEN`   | required                  |
    /// | `CLOUDFLARE_ZONE_ID`     | this or `CLOUDFLARE_DOMAIN` |
    /// | `CLOUDFLARE_DOMAIN`      | this or `CLOUDFLARE_ZONE_ID` |
    /// | `CLOUDFLARE_API_BASE`    | Cloudflare v4 endpoint    |
    /// | `POSTURE_CONTROL`        | `security_level`          |
    /// | `CLOUDFLARE_SETTING_ID`  | `security_level`          |
    /// | `CLOUDFLARE_RULESET_ID`  | required for `rule`       |
    /// | `CLOUDFLARE_RULE_ID`     | required for `rule`       |
    /// | `DEFAULT_POSTURE`        | `medium` / `disabled`     |
    /// | `LOCKDOWN_POSTURE`       | `under_attack` / `enabled`|
    /// | `MAX_LOAD`               | `4.5`                     |
    /// | `MIN_LOAD`               | `1.0`                     |
    /// | `MIN_FREE_BYTES`         | unset                     |
    /// | `MAX_WORKER_PROCESSES`   | unset                     |
    /// | `WORKER_PROCESS_PATTERN` | unset                     |
    /// | `DATABASE_URL`           | unset                     |
    /// | `LOADAVG_PATH`           | `/proc/loadavg`           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let control = match vars.get("POSTURE_CONTROL") {
            Some(name) => PostureControl::parse(&name)?,
            None => PostureControl::SecurityLevel,
        };

        let thresholds = load_thresholds(&vars, control)?;
        let cloudflare = load_cloudflare(&vars, control)?;
        let signals = load_signals(&vars)?;

        if thresholds.max_worker_processes().is_some() != signals.worker_pattern.is_some() {
            return Err(ConfigError::Invalid {
                var: "MAX_WORKER_PROCESSES",
                reason: "MAX_WORKER_PROCESSES and WORKER_PROCESS_PATTERN must be set together"
                    .into(),
            });
        }

        Ok(Self {
            control,
            thresholds,
            cloudflare,
            signals,
        })
    }
}

fn load_thresholds<F>(vars: &Vars<F>, control: PostureControl) -> Result<Thresholds, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (default_relaxed, default_lockdown) = control.default_postures();
    let relaxed = vars
        .get("DEFAULT_POSTURE")
        .map(Posture::new)
        .unwrap_or(default_relaxed);
    let lockdown = vars
        .get("LOCKDOWN_POSTURE")
        .map(Posture::new)
        .unwrap_or(default_lockdown);

    let max_load = vars.parse("MAX_LOAD")?.unwrap_or(DEFAULT_MAX_LOAD);
    let min_load = vars.parse("MIN_LOAD")?.unwrap_or(DEFAULT_MIN_LOAD);

    let mut thresholds = Thresholds::new(max_load, min_load, relaxed, lockdown)?;
    thresholds.validate_for(control)?;

    if let Some(bytes) = vars.parse::<u64>("MIN_FREE_BYTES")? {
        thresholds = thresholds.with_min_free_bytes(bytes);
    }
    if let Some(count) = vars.parse::<u32>("MAX_WORKER_PROCESSES")? {
        thresholds = thresholds.with_max_worker_processes(count);
    }
    Ok(thresholds)
}

fn load_cloudflare<F>(
    vars: &Vars<F>,
    control: PostureControl,
) -> Result<CloudflareConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_token = vars.require("CLOUDFLARE_API_TOKEN")?;
    let api_base = vars
        .get("CLOUDFLARE_API_BASE")
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    let zone = match (vars.get("CLOUDFLARE_ZONE_ID"), vars.get("CLOUDFLARE_DOMAIN")) {
        (Some(id), _) => ZoneRef::Id(id),
        (None, Some(domain)) => ZoneRef::Domain(domain),
        (None, None) => return Err(ConfigError::Missing("CLOUDFLARE_ZONE_ID or CLOUDFLARE_DOMAIN")),
    };

    let target = match control {
        PostureControl::SecurityLevel => RemoteTarget::SecurityLevel {
            setting_id: vars
                .get("CLOUDFLARE_SETTING_ID")
                .unwrap_or_else(|| SECURITY_LEVEL_SETTING.to_string()),
        },
        PostureControl::Rule => RemoteTarget::Rule {
            ruleset_id: vars.require("CLOUDFLARE_RULESET_ID")?,
            rule_id: vars.require("CLOUDFLARE_RULE_ID")?,
        },
    };

    Ok(CloudflareConfig {
        api_token,
        api_base,
        zone,
        target,
    })
}

fn load_signals<F>(vars: &Vars<F>) -> Result<SignalConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let worker_pattern = vars.get("WORKER_PROCESS_PATTERN");
    if let Some(pattern) = &worker_pattern {
        if !is_safe_pattern(pattern) {
            return Err(ConfigError::Invalid {
                var: "WORKER_PROCESS_PATTERN",
                reason: format!(
                    "`{pattern}` is empty, too long, starts with `-` \
                     or contains control characters"
                ),
            });
        }
    }

    Ok(SignalConfig {
        loadavg_path: vars
            .get("LOADAVG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOADAVG_PATH)),
        database_url: vars.get("DATABASE_URL"),
        worker_pattern,
    })
}

/// Variable lookup that treats blank values as unset.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parse<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                    var: key,
                    reason: format!("`{raw}`: {e}"),
                })
            })
            .transpose()
    }
}
