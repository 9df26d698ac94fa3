use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::core::contracts::{ContractRegistry, ResolvedContract, RiskUnit, UnknownSymbolPolicy};
use crate::core::lot_size::{LotSizeCalculator, DEFAULT_LOT_STEP};
use crate::error::{ConfigError, PipelineError};

/// Account risk settings, fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub account_balance: Decimal,
    pub risk_percentage: Decimal,
}

impl RiskConfig {
    pub fn new(account_balance: Decimal, risk_percentage: Decimal) -> Result<Self, ConfigError> {
        if account_balance <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "ACCOUNT_BALANCE",
                value: account_balance.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if risk_percentage <= Decimal::ZERO || risk_percentage > dec!(100) {
            return Err(ConfigError::Invalid {
                key: "RISK_PERCENTAGE",
                value: risk_percentage.to_string(),
                reason: "must be in (0, 100]".to_string(),
            });
        }
        Ok(Self {
            account_balance,
            risk_percentage,
        })
    }

    pub fn risk_amount(&self) -> Decimal {
        self.account_balance * (self.risk_percentage / dec!(100))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractOverride {
    pub symbol: String,
    pub contract_size: Decimal,
    pub risk_unit: RiskUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Trading
    pub symbol: String,
    pub risk: RiskConfig,
    pub lot_step: Decimal,
    pub max_lots: Option<Decimal>,
    pub unknown_symbol_policy: UnknownSymbolPolicy,
    pub contract_overrides: Vec<ContractOverride>,

    // Signal oracle
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub prompt_file: String,
    pub chart_image: Option<String>,
    pub embed_live_price: bool,

    // Price feed
    pub terminal_url: String,
    pub max_price_age_secs: i64,

    // Timeouts
    pub oracle_timeout: Duration,
    pub price_timeout: Duration,
    pub retry_backoff: Duration,

    // Delivery
    pub webhook_url: Option<String>,
    pub outbox_dir: Option<String>,

    // Scheduling
    pub run_interval: Option<Duration>,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Every value is validated here; nothing is
    /// re-checked per run.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let opt = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let env = |key: &str, default: &str| -> String {
            opt(key).unwrap_or_else(|| default.to_string())
        };

        let account_balance = parse_decimal("ACCOUNT_BALANCE", &env("ACCOUNT_BALANCE", "10000"))?;
        let risk_percentage = parse_decimal("RISK_PERCENTAGE", &env("RISK_PERCENTAGE", "2.0"))?;
        let risk = RiskConfig::new(account_balance, risk_percentage)?;

        let lot_step = parse_decimal("LOT_STEP", &env("LOT_STEP", &DEFAULT_LOT_STEP.to_string()))?;
        if lot_step <= Decimal::ZERO {
            return Err(invalid("LOT_STEP", lot_step.to_string(), "must be positive"));
        }

        let max_lots = match env("MAX_LOTS", "10.0").to_lowercase().as_str() {
            "none" | "off" => None,
            value => {
                let max = parse_decimal("MAX_LOTS", value)?;
                if max < lot_step {
                    return Err(invalid("MAX_LOTS", max.to_string(), "must be at least LOT_STEP"));
                }
                Some(max)
            }
        };

        let policy_text = env("UNKNOWN_SYMBOL_POLICY", "reject");
        let unknown_symbol_policy = UnknownSymbolPolicy::from_str(&policy_text)
            .map_err(|reason| invalid("UNKNOWN_SYMBOL_POLICY", policy_text.clone(), &reason))?;

        let contract_overrides = match opt("CONTRACT_SIZES") {
            Some(spec) => parse_contract_overrides(&spec)?,
            None => Vec::new(),
        };

        let symbol = env("TRADE_SYMBOL", "XAUUSD").to_uppercase();

        let embed_text = env("EMBED_LIVE_PRICE", "true");
        let embed_live_price = parse_bool("EMBED_LIVE_PRICE", &embed_text)?;

        let run_interval = match opt("RUN_INTERVAL_SECS") {
            Some(v) => {
                let secs = parse_secs("RUN_INTERVAL_SECS", &v)?;
                if secs == 0 {
                    return Err(invalid("RUN_INTERVAL_SECS", v, "must be positive"));
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Config {
            symbol,
            risk,
            lot_step,
            max_lots,
            unknown_symbol_policy,
            contract_overrides,
            gemini_api_key: opt("GEMINI_API_KEY"),
            gemini_model: env("GEMINI_MODEL", "gemini-1.5-flash"),
            gemini_base_url: env(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            prompt_file: env("PROMPT_FILE", "prompt.txt"),
            chart_image: opt("CHART_IMAGE"),
            embed_live_price,
            terminal_url: env("TERMINAL_URL", "http://127.0.0.1:5000"),
            max_price_age_secs: parse_age_secs(&env("MAX_PRICE_AGE_SECS", "120"))?,
            oracle_timeout: Duration::from_secs(parse_secs(
                "ORACLE_TIMEOUT_SECS",
                &env("ORACLE_TIMEOUT_SECS", "30"),
            )?),
            price_timeout: Duration::from_secs(parse_secs(
                "PRICE_TIMEOUT_SECS",
                &env("PRICE_TIMEOUT_SECS", "10"),
            )?),
            retry_backoff: Duration::from_millis(parse_secs(
                "RETRY_BACKOFF_MS",
                &env("RETRY_BACKOFF_MS", "1000"),
            )?),
            webhook_url: opt("WEBHOOK_URL"),
            outbox_dir: opt("OUTBOX_DIR"),
            run_interval,
            log_level: env("LOG_LEVEL", "info"),
        })
    }

    pub fn registry(&self) -> Result<ContractRegistry, ConfigError> {
        let mut registry = ContractRegistry::builtin();
        for o in &self.contract_overrides {
            registry
                .insert(&o.symbol, o.contract_size, o.risk_unit)
                .map_err(|reason| invalid("CONTRACT_SIZES", o.symbol.clone(), &reason))?;
        }
        Ok(registry)
    }

    /// Contract for the configured symbol under the configured policy.
    pub fn resolve_contract(&self) -> Result<ResolvedContract, PipelineError> {
        let registry = self.registry()?;
        Ok(registry.resolve(&self.symbol, self.unknown_symbol_policy)?)
    }

    pub fn lot_calculator(&self) -> Result<LotSizeCalculator, ConfigError> {
        LotSizeCalculator::new(self.lot_step, self.max_lots)
            .map_err(|e| invalid("LOT_STEP", self.lot_step.to_string(), &e.to_string()))
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .ok_or(ConfigError::Missing {
                key: "GEMINI_API_KEY",
            })
    }
}

fn invalid(key: &'static str, value: String, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value,
        reason: reason.to_string(),
    }
}

fn parse_decimal(key: &'static str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value).map_err(|_| invalid(key, value.to_string(), "not a decimal number"))
}

fn parse_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| invalid(key, value.to_string(), "not a non-negative integer"))
}

fn parse_age_secs(value: &str) -> Result<i64, ConfigError> {
    let secs = parse_secs("MAX_PRICE_AGE_SECS", value)?;
    i64::try_from(secs).map_err(|_| invalid("MAX_PRICE_AGE_SECS", value.to_string(), "too large"))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value.to_string(), "not a boolean")),
    }
}

/// `SYM=size[:unit]` entries separated by commas, e.g. `US30=1:unit,XPTUSD=50:ounce`.
fn parse_contract_overrides(spec: &str) -> Result<Vec<ContractOverride>, ConfigError> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (symbol, rest) = entry
                .split_once('=')
                .ok_or_else(|| invalid("CONTRACT_SIZES", entry.to_string(), "expected SYM=size"))?;
            let (size, unit) = match rest.split_once(':') {
                Some((size, unit)) => (size, Some(unit)),
                None => (rest, None),
            };
            let contract_size = parse_decimal("CONTRACT_SIZES", size.trim())?;
            if contract_size <= Decimal::ZERO {
                return Err(invalid("CONTRACT_SIZES", entry.to_string(), "size must be positive"));
            }
            let risk_unit = match unit {
                Some(u) => RiskUnit::from_str(u)
                    .map_err(|reason| invalid("CONTRACT_SIZES", entry.to_string(), &reason))?,
                None => RiskUnit::PerUnit,
            };
            Ok(ContractOverride {
                symbol: symbol.trim().to_uppercase(),
                contract_size,
                risk_unit,
            })
        })
        .collect()
}
