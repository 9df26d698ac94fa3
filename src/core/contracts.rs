use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskUnit {
    PerOunce,
    PerPip,
    PerUnit,
}

impl fmt::Display for RiskUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskUnit::PerOunce => write!(f, "per-ounce"),
            RiskUnit::PerPip => write!(f, "per-pip"),
            RiskUnit::PerUnit => write!(f, "per-unit"),
        }
    }
}

impl FromStr for RiskUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per-ounce" | "ounce" | "oz" => Ok(RiskUnit::PerOunce),
            "per-pip" | "pip" => Ok(RiskUnit::PerPip),
            "per-unit" | "unit" => Ok(RiskUnit::PerUnit),
            other => Err(format!("unknown risk unit '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSpec {
    pub symbol: String,
    pub contract_size: Decimal,
    pub risk_unit: RiskUnit,
}

/// What to do when the configured symbol has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSymbolPolicy {
    Reject,
    /// Substitute a forex-standard 100,000 unit contract.
    Default,
}

impl FromStr for UnknownSymbolPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(UnknownSymbolPolicy::Reject),
            "default" => Ok(UnknownSymbolPolicy::Default),
            other => Err(format!("expected 'reject' or 'default', got '{}'", other)),
        }
    }
}

/// Registry lookup result that remembers whether the fallback was used.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContract {
    pub spec: ContractSpec,
    pub defaulted: bool,
}

const DEFAULT_CONTRACT_SIZE: Decimal = dec!(100000);

const BUILTIN: &[(&str, Decimal, RiskUnit)] = &[
    ("XAUUSD", dec!(100), RiskUnit::PerOunce),
    ("XAGUSD", dec!(5000), RiskUnit::PerOunce),
    ("EURUSD", dec!(100000), RiskUnit::PerPip),
    ("GBPUSD", dec!(100000), RiskUnit::PerPip),
    ("USDJPY", dec!(100000), RiskUnit::PerPip),
    ("AUDUSD", dec!(100000), RiskUnit::PerPip),
    ("USDCAD", dec!(100000), RiskUnit::PerPip),
    ("USDCHF", dec!(100000), RiskUnit::PerPip),
    ("NZDUSD", dec!(100000), RiskUnit::PerPip),
];

#[derive(Debug, Clone)]
pub struct ContractRegistry {
    specs: HashMap<String, ContractSpec>,
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ContractRegistry {
    pub fn empty() -> Self {
        Self {
            specs: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for &(symbol, size, unit) in BUILTIN {
            registry.specs.insert(
                symbol.to_string(),
                ContractSpec {
                    symbol: symbol.to_string(),
                    contract_size: size,
                    risk_unit: unit,
                },
            );
        }
        registry
    }

    /// Add or replace an entry. Non-positive sizes are refused.
    pub fn insert(
        &mut self,
        symbol: &str,
        contract_size: Decimal,
        risk_unit: RiskUnit,
    ) -> Result<(), String> {
        if contract_size <= Decimal::ZERO {
            return Err(format!(
                "contract size for {} must be positive, got {}",
                symbol, contract_size
            ));
        }
        let key = normalize_symbol(symbol);
        self.specs.insert(
            key.clone(),
            ContractSpec {
                symbol: key,
                contract_size,
                risk_unit,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, symbol: &str) -> Result<&ContractSpec, RegistryError> {
        let key = normalize_symbol(symbol);
        self.specs
            .get(&key)
            .ok_or(RegistryError::UnknownSymbol(key))
    }

    /// Lookup with an explicit fallback policy. A substituted default is logged
    /// and flagged on the result.
    pub fn resolve(
        &self,
        symbol: &str,
        policy: UnknownSymbolPolicy,
    ) -> Result<ResolvedContract, RegistryError> {
        match self.lookup(symbol) {
            Ok(spec) => Ok(ResolvedContract {
                spec: spec.clone(),
                defaulted: false,
            }),
            Err(err) => match policy {
                UnknownSymbolPolicy::Reject => Err(err),
                UnknownSymbolPolicy::Default => {
                    let symbol = normalize_symbol(symbol);
                    warn!(
                        "No contract spec for {}; substituting default {} {} contract",
                        symbol,
                        DEFAULT_CONTRACT_SIZE,
                        RiskUnit::PerPip
                    );
                    Ok(ResolvedContract {
                        spec: ContractSpec {
                            symbol,
                            contract_size: DEFAULT_CONTRACT_SIZE,
                            risk_unit: RiskUnit::PerPip,
                        },
                        defaulted: true,
                    })
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_normalized() {
        let reg = ContractRegistry::builtin();
        let spec = reg.lookup(" xauusd ").unwrap();
        assert_eq!(spec.contract_size, dec!(100));
        assert_eq!(spec.risk_unit, RiskUnit::PerOunce);
        assert_eq!(reg.lookup("EURUSD").unwrap().contract_size, dec!(100000));
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let reg = ContractRegistry::builtin();
        assert_eq!(
            reg.lookup("btcusd"),
            Err(RegistryError::UnknownSymbol("BTCUSD".to_string()))
        );
        assert!(reg.resolve("BTCUSD", UnknownSymbolPolicy::Reject).is_err());
    }

    #[test]
    fn default_policy_flags_substitution() {
        let reg = ContractRegistry::builtin();
        let r = reg.resolve("BTCUSD", UnknownSymbolPolicy::Default).unwrap();
        assert!(r.defaulted);
        assert_eq!(r.spec.contract_size, dec!(100000));

        let r = reg.resolve("XAGUSD", UnknownSymbolPolicy::Default).unwrap();
        assert!(!r.defaulted);
        assert_eq!(r.spec.contract_size, dec!(5000));
    }

    #[test]
    fn insert_rejects_non_positive_size() {
        let mut reg = ContractRegistry::empty();
        assert!(reg.insert("US30", Decimal::ZERO, RiskUnit::PerUnit).is_err());
        assert!(reg.insert("us30", dec!(1), RiskUnit::PerUnit).is_ok());
        assert_eq!(reg.lookup("US30").unwrap().contract_size, dec!(1));
    }
}
