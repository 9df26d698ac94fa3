use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::str::FromStr;
use tracing::{info, warn};

use crate::core::contracts::normalize_symbol;
use crate::error::SignalError;
use crate::models::{
    Direction, LivePrice, Normalized, OrderAction, ParsedAction, RawSignal, SignalWarning,
    ValidatedSignal,
};

const CONFIDENCE_MIN: Decimal = dec!(0);
const CONFIDENCE_MAX: Decimal = dec!(100);

/// Turn untrusted model output into a [`ValidatedSignal`], or reject it.
///
/// Directional policy: a stop loss on the wrong side of entry is a hard
/// failure, while a misplaced take profit or a pending trigger that looks
/// inconsistent with the live market is only recorded as a warning.
pub fn normalize(raw: &RawSignal, live: &LivePrice) -> Result<Normalized, SignalError> {
    let action_text = raw.action.as_deref().ok_or(SignalError::MissingAction)?;
    let parsed = ParsedAction::parse(action_text)
        .ok_or_else(|| SignalError::InvalidAction(action_text.to_string()))?;

    let mut warnings = Vec::new();
    let confidence = read_confidence(raw.confidence.as_ref(), &mut warnings);

    let action = match parsed {
        ParsedAction::Hold => {
            info!("Model recommends no trade ({})", action_text.trim());
            return Ok(Normalized::Hold {
                reasoning: raw.reasoning.clone(),
                confidence,
            });
        }
        ParsedAction::Order(action) => action,
    };

    let entry = read_price("entry_price", raw.entry_price.as_ref())?;
    let stop_loss = read_price("stop_loss", raw.stop_loss.as_ref())?;
    let take_profit = read_price("take_profit", raw.take_profit.as_ref())?;

    let direction = action.direction();
    let entry_defaulted = entry.is_none();
    let entry_price = match entry {
        Some(p) => p,
        None => {
            let fill = live.fill_price(direction);
            let source = match direction {
                Direction::Long => "ask",
                Direction::Short => "bid",
            };
            warn!(
                "entry_price missing for {}; using live {} {}",
                action, source, fill
            );
            warnings.push(SignalWarning::EntryDefaulted {
                source: source.to_string(),
            });
            if action.is_pending() {
                warn!("{} is a pending order; the defaulted trigger may not be intended", action);
                warnings.push(SignalWarning::PendingEntryDefaulted);
            }
            fill
        }
    };

    let stop_loss = match stop_loss {
        Some(sl) => sl,
        None => return Err(SignalError::InvalidStopLoss("stop loss is missing".to_string())),
    };
    if stop_loss == entry_price {
        return Err(SignalError::InvalidStopLoss(format!(
            "stop loss {} equals entry price",
            stop_loss
        )));
    }

    let stop_ok = match direction {
        Direction::Long => stop_loss < entry_price,
        Direction::Short => stop_loss > entry_price,
    };
    if !stop_ok {
        return Err(SignalError::StopOnWrongSide {
            action: action.to_string(),
            entry_price,
            stop_loss,
        });
    }

    if let Some(tp) = take_profit {
        let tp_ok = match direction {
            Direction::Long => tp > entry_price,
            Direction::Short => tp < entry_price,
        };
        if !tp_ok {
            warn!("{} take profit {} is on the wrong side of entry {}", action, tp, entry_price);
            warnings.push(SignalWarning::TakeProfitOnWrongSide { take_profit: tp });
        }
    }

    if !entry_defaulted {
        if let Some(reference) = pending_conflict(action, entry_price, live) {
            warn!(
                "{} trigger {} is inconsistent with market {}",
                action, entry_price, reference
            );
            warnings.push(SignalWarning::PendingTriggerVsMarket { reference });
        }
    }

    if let Some(reported) = raw.symbol.as_deref() {
        if normalize_symbol(reported) != normalize_symbol(&live.symbol) {
            warn!("Model reported symbol {} but feed is {}", reported, live.symbol);
            warnings.push(SignalWarning::SymbolMismatch {
                reported: reported.to_string(),
            });
        }
    }

    Ok(Normalized::Trade(ValidatedSignal {
        symbol: normalize_symbol(&live.symbol),
        action,
        entry_price,
        stop_loss,
        take_profit,
        confidence,
        reasoning: raw.reasoning.clone(),
        entry_defaulted,
        warnings,
    }))
}

/// Reference price a pending trigger contradicts, if any.
fn pending_conflict(action: OrderAction, entry: Decimal, live: &LivePrice) -> Option<Decimal> {
    match action {
        OrderAction::BuyLimit if entry > live.ask => Some(live.ask),
        OrderAction::BuyStop if entry < live.ask => Some(live.ask),
        OrderAction::SellLimit if entry < live.bid => Some(live.bid),
        OrderAction::SellStop if entry > live.bid => Some(live.bid),
        _ => None,
    }
}

/// Absent stays `None`; present values must be positive decimals.
fn read_price(field: &'static str, value: Option<&Value>) -> Result<Option<Decimal>, SignalError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match coerce_decimal(value) {
        Some(d) if d > Decimal::ZERO => Ok(Some(d)),
        _ => Err(SignalError::MalformedField {
            field,
            value: describe(Some(value)),
        }),
    }
}

fn read_confidence(value: Option<&Value>, warnings: &mut Vec<SignalWarning>) -> Option<Decimal> {
    let value = value?;
    let stripped = match value {
        Value::String(s) => Value::String(s.trim().trim_end_matches('%').to_string()),
        other => other.clone(),
    };
    let Some(c) = coerce_decimal(&stripped) else {
        warn!("Unreadable confidence {}; dropping it", value);
        warnings.push(SignalWarning::ConfidenceUnreadable {
            raw: describe(Some(value)),
        });
        return None;
    };
    let clamped = c.clamp(CONFIDENCE_MIN, CONFIDENCE_MAX);
    if clamped != c {
        warnings.push(SignalWarning::ConfidenceClamped { original: c });
    }
    Some(clamped)
}

/// Numbers and numeric strings (optionally with `$` and thousands separators).
pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', ""),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "<missing>".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
