use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::delivery::{Delivery, DeliverySink};
use crate::models::OrderPayload;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn to_rfc822(&self) -> String {
        format!(
            "Subject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.subject,
            self.body.replace('\n', "\r\n")
        )
    }
}

/// Human-readable order plus the lot-size audit trail.
pub fn render_email(d: &Delivery) -> EmailMessage {
    let p = &d.payload;
    let subject = format!("[Trade Signal] {} {} {} lots", p.action(), p.symbol(), p.volume());

    let mut body = String::new();
    let _ = writeln!(body, "TRADE ORDER ({})", d.created_at.to_rfc3339());
    let _ = writeln!(body, "{}", "=".repeat(40));
    let _ = writeln!(body, "Symbol:       {}", p.symbol());
    let _ = writeln!(body, "Action:       {}", p.action());
    let _ = writeln!(
        body,
        "Order type:   {}",
        if matches!(p, OrderPayload::Pending(_)) { "PENDING" } else { "MARKET" }
    );
    if let Some(price) = p.price() {
        let _ = writeln!(body, "Trigger:      {}", price);
    }
    let _ = writeln!(body, "Volume:       {}", p.volume());
    let _ = writeln!(body, "Stop loss:    {}", p.stop_loss());
    match p.take_profit() {
        Some(tp) => {
            let _ = writeln!(body, "Take profit:  {}", tp);
        }
        None => {
            let _ = writeln!(body, "Take profit:  none");
        }
    }
    if let Some(c) = d.signal.confidence {
        let _ = writeln!(body, "Confidence:   {}%", c);
    }
    if let Some(r) = &d.signal.reasoning {
        let _ = writeln!(body, "Reasoning:    {}", r);
    }

    let l = &d.lot;
    let _ = writeln!(body);
    let _ = writeln!(body, "RISK BREAKDOWN");
    let _ = writeln!(body, "{}", "-".repeat(40));
    let _ = writeln!(body, "Entry price:      {}", d.signal.entry_price);
    let _ = writeln!(body, "Max risk amount:  {:.2}", l.risk_amount);
    let _ = writeln!(body, "Price difference: {}", l.price_difference);
    let _ = writeln!(body, "Risk per lot:     {:.2}", l.risk_per_lot);
    let _ = writeln!(body, "Raw lots:         {:.4}", l.raw_lots);
    let _ = writeln!(body, "Final lots:       {}", l.final_lots);
    let _ = writeln!(body, "Actual risk:      {:.2}", l.actual_risk);
    let _ = writeln!(body, "Safety margin:    {:.2}", l.safety_margin);
    let _ = writeln!(body, "Within limit:     {}", if l.is_safe { "yes" } else { "NO" });
    if l.capped {
        let _ = writeln!(body, "Volume was capped at the configured maximum.");
    }

    let mut notes: Vec<String> = d.signal.warnings.iter().map(|w| w.to_string()).collect();
    if d.contract_defaulted {
        notes.push("contract size is the default, symbol not in registry".to_string());
    }
    if !notes.is_empty() {
        let _ = writeln!(body);
        let _ = writeln!(body, "WARNINGS");
        for n in notes {
            let _ = writeln!(body, "- {}", n);
        }
    }

    EmailMessage { subject, body }
}

/// Drops rendered messages into an outbox directory for a mail relay.
pub struct EmailSink {
    outbox: PathBuf,
}

impl EmailSink {
    pub fn new(outbox: impl Into<PathBuf>) -> Self {
        Self {
            outbox: outbox.into(),
        }
    }
}

#[async_trait]
impl DeliverySink for EmailSink {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<()> {
        let message = render_email(delivery);
        tokio::fs::create_dir_all(&self.outbox)
            .await
            .with_context(|| format!("Failed to create outbox {}", self.outbox.display()))?;

        let file = self.outbox.join(format!(
            "{}_{}_{}.eml",
            delivery.created_at.format("%Y%m%dT%H%M%S%.3f"),
            delivery.payload.symbol(),
            delivery.payload.action()
        ));
        tokio::fs::write(&file, message.to_rfc822())
            .await
            .with_context(|| format!("Failed to write {}", file.display()))?;
        Ok(())
    }
}
