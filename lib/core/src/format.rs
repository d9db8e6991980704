// Display helpers for edge labels
use crate::graph::Amount;
use crate::network::Network;
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};

const DISPLAY_DECIMALS: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeZoneLabel {
    #[default]
    #[serde(rename = "UTC")]
    Utc,
    #[serde(rename = "KST")]
    Kst,
}

impl TimeZoneLabel {
    fn offset(&self) -> Option<FixedOffset> {
        match self {
            TimeZoneLabel::Utc => FixedOffset::east_opt(0),
            TimeZoneLabel::Kst => FixedOffset::east_opt(9 * 3600),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TimeZoneLabel::Utc => "UTC",
            TimeZoneLabel::Kst => "KST",
        }
    }
}

/// Scales a raw amount into whole units and renders it with five decimals.
pub fn format_token_value(value: Amount, token: Network) -> String {
    let scale = Amount::from(10u64.pow(token.decimals()));
    let units = (value / scale).round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.5}", units)
}

/// `YYYY-MM-DD HH:MM:SS (ZONE)`; `None` for timestamps chrono cannot represent.
pub fn format_timestamp(seconds: i64, zone: TimeZoneLabel) -> Option<String> {
    let utc: DateTime<Utc> = DateTime::from_timestamp(seconds, 0)?;
    let local = utc.with_timezone(&zone.offset()?);
    Some(format!("{} ({})", local.format("%Y-%m-%d %H:%M:%S"), zone.label()))
}
