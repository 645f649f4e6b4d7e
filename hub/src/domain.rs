//! Domain event payloads.
//!
//! Each payload type maps to one wire `type` tag and one topic:
//!
//! | Payload          | `type`          | Topic           |
//! |------------------|-----------------|-----------------|
//! | [`PriceUpdate`]  | `price_update`  | `stocks`        |
//! | [`OddsUpdate`]   | `odds_update`   | `odds`          |
//! | [`MatchUpdate`]  | `match_update`  | `matches`       |
//! | [`Alert`]        | `alert`         | `alerts`        |
//! | [`Notification`] | `notification`  | `notifications` |

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::topic::Topic;

/// Kind of domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Stock price tick.
    PriceUpdate,
    /// Betting odds change.
    OddsUpdate,
    /// Live match score or status change.
    MatchUpdate,
    /// Threshold alert.
    Alert,
    /// User-facing notification.
    Notification,
}

impl EventKind {
    /// Returns the wire `type` tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceUpdate => "price_update",
            Self::OddsUpdate => "odds_update",
            Self::MatchUpdate => "match_update",
            Self::Alert => "alert",
            Self::Notification => "notification",
        }
    }

    /// Returns the topic events of this kind are published on.
    #[must_use]
    pub const fn topic_name(self) -> &'static str {
        match self {
            Self::PriceUpdate => "stocks",
            Self::OddsUpdate => "odds",
            Self::MatchUpdate => "matches",
            Self::Alert => "alerts",
            Self::Notification => "notifications",
        }
    }

    /// Returns the topic as a [`Topic`].
    #[must_use]
    pub fn topic(self) -> Topic {
        Topic::from_static(self.topic_name())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock price tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Ticker symbol.
    pub symbol: String,
    /// Last traded price.
    pub price: Decimal,
    /// Absolute change since the previous close.
    pub change: Decimal,
    /// Relative change since the previous close, in percent.
    pub change_percent: Decimal,
    /// Traded volume.
    pub volume: u64,
}

/// Betting odds change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsUpdate {
    /// Sporting event identifier.
    pub event_id: String,
    /// Market name, e.g. "match_winner".
    pub market: String,
    /// Selection within the market.
    pub selection: String,
    /// New decimal odds.
    pub odds: Decimal,
    /// Odds before this change, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_odds: Option<Decimal>,
}

/// Match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Not started.
    Scheduled,
    /// In play.
    Live,
    /// Half-time break.
    HalfTime,
    /// Finished.
    Finished,
    /// Called off.
    Cancelled,
}

/// Live match score or status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchUpdate {
    /// Match identifier.
    pub match_id: String,
    /// Home team name.
    pub home_team: String,
    /// Away team name.
    pub away_team: String,
    /// Home score.
    pub home_score: u32,
    /// Away score.
    pub away_score: u32,
    /// Current status.
    pub status: MatchStatus,
    /// Minute of play, when live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Needs immediate attention.
    Critical,
}

/// Threshold alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert identifier.
    pub alert_id: String,
    /// Symbol the alert watches.
    pub symbol: String,
    /// Human-readable message.
    pub message: String,
    /// Severity.
    pub severity: AlertSeverity,
    /// Value that tripped the alert.
    pub triggered_value: Decimal,
}

/// User-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Intended recipient. Informational only; delivery is by topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Any domain event payload.
///
/// Serializes as the bare payload; the kind travels in the frame's `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    /// Stock price tick.
    PriceUpdate(PriceUpdate),
    /// Betting odds change.
    OddsUpdate(OddsUpdate),
    /// Live match update.
    MatchUpdate(MatchUpdate),
    /// Threshold alert.
    Alert(Alert),
    /// User-facing notification.
    Notification(Notification),
}

impl DomainEvent {
    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::PriceUpdate(_) => EventKind::PriceUpdate,
            Self::OddsUpdate(_) => EventKind::OddsUpdate,
            Self::MatchUpdate(_) => EventKind::MatchUpdate,
            Self::Alert(_) => EventKind::Alert,
            Self::Notification(_) => EventKind::Notification,
        }
    }
}

impl From<PriceUpdate> for DomainEvent {
    fn from(update: PriceUpdate) -> Self {
        Self::PriceUpdate(update)
    }
}

impl From<OddsUpdate> for DomainEvent {
    fn from(update: OddsUpdate) -> Self {
        Self::OddsUpdate(update)
    }
}

impl From<MatchUpdate> for DomainEvent {
    fn from(update: MatchUpdate) -> Self {
        Self::MatchUpdate(update)
    }
}

impl From<Alert> for DomainEvent {
    fn from(alert: Alert) -> Self {
        Self::Alert(alert)
    }
}

impl From<Notification> for DomainEvent {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("decimal")
    }

    #[test]
    fn test_kind_tags_and_topics() {
        let cases = [
            (EventKind::PriceUpdate, "price_update", "stocks"),
            (EventKind::OddsUpdate, "odds_update", "odds"),
            (EventKind::MatchUpdate, "match_update", "matches"),
            (EventKind::Alert, "alert", "alerts"),
            (EventKind::Notification, "notification", "notifications"),
        ];

        for (kind, tag, topic) in cases {
            assert_eq!(kind.as_str(), tag);
            assert_eq!(kind.to_string(), tag);
            assert_eq!(kind.topic().as_str(), topic);
            assert_eq!(
                serde_json::to_value(kind).expect("serialize"),
                serde_json::json!(tag)
            );
        }
    }

    #[test]
    fn test_price_update_payload() {
        let event = DomainEvent::from(PriceUpdate {
            symbol: "AAPL".to_string(),
            price: dec("189.25"),
            change: dec("-1.10"),
            change_percent: dec("-0.58"),
            volume: 1_200_000,
        });

        assert_eq!(event.kind(), EventKind::PriceUpdate);
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["symbol"], "AAPL");
        assert_eq!(value["price"], "189.25");
        assert_eq!(value["change"], "-1.10");
        assert_eq!(value["volume"], 1_200_000);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let odds = serde_json::to_value(OddsUpdate {
            event_id: "evt-1".to_string(),
            market: "match_winner".to_string(),
            selection: "home".to_string(),
            odds: dec("2.10"),
            previous_odds: None,
        })
        .expect("serialize");
        assert!(odds.get("previous_odds").is_none());

        let note = serde_json::to_value(Notification {
            title: "Hi".to_string(),
            body: "Welcome".to_string(),
            user_id: None,
        })
        .expect("serialize");
        assert!(note.get("user_id").is_none());
    }

    #[test]
    fn test_match_update_status() {
        let update = MatchUpdate {
            match_id: "m-7".to_string(),
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            home_score: 2,
            away_score: 1,
            status: MatchStatus::HalfTime,
            minute: Some(45),
        };

        let value = serde_json::to_value(&update).expect("serialize");
        assert_eq!(value["status"], "half_time");
        assert_eq!(value["minute"], 45);

        let back: MatchUpdate = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, update);
    }

    #[test]
    fn test_alert_severity_order() {
        assert!(AlertSeverity::Critical > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);

        let alert = DomainEvent::from(Alert {
            alert_id: "a-1".to_string(),
            symbol: "TSLA".to_string(),
            message: "Price crossed 250".to_string(),
            severity: AlertSeverity::Critical,
            triggered_value: dec("250.01"),
        });
        assert_eq!(alert.kind(), EventKind::Alert);
        assert_eq!(
            serde_json::to_value(&alert).expect("serialize")["severity"],
            "critical"
        );
    }
}
