use std::fmt;

use chrono::NaiveDateTime;

/// Persisted timestamp layout (`yyyy-MM-dd HH:mm:ss`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Action carried by inbound events that hold SMS bodies.
pub const SMS_RECEIVED_ACTION: &str = "sms.received";

/// Control message that asks a running service to shut down.
pub const STOP_SERVICE_ACTION: &str = "STOP_SERVICE";

/// Direction of a recognized payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "Credit",
            Self::Debit => "Debit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Credit" => Some(Self::Credit),
            "Debit" => Some(Self::Debit),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recognized payment, as persisted.
///
/// Only the classifier builds these from message text, which keeps
/// `amount > 0` and a resolved `kind` for every record.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionRecord {
    pub amount: f64,
    pub kind: TransactionKind,
    pub timestamp: NaiveDateTime,
}

impl TransactionRecord {
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Ready-to-speak text for this record.
    pub fn announcement(&self) -> String {
        let verb = match self.kind {
            TransactionKind::Credit => "Received",
            TransactionKind::Debit => "Sent",
        };
        format!("{verb} Rupees {}", format_amount(self.amount))
    }
}

/// Decimal rendering with at least one fractional digit (`500` -> `500.0`).
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.1}")
    } else {
        format!("{amount}")
    }
}

/// Lifecycle of the speaker service.
///
/// Stopped -> Starting -> Running -> Stopping -> Stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "STOPPED"),
            Self::Starting => write!(f, "STARTING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Stopping => write!(f, "STOPPING"),
        }
    }
}

/// Raw event delivered by the inbound event source.
///
/// One event may carry several payloads; `None` marks a payload whose text
/// could not be extracted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    pub action: String,
    pub payloads: Vec<Option<String>>,
}

impl InboundEvent {
    pub fn sms<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action: SMS_RECEIVED_ACTION.to_string(),
            payloads: bodies.into_iter().map(|b| Some(b.into())).collect(),
        }
    }

    pub fn is_sms(&self) -> bool {
        self.action == SMS_RECEIVED_ACTION
    }
}

/// Out-of-band control message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopRequest {
    pub action: String,
}

impl StopRequest {
    pub fn stop_service() -> Self {
        Self {
            action: STOP_SERVICE_ACTION.to_string(),
        }
    }

    pub fn is_stop(&self) -> bool {
        self.action == STOP_SERVICE_ACTION
    }
}

/// Stable identity of a displayed notification; showing the same id again
/// replaces the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NotificationId(pub u32);

impl NotificationId {
    /// "Service is running" status notification.
    pub const STATUS: Self = Self(1);
    /// Reused for every announcement.
    pub const ANNOUNCEMENT: Self = Self(2);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
}

impl NotificationChannel {
    pub fn sms_service() -> Self {
        Self {
            id: "sms_service_channel".to_string(),
            name: "SMS Service Channel".to_string(),
        }
    }
}
