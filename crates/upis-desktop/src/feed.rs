//! Line-oriented message feed.
//!
//! Each input line is one of:
//! - `STOP_SERVICE`, a stop request
//! - a JSON object, `{"control": "..."}` or `{"action": "...", "messages": [...]}`
//! - anything else, taken as the body of a single SMS

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use upis_core::{
    dispatcher::Dispatcher,
    domain::{InboundEvent, StopRequest, SMS_RECEIVED_ACTION, STOP_SERVICE_ACTION},
    Result,
};

#[derive(Debug, PartialEq)]
pub enum FeedItem {
    Event(InboundEvent),
    Control(StopRequest),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonLine {
    Control {
        control: String,
    },
    Event {
        #[serde(default = "default_action")]
        action: String,
        messages: Vec<Option<String>>,
    },
}

fn default_action() -> String {
    SMS_RECEIVED_ACTION.to_string()
}

pub fn parse_line(line: &str) -> Option<FeedItem> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line == STOP_SERVICE_ACTION {
        return Some(FeedItem::Control(StopRequest::stop_service()));
    }
    if line.starts_with('{') {
        return match serde_json::from_str::<JsonLine>(line) {
            Ok(JsonLine::Control { control }) => {
                Some(FeedItem::Control(StopRequest { action: control }))
            }
            Ok(JsonLine::Event { action, messages }) => Some(FeedItem::Event(InboundEvent {
                action,
                payloads: messages,
            })),
            Err(e) => {
                warn!("Skipping malformed feed line: {e}");
                None
            }
        };
    }
    Some(FeedItem::Event(InboundEvent::sms([line])))
}

/// Publish every line of `reader` until EOF. Returns the number of items
/// published.
pub async fn pump_lines<R>(
    reader: R,
    events: &Dispatcher<InboundEvent>,
    control: &Dispatcher<StopRequest>,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut published = 0usize;
    while let Some(line) = lines.next_line().await? {
        let Some(item) = parse_line(&line) else {
            continue;
        };
        let delivered = match item {
            FeedItem::Event(ev) => events.publish(ev),
            FeedItem::Control(req) => control.publish(req),
        };
        if delivered == 0 {
            debug!("Feed item had no subscribers");
        }
        published += 1;
    }
    Ok(published)
}
