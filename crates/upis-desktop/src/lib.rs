//! Desktop adapters for the speaker service: an external text-to-speech
//! program, freedesktop notifications, and a line-oriented message feed.

pub mod feed;
pub mod notifier;
pub mod speech;

pub use feed::{parse_line, pump_lines, FeedItem};
pub use notifier::DesktopNotifier;
pub use speech::CommandSpeech;
