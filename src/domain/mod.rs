pub mod message;
pub mod sender;
pub mod types;

pub use message::{Header, Message, MessageMetadata, MessageRef};
pub use sender::{parse_sender, ParsedSender};
pub use types::{BatchPlan, CycleSummary, Decision};
