//! Forwarder module - copies message ranges between channels.

pub mod channel;
pub mod job;
pub mod session;
pub mod settings;

pub use channel::{ChannelClient, TransferError};
pub use job::{JobEvent, StopSignal};
pub use session::{SettingCommand, Sessions};
pub use settings::{Defaults, ForwardPlan};
