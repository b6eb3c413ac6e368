//! Client for the WeChatFerry command channel: typed commands over a
//! protobuf RPC transport, plus the attachment download workflow.

pub mod attachment;
pub mod client;
pub mod config;
pub mod envelope;
pub mod identity;
pub mod logging;
pub mod protocol;
pub mod room;
pub mod rows;
pub mod transport;

pub use attachment::{DownloadError, DownloadOptions};
pub use client::{ClientError, CmdClient};
pub use identity::{IdentityKind, classify_identity};
pub use protocol::proto;
pub use transport::{Transport, TransportError, WsTransport};
