//! Live SAV event feed.
//!
//! The backend pushes playback events over server-sent events. This module
//! decodes the SSE wire format ([`sse`]), maps frames to typed
//! [`FeedEvent`]s ([`events`]) and keeps a subscription alive across
//! transport drops according to a [`ReconnectPolicy`] ([`subscription`]).
//!
//! ```text
//! ┌──────────────┐ bytes ┌────────────┐ frames ┌───────────┐ events ┌──────────────┐
//! │ EventTransport│─────▶│ SseDecoder │──────▶│ FeedEvent │──────▶│ subscriber   │
//! └──────────────┘       └────────────┘        └───────────┘  mpsc  └──────────────┘
//! ```

pub mod events;
pub mod reconnect;
pub mod sse;
pub mod subscription;
pub mod transport;

pub use events::FeedEvent;
pub use reconnect::ReconnectPolicy;
pub use sse::{SseDecoder, SseFrame};
pub use subscription::FeedSubscription;
pub use transport::{ByteStream, EventTransport, HttpTransport};
