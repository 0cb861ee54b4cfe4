//! hassai - streaming conversation engine for the hassAI voice assistant
//!
//! Sends each user turn to the chat backend, folds the streamed reply into an
//! observable [`ConversationState`], and lets a newer turn supersede one still
//! in flight.
//!
//! ```text
//! AssistantHandle ──actions──▶ SessionManager ──transition()──▶ ConversationState ──watch──▶ UI
//!                                   │  ▲
//!                       TurnRequest │  │ ServerEvent (tagged with generation)
//!                                   ▼  │
//!                             TransportSession ◀── ChatBackend (HTTP + SSE)
//! ```

pub mod config;
pub mod protocol;
pub mod session;
pub mod state_machine;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use protocol::{decode, DecodeError, ServerEvent, TurnRequest};
pub use session::{AssistantHandle, SessionError, SessionManager};
pub use state_machine::{ConversationState, Message, Notice, Role};
pub use transport::{ChatBackend, HttpBackend, TransportError, TransportErrorKind, TransportSession};
