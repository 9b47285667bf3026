//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → [routing layer resolves domain → backend]
//!     → forward.rs (rewrite authority + forwarding headers, send)
//!     → headers.rs (hop-by-hop cleanup both ways)
//!     → Send backend response to client
//!     → websocket.rs (on 101: splice client and backend connections)
//! ```

pub mod forward;
pub mod headers;
pub mod request;
pub mod server;
pub mod websocket;

pub use forward::{Forward, ForwardError, HyperForwarder};
pub use request::{request_id, request_id_layer, X_REQUEST_ID};
pub use server::{build_router, AppState, HttpServer};
pub use websocket::UpgradeError;
