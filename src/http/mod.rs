//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer SocketAddr via ConnectInfo)
//!     → server.rs (request ID, trace span, timeout)
//!     → access_log.rs (resolve client, log on completion)
//!     → handlers.rs (/own, /own/all, /lookup/{ip}, /health)
//!     → LookupService
//!     → JSON or text response
//! ```

pub mod access_log;
pub mod handlers;
pub mod server;

pub use server::{build_router, AppState, HttpServer, X_REQUEST_ID};
