//! # trax-net: Wire Protocol and TCP Driver
//!
//! The length-prefixed JSON framing ([`framing`]), the dense request/
//! response message enumeration ([`messages`]), and a blocking TCP server
//! ([`server`]) that drives a shared planner session. The core crates stay
//! synchronous; this crate owns all sockets and threads.

pub mod framing;
pub mod messages;
pub mod server;

pub use framing::{read_frame, write_frame};
pub use messages::MessageType;
pub use server::{serve, ServerConfig};
