//! WebSocket layer: the per-client proxy to the upstream event socket.
//!
//! The endpoint at `/ws` runs one [`connection::ProxySession`] per client.
//! Each session owns three tasks: the client-facing loop, the upstream
//! reader ([`upstream::UpstreamSession`]) and the inbound sender
//! ([`inbound::InboundSender`]), coordinated by two [`relay`] queues and the
//! [`session::Session`] phase.

pub mod connection;
pub mod handler;
pub mod inbound;
pub mod messages;
pub mod relay;
pub mod session;
pub mod upstream;
