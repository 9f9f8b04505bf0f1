//! fitchat: streaming client core for a fitness chatbot.
//!
//! DESIGN
//! ======
//! The backend answers with server-sent events that interleave prose with a
//! framed JSON block of exercise video links. The pipeline is split by
//! concern so each stage is a small state object:
//!
//! - [`sse`] turns arbitrary chunks into `data: ` payloads.
//! - [`sideband`] separates video-link blocks from prose.
//! - [`transcript`] joins prose into one readable message.
//! - [`assembler`] composes the three for one response.
//! - [`conversation`] holds messages, ratings and saved copies.
//! - [`session`] is the async loop binding a [`client::ChunkSource`] to a
//!   conversation.

pub mod assembler;
pub mod client;
pub mod config;
pub mod conversation;
pub mod session;
pub mod sideband;
pub mod sse;
pub mod transcript;
