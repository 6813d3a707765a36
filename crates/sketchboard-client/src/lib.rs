//! Client side of SketchBoard.
//!
//! A client never computes session state. It receives whole snapshots,
//! keeps the last one, and turns the difference between consecutive
//! snapshots into discrete events a UI can react to.
//!
//! ```text
//! server snapshot ──→ Reconciler::update ──→ ReconcilerEvent (per facet)
//!                                         └─→ subscribers (mpsc)
//! AreaClient::draw ──→ CommandSink::send ──→ server
//! ```

#![allow(async_fn_in_trait)]

mod client;
mod error;
mod identity;
mod reconciler;
mod sink;

pub use client::AreaClient;
pub use error::ClientError;
pub use identity::{IdentitySource, RawIds};
pub use reconciler::{Reconciler, ReconcilerEvent};
pub use sink::CommandSink;
