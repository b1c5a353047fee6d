//! In-memory users API served over HTTP, from one process or from a cluster
//! of worker processes sharing a port.
//!
//! See `README.md` for usage and the HTTP surface. The modules, leaves first:
//!
//! - [`model`] defines the user record and its client-supplied fields.
//! - [`validator`] checks raw JSON payloads against the field rules.
//! - [`store`] keeps the records of one process in insertion order.
//! - [`service`] combines store and validator into the five operations and
//!   publishes snapshots after mutations.
//! - [`router`] resolves method and path to an operation and turns outcomes
//!   into JSON responses.
//! - [`server`] binds listeners and runs the axum application.
//! - [`message`] is the JSON line protocol between workers and the primary.
//! - [`worker`] and [`cluster`] are the two halves of cluster mode.
//! - [`cli`] parses the command line.

pub mod cli;
pub mod cluster;
pub mod error;
pub mod message;
pub mod model;
pub mod router;
pub mod server;
pub mod service;
pub mod store;
pub mod validator;
pub mod worker;
