//! Broker subscription and the delivery-processing loop
//!
//! This module provides:
//! - `BrokerConfig`: connection, binding, and acknowledgment settings
//! - `Consumer`: the lifecycle value owning connection, channel, and the
//!   background delivery loop
//! - `process_deliveries`: the loop itself, generic over the delivery stream
//!
//! # Lifecycle
//!
//! A consumer moves through three states:
//!
//! 1. **Running**: deliveries are taken from the stream one at a time,
//!    deserialized, handed to the record sink, and acknowledged.
//! 2. **Draining**: the stream has closed (broker-side or via shutdown's
//!    cancel); already-dispatched deliveries are still handled.
//! 3. **Closed**: the loop has exited and the drain flag is set. Terminal;
//!    the loop never restarts.
//!
//! Shutdown cancels the subscription, closes the channel and connection in
//! that order, and only then returns, after the loop reports drained.

pub mod connection;
pub mod consumer;

pub use connection::BrokerConfig;
pub use consumer::{process_deliveries, Consumer};
