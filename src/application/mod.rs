//! Application layer containing the core business logic orchestration.
//!
//! `TransferEngine` is the entry point for request-driven operations (transfers, deposits,
//! withdrawals). `PaymentScheduler` is the only time-driven component; it pays recurring
//! schedules through the same engine, so both paths share one commit point.

pub mod clock;
pub mod notify;
pub mod scheduler;
pub mod transfer;
