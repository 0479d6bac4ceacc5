//! Wrappers that change how a piece runs without touching its body.

mod timeout;

pub use timeout::Timeout;
