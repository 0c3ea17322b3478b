//! Listening sockets and accept loops for both server modes.

pub mod listener;
