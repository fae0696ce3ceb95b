//! Shake Dice
//!
//! Core of a shake-to-roll six-sided die: accelerometer samples are turned
//! into debounced shake events, and shake or button triggers start an
//! exclusive roll sequence observed by a visual sink.

pub mod dice;
