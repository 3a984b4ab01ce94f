//! Command implementations for querytune

pub mod analyze;
pub mod compare;
pub mod config;
pub mod dispatch;
pub mod explain;
pub mod optimize;
