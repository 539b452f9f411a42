//! Core types for the DAO platform

mod common;
mod entity;
mod identity;

pub use common::*;
pub use entity::*;
pub use identity::*;
