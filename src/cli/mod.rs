//! Terminal surfaces over the conversion core

pub mod convert;
pub mod feed;
pub mod setup;
pub mod tokens;
pub mod ui;
