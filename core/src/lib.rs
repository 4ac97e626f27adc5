pub mod core;
pub mod ops;
pub mod utils;

pub use ansi_term::{Colour, Style};
