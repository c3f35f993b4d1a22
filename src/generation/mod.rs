pub mod controller;
pub mod fallback;
pub mod selection;


pub use controller::*;
pub use selection::*;
