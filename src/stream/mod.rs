pub mod events;
pub mod frames;
pub mod session;


pub use events::*;
pub use session::*;
