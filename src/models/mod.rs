pub mod export;
pub mod session;

pub use export::*;
pub use session::*;
