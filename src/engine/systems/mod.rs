pub mod logging;
pub mod occupancy;
pub mod rewards;
pub mod session;

pub use logging::*;
pub use occupancy::*;
pub use rewards::*;
pub use session::*;
