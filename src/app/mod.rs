pub mod clock;
pub mod context;
pub mod error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{AppContext, Paths};
pub use error::{OptionError, Result, TributaryError};
