mod channel;
mod error;
mod traits;

pub use self::channel::*;
pub use self::error::{Error, Result, TransportOp};
pub use self::traits::BusTransport;
