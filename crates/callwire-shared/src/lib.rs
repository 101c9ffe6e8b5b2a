//! # callwire-shared
//!
//! Types shared by every callwire crate: call status and media enums, bus
//! topic naming, the clock abstraction, and error severity.

pub mod clock;
pub mod constants;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ParseEnumError, Severity};
pub use types::{CallStatus, CallType, ChangeKind, SdpType, Topic};
