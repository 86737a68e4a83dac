// roundtrip/src/lib.rs

pub mod backend;
pub mod clock;
pub mod codec;
pub mod round_trip;

pub use backend::{CodecBackend, ExternalBackend, Invocation};
pub use clock::{Clock, SystemClock};
pub use codec::{CodecAdapter, CodecOptions, RenameGuard};
pub use round_trip::{RoundTripEngine, RoundTripPaths, RoundTripRequest};
