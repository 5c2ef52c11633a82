// Adapters layer: concrete implementations of the lookup ports (CT log, RDAP, randomness).

pub mod crtsh;
pub mod offline;
pub mod random;
pub mod rdap;

pub use crtsh::CrtShClient;
pub use offline::UnavailableSource;
pub use random::FastRandSource;
pub use rdap::RdapWhoisClient;
