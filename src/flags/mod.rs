pub mod http;
pub mod oracle;

pub use http::FlagServer;
pub use oracle::{FlagOracle, InMemoryFlagOracle, ProfileFlag};
