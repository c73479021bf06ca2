pub mod fixtures;
pub mod instance;
pub mod network;

pub use instance::TestInstance;
pub use network::TestNetwork;
