// Models module - API records and the local agent snapshot

pub mod agent;
pub mod navigation;
pub mod orders;
pub mod responses;
pub mod ship;
pub mod survey;
pub mod trade;
pub mod waypoint;

// Re-export all models for easier imports
pub use agent::*;
pub use navigation::*;
pub use orders::*;
pub use responses::*;
pub use ship::*;
pub use survey::*;
pub use trade::*;
pub use waypoint::*;
