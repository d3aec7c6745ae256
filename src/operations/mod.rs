// Operations module - routing, mining, handoff and the coordination cycle

pub mod extraction;
pub mod keep_alive;
pub mod routing;
pub mod task_state;
pub mod topology;
pub mod transfer;
pub mod worker;

pub use extraction::ExtractionScheduler;
pub use keep_alive::KeepAlive;
pub use routing::Router;
pub use task_state::{AgentTask, TaskState};
pub use topology::TopologyGraph;
pub use transfer::{HandoffOutcome, TransferCoordinator, TransferSettings};
pub use worker::{AgentTasks, CycleReport, Worker};
