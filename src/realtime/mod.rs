// Real-time subsystem exports
pub mod gateway;
pub mod handlers;
pub mod registry;

pub use gateway::spawn_heartbeat_tasks;
pub use handlers::RealtimeContext;
pub use registry::ConnectionRegistry;
