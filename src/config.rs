//! Agent configuration

use crate::command::ExecutorConfig;
use crate::transport::{LinkConfig, VideoConfig};

/// Top-level configuration for the agent
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    pub link: LinkConfig,
    pub video: VideoConfig,
    pub executor: ExecutorConfig,
}
