//! Server state

use crate::deploy::service::DeploymentService;

/// Server state shared across handlers
pub struct ServerState {
    pub service: DeploymentService,
}

impl ServerState {
    pub fn new(service: DeploymentService) -> Self {
        Self { service }
    }
}
