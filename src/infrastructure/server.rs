// Infrastructure: Server setup and configuration

use std::net::SocketAddr;
use tonic::transport::Server;
use tracing::info;

use crate::application::mappers::deskplan_proto::desk_planner_server::DeskPlannerServer;
use crate::application::GrpcDeskPlannerService;
use crate::solver::SolverFactory;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:50051";

pub struct ServerConfig {
    pub address: SocketAddr,
}

impl ServerConfig {
    pub fn new(address: SocketAddr) -> Self {
        Self { address }
    }
}

pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = GrpcDeskPlannerService::new();

    let backends: Vec<String> = SolverFactory::available_backends()
        .iter()
        .map(|b| format!("{:?}", b))
        .collect();
    info!(address = %config.address, backends = ?backends, "deskplan server listening");

    Server::builder()
        .add_service(DeskPlannerServer::new(service))
        .serve(config.address)
        .await?;

    Ok(())
}
