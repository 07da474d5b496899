use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hookrelay")]
#[command(about = "Webhook capture and alert relay", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind to (overrides `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Configuration file (overrides HOOKRELAY_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
