//! Websocket broadcast relay server.

use clap::Parser;

use wsrelay::relay::{Config, Server};

#[derive(Debug, Parser)]
#[command(name = "wsrelay", about = "Websocket broadcast relay")]
struct Args {
    /// Address to listen on, `host:port`.
    #[arg(long, default_value = "localhost:8080")]
    address: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let server = Server::bind(Config {
        address: args.address,
        ..Config::default()
    })
    .await?;

    server.run().await
}
