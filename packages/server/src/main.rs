#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! EV map API server binary.

use clap::Parser;

#[derive(Parser)]
#[command(name = "ev_map_server", about = "EV adoption and charging analytics API")]
struct Cli {
    /// Prompt for the bind address, port and database path
    #[arg(short, long)]
    interactive: bool,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    if cli.interactive {
        return ev_map_server::interactive::run().await;
    }

    ev_map_server::run_server().await
}
