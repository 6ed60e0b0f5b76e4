//! Broadcast chat hub demo
//!
//! Run with: cargo run --example chat_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example chat_server                    # binds to 0.0.0.0:8080
//!   cargo run --example chat_server localhost          # binds to 127.0.0.1:8080
//!   cargo run --example chat_server 127.0.0.1:9001     # binds to 127.0.0.1:9001
//!
//! Connect a few terminals and type:
//!   websocat ws://localhost:8080
//!
//! Every line one client sends is relayed to all connected clients. Slow
//! clients that stop draining are disconnected; idle clients are kept
//! alive with pings.

use std::net::SocketAddr;

use wshub_rs::{HubServer, ServerConfig};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8080
/// - "localhost:9001" -> 127.0.0.1:9001
/// - "127.0.0.1" -> 127.0.0.1:8080
/// - "0.0.0.0:9001" -> 0.0.0.0:9001
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8080;

    // Replace "localhost" with "127.0.0.1"
    let normalized = arg.replace("localhost", "127.0.0.1");

    // Try parsing as SocketAddr first (includes port)
    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    // Try parsing as IP address without port
    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: chat_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8080)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  chat_server                     # binds to 0.0.0.0:8080");
    eprintln!("  chat_server localhost           # binds to 127.0.0.1:8080");
    eprintln!("  chat_server localhost:9001      # binds to 127.0.0.1:9001");
    eprintln!("  chat_server 0.0.0.0:9001        # binds to 0.0.0.0:9001");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => "0.0.0.0:8080".parse().unwrap(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wshub_rs=debug".parse()?)
                .add_directive("chat_server=debug".parse()?),
        )
        .init();

    let config = ServerConfig {
        bind_addr,
        ..ServerConfig::default()
    };

    println!("Starting chat hub on {}", config.bind_addr);
    println!();
    println!("Connect with:");
    println!("  websocat ws://localhost:{}", config.bind_addr.port());
    println!();
    println!("Anything one client sends is relayed to every connected client.");
    println!();

    let server = HubServer::new(config);
    let handle = server.handle();

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    let stats = handle.stats().snapshot();
    println!(
        "Served {} connections, relayed {} messages ({} deliveries, {} slow clients dropped)",
        stats.total_connections,
        stats.messages_broadcast,
        stats.messages_delivered,
        stats.slow_evictions
    );

    Ok(())
}
