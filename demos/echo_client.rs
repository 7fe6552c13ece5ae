use clap::Parser;
use endpoint_socket::{Domain, Kind, Socket};
use std::time::Duration;
use tracing_subscriber::filter::EnvFilter;

fn init_env_filter(env_filter: EnvFilter) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_level(true)
        .with_target(true);

    let subscriber = subscriber.finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() {
    // Initialize log bridge to capture log crate messages - MUST be first!
    tracing_log::LogTracer::init().expect("Failed to set logger");

    // Initialize tracing subscriber
    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => init_env_filter(env_filter),
        _ => {}
    }

    let args = Args::parse();
    println!("Starting echo client");

    let mut client = Socket::with(Domain::Inet, Kind::Stream);
    if !client.create() || !client.connect(&args.addr, args.port) {
        eprintln!("Failed to connect to {}:{}", args.addr, args.port);
        return;
    }
    println!("Connected successfully");

    let mut response = [0u8; 1024];
    loop {
        if client.write_str(&args.message).is_none() {
            println!("Connection closed by the server");
            break;
        }
        match client.read(&mut response) {
            Some(0) | None => {
                println!("Connection closed by the server");
                break;
            }
            Some(n) => println!("Echoed: {}", String::from_utf8_lossy(&response[..n])),
        }
        std::thread::sleep(Duration::from_millis(args.period));
    }
}

/// A simple client illustrating the use of the socket handle.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The server IPv4 address to connect to
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: String,
    /// The server port to connect to
    #[arg(short = 'P', long, default_value = "7890")]
    port: u16,
    /// The message to send
    #[arg(short, long, default_value = "Hello from endpoint-socket!")]
    message: String,
    /// Send period in milli-sec
    #[arg(short, long, default_value = "500")]
    period: u64,
}
