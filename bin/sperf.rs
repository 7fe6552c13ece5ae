use clap::Parser;
use endpoint_socket::{Domain, Kind, Socket};
use std::time::{Duration, Instant};
use tracing_subscriber::filter::EnvFilter;

fn run_client_mode(args: Args) {
    let mut stream = Socket::with(Domain::Inet, Kind::Stream);
    if !stream.create() {
        eprintln!("Failed to create the socket");
        return;
    }
    if !stream.connect(&args.addr, args.port) {
        eprintln!("Failed to connect to {}:{}", args.addr, args.port);
        return;
    }
    println!("Connected successfully to {}:{}", args.addr, args.port);

    let mut buf = vec![0u8; args.size];
    buf.fill(42);

    loop {
        if !stream.write_all(&buf) {
            println!("Connection closed by remote peer");
            break;
        }
    }
}

fn run_server_mode(args: Args) {
    let mut listener = Socket::with(Domain::Inet, Kind::Stream);
    if !listener.create() || !listener.bind(&args.addr, args.port) || !listener.listen() {
        eprintln!("Failed to listen on {}:{}", args.addr, args.port);
        return;
    }
    let mut sid = 0;
    loop {
        if let Some(stream) = listener.accept() {
            println!(
                "Accepted connection from: {}:{}",
                stream.ip().unwrap_or_default(),
                stream.port().unwrap_or_default()
            );
            let mut buf = vec![0u8; args.size];
            let mut start = Instant::now();
            let mut total_recv = 0;
            let sampling_period = Duration::from_secs(args.period);
            let cid = sid;
            sid += 1;
            std::thread::spawn(move || loop {
                let n = match stream.read(&mut buf) {
                    Some(0) | None => {
                        println!("Socket closed by remote party...");
                        break;
                    }
                    Some(n) => n,
                };
                total_recv += n;
                let delta = start.elapsed();
                if delta >= sampling_period {
                    let throughput =
                        ((total_recv * 8) as f32 / delta.as_secs_f32()) / (10u64.pow(6) as f32);
                    println!("[{cid}]: {throughput} Mbps");
                    start = Instant::now();
                    total_recv = 0;
                }
            });
        } else {
            println!("Failed to accept connection!");
        }
    }
}

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
    tracing_log::LogTracer::init().expect("Failed to set logger");

    // Initialize tracing subscriber
    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => init_env_filter(env_filter),
        _ => {}
    }

    let args = Args::parse();
    if args.client {
        run_client_mode(args);
    } else {
        run_server_mode(args);
    }
}

/// The performance measurement application for endpoint-socket
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Set the client mode for the application
    #[arg(short, long)]
    client: bool,
    /// The IPv4 address to listen on or connect to, depending on the mode.
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: String,
    /// The port to listen on or connect to.
    #[arg(short = 'P', long)]
    port: u16,
    /// The read/write buffer size
    #[arg(short, long)]
    size: usize,
    /// The sampling period
    #[arg(short, long, default_value = "1")]
    period: u64,
}
