use endpoint_socket::{Domain, Kind, Socket};
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

    println!("Starting echo server on 127.0.0.1:7890");

    let mut listener = Socket::with(Domain::Inet, Kind::Stream);
    if !listener.create() || !listener.bind("127.0.0.1", 7890) || !listener.listen() {
        eprintln!("Failed to listen on 127.0.0.1:7890");
        return;
    }

    while let Some(client) = listener.accept() {
        println!(
            "Accepted connection from: {}:{}",
            client.ip().unwrap_or_default(),
            client.port().unwrap_or_default()
        );
        std::thread::spawn(move || {
            let mut buf = [0u8; 1024];
            loop {
                match client.read(&mut buf) {
                    Some(0) | None => {
                        println!("Client disconnected");
                        break;
                    }
                    Some(n) => {
                        if !client.write_all(&buf[..n]) {
                            println!("Failed to echo {n} bytes");
                            break;
                        }
                    }
                }
            }
        });
    }
    println!("Failed to accept connection!");
}
