//! Scriptable stand-in for a real backend, used by the integration tests.
//!
//! Binds the requested port, prints a configurable banner and answers every
//! HTTP request with a fixed status.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Parser)]
#[command(name = "stub-backend")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long)]
    port: u16,

    /// Line printed once the listener is bound
    #[arg(long)]
    banner: Option<String>,

    #[arg(long, value_enum, default_value = "stdout")]
    banner_stream: Stream,

    #[arg(long, default_value_t = 0)]
    banner_delay_ms: u64,

    /// Lines written to stderr right after startup
    #[arg(long = "stderr-line")]
    stderr_lines: Vec<String>,

    /// Exit on its own after this many milliseconds
    #[arg(long)]
    exit_after_ms: Option<u64>,

    #[arg(long, default_value_t = 0)]
    exit_code: i32,

    /// Skip binding the port entirely
    #[arg(long)]
    no_listen: bool,

    /// HTTP status returned to every request
    #[arg(long, default_value_t = 404)]
    status: u16,

    /// Survive SIGTERM so only a hard kill ends the process
    #[arg(long)]
    ignore_term: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    if args.ignore_term {
        ignore_term()?;
    }

    for line in &args.stderr_lines {
        eprintln!("{line}");
    }

    let listener = if args.no_listen {
        None
    } else {
        Some(TcpListener::bind((args.host.as_str(), args.port)).await?)
    };

    if let Some(banner) = args.banner.clone() {
        let delay = Duration::from_millis(args.banner_delay_ms);
        let stream = args.banner_stream;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match stream {
                Stream::Stdout => println!("{banner}"),
                Stream::Stderr => eprintln!("{banner}"),
            }
        });
    }

    if let Some(after) = args.exit_after_ms {
        let code = args.exit_code;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(after)).await;
            eprintln!("stub-backend exiting with code {code}");
            std::process::exit(code);
        });
    }

    match listener {
        Some(listener) => serve(listener, args.status).await,
        None => {
            std::future::pending::<()>().await;
            Ok(())
        }
    }
}

async fn serve(listener: TcpListener, status: u16) -> std::io::Result<()> {
    loop {
        let (mut socket, _) = listener.accept().await?;
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            // request content is irrelevant
            let _ = socket.read(&mut buf).await;
            let response =
                format!("HTTP/1.1 {status} Stub\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
    }
}

#[cfg(unix)]
fn ignore_term() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        while term.recv().await.is_some() {
            eprintln!("stub-backend ignoring SIGTERM");
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn ignore_term() -> std::io::Result<()> {
    Ok(())
}
