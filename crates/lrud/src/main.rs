//! LRU cache daemon - Redis-compatible RESP server

mod handler;
mod resp;

use std::sync::Arc;

use anyhow::Result;
use bytes::BytesMut;
use clap::Parser;
use lrucache::LruCache;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::{ByteCache, CommandHandler};
use crate::resp::{FrameReader, RespValue};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    bind: String,

    /// Cache capacity (number of entries)
    #[arg(short, long, default_value_t = 10000)]
    capacity: usize,

    /// Health check mode: connect to --bind and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let args = Args::parse();

    if args.health {
        match TcpStream::connect(&args.bind).await {
            Ok(_) => {
                println!("OK");
                std::process::exit(0);
            }
            Err(_) => {
                eprintln!("FAILED");
                std::process::exit(1);
            }
        }
    }

    info!("Starting lrud v{}", env!("CARGO_PKG_VERSION"));
    info!("Cache capacity: {}", args.capacity);

    let cache: Arc<ByteCache> = Arc::new(LruCache::try_new(args.capacity)?);

    let listener = TcpListener::bind(&args.bind).await?;
    info!("Server listening on {}", listener.local_addr()?);

    tokio::select! {
        result = serve(listener, cache) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

/// Log filter from `RUST_LOG` directives; `info` when unset or unparsable
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Accept connections forever, one task per client
async fn serve(listener: TcpListener, cache: Arc<ByteCache>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cache = Arc::clone(&cache);

                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, cache).await {
                        error!("Error handling client {}: {}", addr, e);
                    }
                    info!("Connection closed: {}", addr);
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

async fn handle_client(mut stream: TcpStream, cache: Arc<ByteCache>) -> Result<()> {
    let handler = CommandHandler::new(cache);
    let mut frames = FrameReader::new();
    let mut buffer = BytesMut::with_capacity(4096);
    let mut replies = BytesMut::with_capacity(4096);

    loop {
        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }

        // Answer every complete command in the buffer, then flush once
        loop {
            match frames.next_frame(&mut buffer) {
                Ok(Some(cmd)) => handler.handle(cmd).write_to(&mut replies),
                Ok(None) => break,
                Err(e) => {
                    warn!("Parse error: {}", e);
                    RespValue::error(format!("ERR {}", e)).write_to(&mut replies);
                    buffer.clear();
                    break;
                }
            }
        }

        if !replies.is_empty() {
            stream.write_all(&replies).await?;
            replies.clear();
        }
    }
}
