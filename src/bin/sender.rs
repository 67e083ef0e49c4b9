use std::net::TcpStream;

use clap::Parser;
use log::info;

use rtproto::config::SendMode;
use rtproto::handshake::sender_handshake;
use rtproto::inject::FaultInjector;
use rtproto::transport::run_sender_session;
use rtproto::{Clock, Protocol, SenderConfig, SenderEngine};

/// Sends a fixed run of numbered packets to a receiver, retransmitting
/// under whichever discipline was negotiated.
#[derive(Parser, Debug)]
#[command(name = "sender")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 9000)]
    port: u16,

    #[arg(long, default_value = "SR")]
    protocol: Protocol,

    #[arg(long, default_value_t = 5)]
    wmax: u32,

    #[arg(long, value_enum, default_value = "batch")]
    send_mode: SendMode,

    #[arg(long, default_value_t = 6)]
    total: u32,

    /// Sequence numbers whose first transmission is sent with a bad checksum.
    #[arg(long, value_delimiter = ',')]
    corrupt_seqs: Vec<u32>,

    #[arg(long, default_value_t = 4000)]
    timeout_ms: u64,

    #[arg(long, default_value_t = 5)]
    max_retries: u32,
}

fn main() -> Result<(), rtproto::Error> {
    env_logger::init();
    let args = Args::parse();

    let cfg = SenderConfig {
        host: args.host.clone(),
        port: args.port,
        protocol: args.protocol,
        wmax: args.wmax,
        send_mode: args.send_mode,
        total: args.total,
        data_faults: FaultInjector::new().with_corrupt(args.corrupt_seqs),
        timeout: std::time::Duration::from_millis(args.timeout_ms),
        max_retries: args.max_retries,
    };

    info!("sender: connecting to {}:{}", cfg.host, cfg.port);
    let stream = TcpStream::connect((cfg.host.as_str(), cfg.port))?;

    let mut handshake_stream = stream.try_clone()?;
    let result = sender_handshake(&mut handshake_stream, cfg.protocol)?;
    info!(
        "sender: handshake complete, protocol={} rwnd={}",
        result.protocol, result.rwnd
    );

    let engine = SenderEngine::new(&cfg, Clock::real(), result.rwnd);
    let finished = run_sender_session(&stream, engine)?;
    info!(
        "sender: done, base={} cwnd={:.2}",
        finished.base(),
        finished.cwnd()
    );

    Ok(())
}
