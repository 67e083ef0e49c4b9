use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use rtproto::config::AckMode;
use rtproto::handshake::receiver_handshake;
use rtproto::inject::FaultInjector;
use rtproto::transport::run_receiver_session;
use rtproto::{Clock, ReceiverConfig, ReceiverEngine, WindowScheduleEntry};

/// Accepts connections and runs one receiver engine per connection, each
/// on its own thread.
#[derive(Parser, Debug)]
#[command(name = "receiver")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 9000)]
    port: u16,

    #[arg(long, default_value_t = 5)]
    rwnd_ceiling: u32,

    #[arg(long, value_enum, default_value = "individual")]
    ack_mode: AckMode,

    /// Seqs whose outgoing ACK/NAK is silently dropped.
    #[arg(long, value_delimiter = ',')]
    ack_loss_seqs: Vec<u32>,

    /// Seqs whose outgoing ACK/NAK is sent with a bad checksum.
    #[arg(long, value_delimiter = ',')]
    ack_error_seqs: Vec<u32>,

    /// Dynamic window schedule entries as "offset_ms:window", comma separated.
    #[arg(long, value_delimiter = ',')]
    window_schedule: Vec<String>,

    /// Artificial delay before each inbound packet is processed, in milliseconds.
    #[arg(long)]
    processing_delay_ms: Option<u64>,
}

fn parse_schedule(raw: &[String]) -> Vec<WindowScheduleEntry> {
    raw.iter()
        .filter_map(|entry| {
            let (offset_ms, window) = entry.split_once(':')?;
            Some(WindowScheduleEntry {
                offset: Duration::from_millis(offset_ms.parse().ok()?),
                window: window.parse().ok()?,
            })
        })
        .collect()
}

fn main() -> Result<(), rtproto::Error> {
    env_logger::init();
    let args = Args::parse();

    let cfg = ReceiverConfig {
        host: args.host.clone(),
        port: args.port,
        protocol_default: rtproto::Protocol::SelectiveRepeat,
        rwnd_ceiling: args.rwnd_ceiling,
        ack_mode: args.ack_mode,
        ack_faults: FaultInjector::new()
            .with_drop(args.ack_loss_seqs)
            .with_corrupt(args.ack_error_seqs),
        window_schedule: parse_schedule(&args.window_schedule),
        processing_delay: args.processing_delay_ms.map(Duration::from_millis),
    };

    let listener = TcpListener::bind((cfg.host.as_str(), cfg.port))?;
    info!("receiver: listening on {}:{}", cfg.host, cfg.port);

    for incoming in listener.incoming() {
        let stream = match incoming {
            Ok(stream) => stream,
            Err(e) => {
                warn!("receiver: failed to accept connection: {e}");
                continue;
            }
        };
        let cfg = cfg.clone();

        thread::spawn(move || {
            let mut handshake_stream = match stream.try_clone() {
                Ok(s) => s,
                Err(e) => {
                    error!("receiver: failed to clone stream: {e}");
                    return;
                }
            };
            let protocol = match receiver_handshake(&mut handshake_stream, cfg.rwnd_ceiling) {
                Ok(p) => p,
                Err(e) => {
                    error!("receiver: handshake failed: {e}");
                    return;
                }
            };
            info!("receiver: connection established, protocol={protocol}");

            let mut engine = ReceiverEngine::new(&cfg, Clock::real());
            engine.set_protocol(protocol);

            match run_receiver_session(&stream, engine, cfg.processing_delay) {
                Ok(finished) => {
                    info!(
                        "receiver: connection closed, delivered {} packets",
                        finished.delivered().len()
                    );
                }
                Err(e) => error!("receiver: session error: {e}"),
            }
        });
    }

    Ok(())
}
