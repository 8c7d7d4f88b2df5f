//! hopscan - command-line hop-distance discovery.
//!
//! Runs an ICMP echo trace followed by a TCP connect trace against the
//! same destination, printing the classic per-hop progress markers.

use anyhow::{Context, Result};
use clap::Parser;
use hopscan::{
    run_trace, AddressFamily, IcmpProbe, ReachedVia, TcpProbe, TraceConfig, TraceEvent,
    TraceSummary,
};
use std::io::Write;
use std::net::IpAddr;
use std::time::Duration;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Hop-distance discovery via ICMP echo and TCP connect probing", long_about = None)]
struct Args {
    /// Target hostname or IP address
    host: String,

    /// Target TCP port for connect probing
    #[clap(default_value_t = 443)]
    port: u16,

    /// Per-attempt receive timeout in milliseconds
    #[clap(long, default_value_t = 3000)]
    timeout_ms: u64,

    /// Cap on consecutive timeout retries at one TTL (retries forever
    /// when unset)
    #[clap(long)]
    max_retries: Option<u32>,

    /// Output results in JSON format instead of progress markers
    #[clap(long)]
    json: bool,
}

/// JSON output for one full run.
#[derive(Debug, serde::Serialize)]
struct JsonOutput<'a> {
    version: &'static str,
    target: &'a str,
    target_ip: IpAddr,
    icmp: TraceSummary,
    tcp: TraceSummary,
}

/// ICMP progress markers: `o` per reached hop, `O` per timeout retry.
fn print_icmp_event(event: &TraceEvent) {
    match event {
        TraceEvent::Hop { .. } | TraceEvent::Reached { .. } => eprint!("o"),
        TraceEvent::Retry { .. } => eprint!("O"),
    }
    let _ = std::io::stderr().flush();
}

/// TCP progress: router line per hop, `T` per timeout retry, and the
/// connect verdict for the final hop.
fn print_tcp_event(event: &TraceEvent) {
    match event {
        TraceEvent::Hop { router, .. } => println!("{router}"),
        TraceEvent::Retry { .. } => println!("T"),
        TraceEvent::Reached { ttl, via } => match via {
            ReachedVia::Connected => println!("TTL {ttl} -> connected"),
            ReachedVia::ConnectionRefused => println!("TTL {ttl} -> connREFUSED"),
            ReachedVia::Reply => {}
        },
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = TraceConfig {
        port: args.port,
        probe_timeout: Duration::from_millis(args.timeout_ms),
        first_ttl: 1,
        max_retries: args.max_retries,
    };

    let mut icmp = IcmpProbe::new(AddressFamily::V4)
        .context("creating a raw ICMP socket (root or CAP_NET_RAW required)")?;
    let target_ip = icmp.resolve(&args.host)?;

    let json = args.json;
    let icmp_summary = run_trace(&mut icmp, &config, |event| {
        if !json {
            print_icmp_event(event);
        }
    })?;
    if !json {
        eprintln!();
        eprintln!("ICMP TTL: {}", icmp_summary.hop_count);
    }

    let mut tcp = TcpProbe::new(AddressFamily::V4)?;
    tcp.resolve(&args.host, args.port)?;

    let tcp_summary = run_trace(&mut tcp, &config, |event| {
        if !json {
            print_tcp_event(event);
        }
    })?;
    if !json {
        println!("done");
    }

    if json {
        let output = JsonOutput {
            version: env!("CARGO_PKG_VERSION"),
            target: &args.host,
            target_ip,
            icmp: icmp_summary,
            tcp: tcp_summary,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}
