use std::net::{Ipv4Addr, SocketAddrV4};
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};
use dnsclient::render::render;
use dnsclient::transport::{Transport, TransportConfig};
use dnsclient::RecordType;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dnsclient")]
#[command(version)]
#[command(about = "Send one DNS query over UDP and print the records in the reply")]
struct Cli {
    /// Seconds to wait for a reply before retransmitting
    #[arg(short, long, default_value = "5", value_parser = parse_timeout)]
    timeout: Duration,

    /// Number of attempts before giving up
    #[arg(short = 'r', long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    max_retries: u32,

    /// UDP port of the DNS server
    #[arg(short, long, default_value_t = 53)]
    port: u16,

    /// Query for mail exchange records
    #[arg(long, conflicts_with_all = ["ns", "cname"])]
    mx: bool,

    /// Query for name server records
    #[arg(long, conflicts_with = "cname")]
    ns: bool,

    /// Query for canonical name records
    #[arg(long)]
    cname: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// IPv4 address of the DNS server, as @a.b.c.d
    #[arg(value_parser = parse_server)]
    server: Ipv4Addr,

    /// Domain name to query
    name: String,
}

impl Cli {
    fn record_type(&self) -> RecordType {
        if self.mx {
            RecordType::Mx
        } else if self.ns {
            RecordType::Ns
        } else if self.cname {
            RecordType::Cname
        } else {
            RecordType::A
        }
    }

    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            server: SocketAddrV4::new(self.server, self.port),
            timeout: self.timeout,
            max_retries: self.max_retries,
        }
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if secs <= 0.0 {
        return Err("timeout must be a positive number of seconds".to_owned());
    }

    Duration::try_from_secs_f64(secs).map_err(|err| format!("timeout `{s}`: {err}"))
}

fn parse_server(s: &str) -> Result<Ipv4Addr, String> {
    let addr = s
        .strip_prefix('@')
        .ok_or_else(|| format!("server `{s}` must be written as @a.b.c.d"))?;

    addr.parse()
        .map_err(|_| format!("`{addr}` is not an IPv4 address"))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!(?cli, "parsed arguments");

    let type_ = cli.record_type();
    println!("DnsClient sending request for {}", cli.name);
    println!("Server: {}", cli.server);
    println!("Request type: {type_}");

    let transport = Transport::new(cli.transport_config());
    let (message, exchange) = match transport.lookup(&cli.name, type_).await {
        Ok(reply) => reply,
        Err(err) => {
            eprintln!("ERROR    {err}");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Response received after {:.3} seconds ({} retries)",
        exchange.elapsed.as_secs_f64(),
        exchange.retries()
    );

    for line in render(&message) {
        println!("{line}");
    }

    if message.response_code().is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
