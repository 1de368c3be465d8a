//! `roc-send`: captures audio from a device URI and streams it to a remote
//! `AudioSource`/`AudioRepair` endpoint pair over UDP (spec §6 "CLI
//! surface").

use std::net::{SocketAddr, UdpSocket};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use roc::{EndpointSetConfig, FecConfig, SenderEndpointSet};
use roc_audio::{ChannelSet, Frame, SampleSpec};
use roc_demos::device::open_source;
use roc_demos::wire::{bind_nonblocking, UdpControlTransport, UdpFecSink, UdpRtpSink};
use roc_packet::PacketSink;
use roc_shared::error::{Error, Result};

#[derive(Parser)]
#[command(about = "Stream audio to a remote roc receiver")]
struct Args {
    /// AudioSource endpoint to send to, e.g. rtp://239.0.0.1:10001 or rtp+rs8m://host:port
    #[arg(long)]
    source: String,

    /// AudioRepair endpoint, required when `--source` names a FEC scheme
    #[arg(long)]
    repair: Option<String>,

    /// FEC scheme and block size as `<rs8m|ldpc>:<n>:<m>`
    #[arg(long)]
    fec: Option<String>,

    /// AudioControl endpoint for periodic RTCP reports, e.g. rtcp://host:10003
    #[arg(long)]
    control: Option<String>,

    /// Local address to bind the outgoing sockets to
    #[arg(long, default_value = "0.0.0.0:0")]
    bind: String,

    /// Input device URI: `tone:<freq-hz>` or `file:<path>` (raw f32le PCM)
    #[arg(long, default_value = "tone:440")]
    input: String,

    #[arg(long, default_value_t = 44100)]
    rate: u32,

    /// mono or stereo
    #[arg(long, default_value = "stereo")]
    channels: String,

    #[arg(long, default_value_t = 10)]
    payload_type: u8,

    /// Stop after this many seconds (0 = run until the input is exhausted)
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// -v for info, -vv for debug, -vvv for trace; unset is warn-only
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn channel_set(name: &str) -> Result<ChannelSet> {
    match name {
        "mono" => Ok(ChannelSet::mono()),
        "stereo" => Ok(ChannelSet::stereo()),
        other => Err(Error::BadConfig(format!("unrecognized channel layout: {other}"))),
    }
}

fn parse_fec(spec: &str) -> Result<FecConfig> {
    let mut parts = spec.split(':');
    let scheme = parts.next().unwrap_or_default();
    let n: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::BadConfig(format!("bad --fec spec: {spec}")))?;
    let m: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::BadConfig(format!("bad --fec spec: {spec}")))?;
    match scheme {
        "rs8m" => Ok(FecConfig::ReedSolomon8m { n, m }),
        "ldpc" => Ok(FecConfig::LdpcStaircase { n, m }),
        other => Err(Error::BadConfig(format!("unrecognized fec scheme: {other}"))),
    }
}

fn run(args: Args) -> Result<()> {
    let sample_spec = SampleSpec::new(args.rate, channel_set(&args.channels)?);
    let fec = args.fec.as_deref().map(parse_fec).transpose()?;

    let config = EndpointSetConfig::new(
        &args.source,
        args.repair.as_deref(),
        args.control.as_deref(),
        sample_spec,
        args.payload_type,
        fec,
    )?
    .deduce_defaults();

    let bind_ip: SocketAddr = args.bind.parse().map_err(|_| Error::BadConfig(format!("bad --bind address: {}", args.bind)))?;

    let source_socket = UdpSocket::bind(bind_ip)?;
    let source_dest: SocketAddr = format!("{}:{}", config.source.host, config.source.port)
        .parse()
        .map_err(|_| Error::BadConfig("could not resolve source endpoint address".into()))?;
    let source_sink: Box<dyn PacketSink> = Box::new(UdpRtpSink::new(source_socket, source_dest));

    let repair_sink: Option<Box<dyn PacketSink>> = match &config.repair {
        Some(repair_uri) => {
            let socket = UdpSocket::bind((bind_ip.ip(), 0))?;
            let dest: SocketAddr = format!("{}:{}", repair_uri.host, repair_uri.port)
                .parse()
                .map_err(|_| Error::BadConfig("could not resolve repair endpoint address".into()))?;
            Some(Box::new(UdpFecSink::new(socket, dest)))
        }
        None => None,
    };

    let mut endpoint = SenderEndpointSet::new(&config, source_sink, repair_sink);
    if let Some(control_uri) = &config.control {
        let socket = bind_nonblocking(SocketAddr::new(bind_ip.ip(), 0))?;
        let dest: SocketAddr = format!("{}:{}", control_uri.host, control_uri.port)
            .parse()
            .map_err(|_| Error::BadConfig("could not resolve control endpoint address".into()))?;
        let transport: Box<dyn roc::ControlTransport> = Box::new(UdpControlTransport::new(socket, dest));
        endpoint = endpoint.with_control(transport);
    }
    let mut source = open_source(&args.input, sample_spec)?;

    let samples_per_packet =
        roc_shared::time::ns_to_samples(config.packet_length, sample_spec.sample_rate) as usize * sample_spec.num_channels();
    let packet_interval = Duration::from_nanos(config.packet_length);
    let packet_limit = if args.duration_secs == 0 {
        None
    } else {
        Some(args.duration_secs * 1_000_000_000 / config.packet_length)
    };

    log::info!(
        "sending ssrc={} to {} ({} samples/packet)",
        endpoint.ssrc(),
        source_dest,
        samples_per_packet
    );

    let mut sent: u64 = 0;
    loop {
        if let Some(limit) = packet_limit {
            if sent >= limit {
                break;
            }
        }
        let mut frame = Frame::new(samples_per_packet);
        match source.read_frame(&mut frame) {
            Ok(()) => {}
            Err(Error::End) => break,
            Err(e) => return Err(e),
        }
        endpoint.write_frame(&frame)?;
        endpoint.tick_rtcp(std::time::Instant::now(), sent * config.packet_length)?;
        sent += 1;
        std::thread::sleep(packet_interval);
    }

    log::info!("sent {sent} packets");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(1)
        }
    }
}
