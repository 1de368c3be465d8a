//! `roc-recv`: listens on a local `AudioSource`/`AudioRepair` endpoint pair
//! and plays the recovered audio out to a device URI (spec §6 "CLI
//! surface").

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use roc::{EndpointSetConfig, FecConfig, ReceiverEndpointSet};
use roc_audio::{ChannelSet, Frame, SampleSpec};
use roc_demos::device::open_sink;
use roc_demos::wire::{bind_nonblocking, UdpControlTransport, UdpFecSource, UdpRtpSource};
use roc_packet::PacketSource;
use roc_shared::error::{Error, Result};

#[derive(Parser)]
#[command(about = "Receive a roc audio stream and play it to a device")]
struct Args {
    /// AudioSource endpoint to listen on, e.g. rtp://0.0.0.0:10001 or rtp+rs8m://0.0.0.0:10001
    #[arg(long)]
    source: String,

    /// AudioRepair endpoint to listen on, required when `--source` names a FEC scheme
    #[arg(long)]
    repair: Option<String>,

    /// FEC scheme and block size as `<rs8m|ldpc>:<n>:<m>`
    #[arg(long)]
    fec: Option<String>,

    /// AudioControl endpoint to listen on for periodic RTCP reports, e.g. rtcp://0.0.0.0:10003
    #[arg(long)]
    control: Option<String>,

    /// Output device URI: `file:<path>` (raw f32le PCM) or `null:`
    #[arg(long, default_value = "null:")]
    output: String,

    #[arg(long, default_value_t = 44100)]
    rate: u32,

    /// mono or stereo
    #[arg(long, default_value = "stereo")]
    channels: String,

    #[arg(long, default_value_t = 10)]
    payload_type: u8,

    /// Stop after this many seconds (0 = run until interrupted)
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

    let source_local: SocketAddr = format!("{}:{}", config.source.host, config.source.port)
        .parse()
        .map_err(|_| Error::BadConfig("could not resolve source endpoint address".into()))?;
    let mut source_transport = UdpRtpSource::new(bind_nonblocking(source_local)?)?;

    let mut repair_transport = match &config.repair {
        Some(repair_uri) => {
            let local: SocketAddr = format!("{}:{}", repair_uri.host, repair_uri.port)
                .parse()
                .map_err(|_| Error::BadConfig("could not resolve repair endpoint address".into()))?;
            let scheme = config.fec.expect("repair endpoint implies a configured fec scheme").scheme();
            Some(UdpFecSource::new(bind_nonblocking(local)?, scheme))
        }
        None => None,
    };

    let mut endpoint = ReceiverEndpointSet::new(config.clone())?;
    if let Some(control_uri) = &config.control {
        let local: SocketAddr = format!("{}:{}", control_uri.host, control_uri.port)
            .parse()
            .map_err(|_| Error::BadConfig("could not resolve control endpoint address".into()))?;
        let socket = bind_nonblocking(local)?;
        // Outbound reports go back to the sender's host on the control
        // port it was told to listen on; inbound reports arrive from
        // whoever sends to `local`.
        let dest: SocketAddr = format!("{}:{}", config.source.host, control_uri.port)
            .parse()
            .map_err(|_| Error::BadConfig("could not resolve control peer address".into()))?;
        let transport: Box<dyn roc::ControlTransport> = Box::new(UdpControlTransport::new(socket, dest));
        endpoint = endpoint.with_control(transport);
    }
    let mut sink = open_sink(&args.output)?;

    let samples_per_packet =
        roc_shared::time::ns_to_samples(config.packet_length, sample_spec.sample_rate) as usize * sample_spec.num_channels();
    let tick = Duration::from_nanos(config.packet_length);
    let tick_limit = if args.duration_secs == 0 {
        None
    } else {
        Some(args.duration_secs * 1_000_000_000 / config.packet_length)
    };

    log::info!("listening on {source_local} ({samples_per_packet} samples/packet)");

    let mut elapsed_ns: u64 = 0;
    let mut ticks: u64 = 0;
    loop {
        if let Some(limit) = tick_limit {
            if ticks >= limit {
                break;
            }
        }

        while let Some(packet) = source_transport.read()? {
            endpoint.on_packet(packet);
        }
        if let Some(repair) = &mut repair_transport {
            while let Some(packet) = repair.read()? {
                endpoint.on_packet(packet);
            }
        }

        for ssrc in endpoint.sessions() {
            let mut frame = Frame::new(samples_per_packet);
            if let Some(cause) = endpoint.produce_frame(ssrc, elapsed_ns, &mut frame)? {
                log::info!("session {ssrc} died: {cause:?}");
                continue;
            }
            sink.write_frame(&frame)?;
        }
        for dead_ssrc in endpoint.sweep_dead_sessions() {
            log::info!("session {dead_ssrc} swept after no-playback timeout");
        }
        endpoint.tick_rtcp(std::time::Instant::now(), elapsed_ns)?;

        elapsed_ns += config.packet_length;
        ticks += 1;
        std::thread::sleep(tick);
    }

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
