// src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use nightstand_stream::config::{Config, TransportKind};
use nightstand_stream::fire::FireEffect;
use nightstand_stream::pipeline::PipelineController;
use nightstand_stream::pixel::{Frame, Pixel};
use nightstand_stream::probe::{self, ProbeOptions, DEFAULT_PROBE_PAYLOAD};
use nightstand_stream::rng::StdRandom;
use nightstand_stream::signals;
use nightstand_stream::transport::http::DeviceClient;
use nightstand_stream::transport::{HttpTransport, Transport, WebSocketTransport};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "nightstand", about = "Stream LED frames to a Nightstand matrix")]
struct Cli {
    /// TOML file with device, matrix, stream and network settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args)]
struct DeviceArgs {
    /// Hostname or IP of the ESP32 board
    host: String,
    /// Device port (default: 80)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Stream the fire effect to /params over HTTP
    Http {
        #[command(flatten)]
        device: DeviceArgs,
        /// Seconds between frames (default: 0.08)
        #[arg(long, value_parser = parse_interval)]
        interval: Option<Duration>,
    },
    /// Stream the fire effect over the device's WebSocket endpoint
    Ws {
        #[command(flatten)]
        device: DeviceArgs,
        /// Seconds between frames (default: 0.05)
        #[arg(long, value_parser = parse_interval)]
        interval: Option<Duration>,
        /// WebSocket path on the device (default: /ws)
        #[arg(long)]
        path: Option<String>,
    },
    /// Push one solid-colour frame to /params
    Solid {
        #[command(flatten)]
        device: DeviceArgs,
        /// How many pixels the strip has (default: matrix width x height)
        #[arg(long)]
        count: Option<usize>,
        /// Colour as r,g,b
        #[arg(long, default_value = "255,0,0")]
        color: Pixel,
    },
    /// Check that the device's control server answers on / and /params
    Probe {
        #[command(flatten)]
        device: DeviceArgs,
        /// JSON payload to send to /params
        #[arg(long)]
        payload: Option<String>,
        /// How many times to run the full check before failing
        #[arg(long, default_value_t = 1)]
        retries: u32,
        /// Seconds to wait between retries
        #[arg(long, default_value = "2", value_parser = parse_seconds)]
        wait: Duration,
    },
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{raw}': {e}"))
}

/// Frame intervals are kept in whole milliseconds.
fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = parse_seconds(raw)?;
    if interval < Duration::from_millis(1) {
        return Err(format!("interval '{raw}' is shorter than 1 ms"));
    }
    Ok(interval)
}

fn interval_ms(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

impl DeviceArgs {
    fn apply(&self, config: &mut Config) {
        config.device.host = self.host.clone();
        if let Some(port) = self.port {
            config.device.port = port;
        }
    }
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Cmd::Http { device, interval } => {
            device.apply(&mut config);
            if let Some(interval) = interval {
                config.stream.http_interval_ms = interval_ms(interval);
            }
            stream(&config, TransportKind::Http)
        }
        Cmd::Ws {
            device,
            interval,
            path,
        } => {
            device.apply(&mut config);
            if let Some(interval) = interval {
                config.stream.ws_interval_ms = interval_ms(interval);
            }
            if let Some(path) = path {
                config.device.ws_path = path;
            }
            stream(&config, TransportKind::WebSocket)
        }
        Cmd::Solid {
            device,
            count,
            color,
        } => {
            device.apply(&mut config);
            let count = count.unwrap_or_else(|| config.matrix.pixel_count());
            push_solid(&config, color, count)
        }
        Cmd::Probe {
            device,
            payload,
            retries,
            wait,
        } => {
            device.apply(&mut config);
            let options = ProbeOptions {
                payload: payload.unwrap_or_else(|| DEFAULT_PROBE_PAYLOAD.to_string()),
                retries,
                wait,
            };
            probe_device(&config, &options)
        }
    }
}

fn stream(config: &Config, kind: TransportKind) -> Result<ExitCode> {
    config.validate().context("Invalid configuration")?;
    let interrupt = signals::install_interrupt_handler()?;

    let device = &config.device;
    let transport: Box<dyn Transport> = match kind {
        TransportKind::Http => Box::new(HttpTransport::new(
            &device.host,
            device.port,
            config.network.http_timeout(),
        )),
        TransportKind::WebSocket => Box::new(
            WebSocketTransport::new(&device.host, device.port, &device.ws_path).with_timeouts(
                config.network.ws_connect_timeout(),
                config.network.ws_read_timeout(),
            ),
        ),
    };

    let fire = FireEffect::new(
        config.matrix.width,
        config.matrix.height,
        StdRandom::from_entropy(),
    );
    let controller = PipelineController::new(fire, config.pipeline_settings(kind));
    let outcome = controller.run(transport, interrupt)?;
    Ok(ExitCode::from(outcome.exit_code()))
}

fn push_solid(config: &Config, color: Pixel, count: usize) -> Result<ExitCode> {
    if count == 0 {
        bail!("--count must be at least 1");
    }
    let client = DeviceClient::new(
        &config.device.host,
        config.device.port,
        config.network.http_timeout(),
    );
    info!("Setting {} pixels to {}", count, color);
    let reply = client
        .post_frame(&Frame::solid(color, count))
        .context("POST /params failed")?;
    info!(
        "POST /params -> {} {}: {}",
        reply.status, reply.reason, reply.body
    );
    Ok(if reply.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn probe_device(config: &Config, options: &ProbeOptions) -> Result<ExitCode> {
    let client = DeviceClient::new(
        &config.device.host,
        config.device.port,
        config.network.http_timeout(),
    );
    match probe::run_probe(&client, options) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("[error] {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
