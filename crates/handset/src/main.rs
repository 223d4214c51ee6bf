mod config;
mod device;
mod input;
mod tui;

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use config::HandsetConfig;
use device::Handset;
use input::TiltState;

#[derive(Parser)]
#[command(name = "tiltrace-handset")]
#[command(about = "Tilt handset emulator")]
struct Args {
    #[arg(short = 'H', long, default_value = "127.0.0.1:27040", help = "Base station address")]
    host: String,

    #[arg(short, long, default_value_t = 100, help = "Send interval in ms")]
    interval_ms: u64,

    #[arg(long, help = "No terminal UI; send a fixed tilt")]
    headless: bool,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true, help = "Fixed steering tilt (headless)")]
    steer: i8,

    #[arg(long, default_value_t = 30, allow_hyphen_values = true, help = "Fixed throttle tilt (headless)")]
    throttle: i8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let host: SocketAddr = args
        .host
        .to_socket_addrs()
        .with_context(|| format!("Invalid station address {}", args.host))?
        .next()
        .with_context(|| format!("Station address {} did not resolve", args.host))?;

    let config = HandsetConfig {
        host,
        send_interval: Duration::from_millis(args.interval_ms),
    };
    let mut handset = Handset::new(config)?;

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        *handset.tilt_mut() = TiltState::new(args.steer, args.throttle);
        log::info!("Handset {} talking to {}", handset.address(), host);
        loop {
            handset.update(Instant::now())?;
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    let mut tui = tui::Tui::new()?;
    let result = tui.run(&mut handset);
    tui.restore_terminal()?;
    result?;

    Ok(())
}
