mod assembler;
mod cli;
mod config;
mod dedup;
mod error;
mod event;
mod extract;
mod forwarder;
mod logging;
mod mixer;
mod pipeline;
mod s_policy;
mod secure;
mod tag;
mod ttlmap;
mod udp_listener;

use std::thread;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use cli::Args;
use config::Config;
use forwarder::Forwarder;
use pipeline::ForwardPipeline;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = Config::load_from_file(&args.config).context("loading config")?;
    let debug = args.debug || cfg.debug;
    logging::init(debug);

    info!(config = %args.config.display(), "starting aismixer");

    let alias_map = config::load_udp_alias_map(&cfg);
    let forwarder =
        Forwarder::new(cfg.forwarders.clone()).context("binding forwarder outbound socket")?;

    let (tx, rx) = mixer::channel();

    for input in &cfg.sec_inputs {
        let listener = secure::SecureListener::bind(&input.listen_ip, input.listen_port, &cfg)
            .with_context(|| {
                format!(
                    "binding secure listener on {}:{}",
                    input.listen_ip, input.listen_port
                )
            })?;
        info!(ip = %input.listen_ip, port = input.listen_port, "secure listener bound");
        let listener_tx = tx.clone();
        thread::spawn(move || listener.run(&listener_tx));
    }

    for input in &cfg.udp_inputs {
        let listener = udp_listener::UdpListener::bind(
            &input.listen_ip,
            input.listen_port,
            input.id.clone(),
            alias_map.clone(),
            debug,
        )
        .with_context(|| {
            format!(
                "binding udp listener on {}:{}",
                input.listen_ip, input.listen_port
            )
        })?;
        info!(ip = %input.listen_ip, port = input.listen_port, "udp listener bound");
        let listener_tx = tx.clone();
        thread::spawn(move || listener.run(&listener_tx));
    }

    // Drop our own sender so the receiver loop below ends if every
    // listener thread ever exits (it otherwise runs forever).
    drop(tx);

    let mut pipeline = ForwardPipeline::new(cfg.station_id.clone(), debug);
    for event in rx {
        pipeline.process(&event, &forwarder);
    }

    Ok(())
}
