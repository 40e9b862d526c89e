use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use flotilla_engine::{
    dispatch, ConnectDialer, ConnectionStrategy, DirectStrategy, Discovery, DisplayConfig,
    FallbackStrategy, Renderer, RequestTemplate, TransportSettings, TunnelDialer,
    TunneledStrategy, UpgradeDialer,
};
use flotilla_logging::{flotilla_error, flotilla_info, flotilla_warn};

use super::cli::{Cli, Command, SailArgs};
use super::config::{BrokerConfig, BrokerKind, Config};
use super::output::write_json_lines;
use super::ui::{PlainRenderer, TerminalRenderer};
use super::logging;

const EXIT_FATAL: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

pub fn run_app() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            flotilla_error!("{:#}", err);
            eprintln!("flotilla: {:#}", err);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        config: config_path,
        refresh_ms,
        direct,
        command,
        ..
    } = cli;
    let config = Config::load(config_path.as_deref())?;

    match command {
        Command::Groups => {
            list_groups(&config, &mut io::stdout().lock())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Sail(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("starting async runtime")?;
            runtime.block_on(sail(&config, args, refresh_ms, direct))
        }
    }
}

async fn sail(
    config: &Config,
    args: SailArgs,
    refresh_ms: Option<u64>,
    direct: bool,
) -> Result<ExitCode> {
    let targets = config.discovery().resolve_targets(&args.group).await?;

    let template = RequestTemplate::new(&args.method, &args.scheme, args.port, &args.path)?
        .headers(
            args.headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )?;

    let brokers = if direct { &[][..] } else { config.brokers() };
    if !brokers.is_empty() && template.scheme() != "http" {
        bail!(
            "{} requests cannot be sent through a tunnel broker; use --direct",
            template.scheme()
        );
    }
    let strategy = build_strategy(brokers, template.port())?;

    let display = DisplayConfig::new(renderer(args.json))
        .with_refresh_interval(config.refresh_interval(refresh_ms));

    flotilla_info!(
        "sailing {} {} to group {:?} ({} target(s))",
        template.method(),
        args.path,
        args.group,
        targets.len()
    );
    let report = dispatch(&targets, |target| template.build(target), strategy, display)
        .await
        .context("dispatch failed")?;

    if let Some(err) = report.render_error() {
        flotilla_warn!("display stopped early: {}", err);
        eprintln!("flotilla: display stopped early: {err}");
    }

    if args.json {
        write_json_lines(&mut io::stdout().lock(), &report.outcomes)
            .context("writing JSON output")?;
    }

    if report.interrupted() {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}

/// Direct when no brokers are configured, otherwise the brokers in order.
fn build_strategy(
    brokers: &[BrokerConfig],
    requested_port: u16,
) -> Result<Arc<dyn ConnectionStrategy>> {
    if brokers.is_empty() {
        let direct = DirectStrategy::new(&TransportSettings::default())
            .context("building HTTP client")?;
        return Ok(Arc::new(direct));
    }

    let strategies = brokers
        .iter()
        .map(|broker| {
            let dialer: Arc<dyn TunnelDialer> = match broker.kind {
                BrokerKind::Upgrade => {
                    let dialer = UpgradeDialer::new(broker.address.as_str());
                    match &broker.protocol {
                        Some(protocol) => Arc::new(dialer.with_protocol(protocol.as_str())),
                        None => Arc::new(dialer),
                    }
                }
                BrokerKind::Connect => Arc::new(ConnectDialer::new(broker.address.as_str())),
            };
            Arc::new(TunneledStrategy::new(dialer, requested_port)) as Arc<dyn ConnectionStrategy>
        })
        .collect();
    Ok(Arc::new(FallbackStrategy::new(strategies)))
}

/// The display goes to stderr when stdout carries JSON.
fn renderer(json: bool) -> Box<dyn Renderer> {
    if json {
        let stderr = io::stderr();
        if stderr.is_terminal() {
            Box::new(TerminalRenderer::new(stderr))
        } else {
            Box::new(PlainRenderer::new(stderr))
        }
    } else {
        let stdout = io::stdout();
        if stdout.is_terminal() {
            Box::new(TerminalRenderer::new(stdout))
        } else {
            Box::new(PlainRenderer::new(stdout))
        }
    }
}

fn list_groups(config: &Config, out: &mut impl Write) -> io::Result<()> {
    if config.groups.is_empty() {
        writeln!(out, "no groups configured")?;
        return Ok(());
    }
    for (name, members) in &config.groups {
        let live = members.iter().filter(|member| member.ready).count();
        writeln!(out, "{name} ({live}/{} live)", members.len())?;
        for member in members {
            let state = if member.ready { "ready" } else { "not ready" };
            writeln!(out, "  {} {} {}", member.name, member.address, state)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::list_groups;
    use crate::platform::config::Config;
    use pretty_assertions::assert_eq;

    #[test]
    fn lists_groups_with_live_counts() {
        let config = Config::parse(
            r#"(groups: {
                "web": [
                    (name: "web-0", address: "10.0.0.1"),
                    (name: "web-1", address: "10.0.0.2", ready: false),
                ],
            })"#,
        )
        .unwrap();

        let mut out = Vec::new();
        list_groups(&config, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "web (1/2 live)\n  web-0 10.0.0.1 ready\n  web-1 10.0.0.2 not ready\n"
        );
    }

    #[test]
    fn empty_configuration_says_so() {
        let mut out = Vec::new();
        list_groups(&Config::default(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "no groups configured\n");
    }
}
