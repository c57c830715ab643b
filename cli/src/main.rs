//! inpage CLI — exercise the in-page provider runtime from the terminal.
//!
//! Usage:
//! ```bash
//! # Run a scripted page + wallet session and print every event
//! inpage demo --config fixtures/inpage.json
//!
//! # Same, with JSON structured logs
//! inpage demo --json
//!
//! # Check a configuration file without running anything
//! inpage validate --config fixtures/inpage.json
//! ```

mod backend;

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use inpage_core::logging::init_tracing;
use inpage_core::HostWindow;
use inpage_provider::{
    create_inpage_provider, InpageConfig, InpageProvider, PageEvent, PageScope, ANNOUNCE_EVENT,
};
use serde_json::json;

use backend::ScriptedWallet;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "demo" => cmd_demo(&args[2..]).await,
        "validate" => cmd_validate(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("inpage {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("inpage {}", env!("CARGO_PKG_VERSION"));
    println!("Simulate an EIP-1193 / EIP-6963 in-page wallet provider\n");
    println!("USAGE:");
    println!("    inpage <COMMAND>\n");
    println!("COMMANDS:");
    println!("    demo       Run a scripted page and wallet session");
    println!("    validate   Validate a configuration file");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("FLAGS:");
    println!("    --config <FILE>   JSON configuration  [required for validate]");
    println!("    --json            Emit JSON structured logs (demo)");
}

fn load_config(args: &[String]) -> anyhow::Result<InpageConfig> {
    match parse_flag(args, "--config") {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {path}"))?;
            InpageConfig::from_json(&content).with_context(|| format!("invalid config {path}"))
        }
        None => Ok(InpageConfig::default()),
    }
}

fn cmd_validate(args: &[String]) -> anyhow::Result<()> {
    if parse_flag(args, "--config").is_none() {
        anyhow::bail!("--config is required");
    }
    let config = load_config(args)?;
    config.validate()?;

    println!("Configuration OK");
    println!("  Origin:       {}", config.origin);
    println!(
        "  Channel:      {} -> {}",
        config.provider.message_name, config.provider.message_target
    );
    println!("  Max pending:  {}", config.provider.max_pending);
    println!("  Provider:     {} ({})", config.info.name, config.info.rdns);
    Ok(())
}

async fn cmd_demo(args: &[String]) -> anyhow::Result<()> {
    let mut config = load_config(args)?;
    if args.iter().any(|a| a == "--json") {
        config.log.json = true;
    }
    config.validate()?;
    init_tracing(&config.log).context("failed to install tracing subscriber")?;

    let page = PageScope::new(config.origin.clone());
    let mut page_failures = page.listener_failures();
    page.add_event_listener(ANNOUNCE_EVENT, |event| {
        if let PageEvent::AnnounceProvider(detail) = event {
            let info = &detail.info;
            println!("  [page] announce  {} ({}) uuid={}", info.name, info.rdns, info.uuid);
        }
        Ok(())
    });

    let wallet = ScriptedWallet::install(&page, &config.provider);
    let provider = create_inpage_provider(&page, config.provider.clone(), config.info.clone())?;
    let mut provider_failures = provider.listener_failures();
    print_events(&provider);

    println!("Page {} ready, provider injected", page.origin());

    println!("\n-- wallet pushes chain and unlock state");
    wallet.push("chainChanged", json!({"chainId": wallet.chain_id()}));
    wallet.push(
        "unlockStateChanged",
        json!({"accounts": wallet.accounts(), "unlocked": true}),
    );

    println!("\n-- dapp calls");
    for args in [
        json!({"method": "eth_chainId"}),
        json!({"method": "eth_requestAccounts"}),
        json!({"method": "eth_blockNumber", "params": []}),
        json!({"method": "eth_sendTransaction", "params": [{"to": wallet.accounts()[1], "value": "0x0"}]}),
        json!({"method": "wallet_unknownMethod"}),
        json!({"method": "eth_call", "params": "0x"}),
    ] {
        call(&provider, args).await;
    }

    println!("\n-- late dapp requests providers");
    page.dispatch_event(PageEvent::RequestProvider)?;

    println!("\n-- wallet switches chain, then disconnects");
    wallet.push("chainChanged", json!({"chainId": "0x89"}));
    wallet.push("disconnect", json!(null));

    println!("\nSummary");
    println!("  Connected:        {}", provider.is_connected());
    println!("  Chain:            {}", provider.chain_id().unwrap_or_else(|| "-".into()));
    println!("  Selected address: {}", provider.selected_address().unwrap_or_else(|| "-".into()));
    println!("  Pending calls:    {}", provider.pending_requests());

    while let Ok(failure) = page_failures.try_recv() {
        println!("  Page listener failure:     {} {}", failure.event_type, failure.message);
    }
    while let Ok(failure) = provider_failures.try_recv() {
        println!("  Provider listener failure: {} {}", failure.event_type, failure.message);
    }
    Ok(())
}

async fn call(provider: &Arc<InpageProvider>, args: serde_json::Value) {
    let method = args["method"].as_str().unwrap_or("<invalid>").to_string();
    match provider.request_value(args).await {
        Ok(result) => println!("  {method:<22} -> {result}"),
        Err(err) => {
            let rpc = err.to_rpc_error();
            let stage = if err.is_rejected_before_send() { " (not sent)" } else { "" };
            println!("  {method:<22} !! {} {}{stage}", rpc.code, rpc.message);
        }
    }
}

fn print_events(provider: &Arc<InpageProvider>) {
    for name in ["connect", "disconnect", "accountsChanged", "chainChanged", "error"] {
        provider.on(name, |event| {
            println!("  [provider] {event:?}");
            Ok(())
        });
    }
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}
