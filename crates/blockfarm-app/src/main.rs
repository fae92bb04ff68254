//! BlockFarm command-line shell
//!
//! One registry action per invocation. The wallet is connected first,
//! role membership is loaded (failing closed on error), and the command
//! is dispatched only if its module is available to the account.

use std::collections::HashMap;
use std::env;

use anyhow::{bail, Context, Result};
use blockfarm_app::forms::{LegalField, LotField, TransferField};
use blockfarm_app::{App, AppConfig};
use blockfarm_chain::{EnvWallet, LotTrace, OwnershipRecord, Role, WalletProvider};
use ethers::types::H256;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().cloned() else {
        print!("{}", help_text());
        return Ok(());
    };
    if command == "help" || command == "--help" {
        print!("{}", help_text());
        return Ok(());
    }

    let (positionals, flags) = parse_args(&args[1..])?;

    let config = AppConfig::from_env().context("incomplete environment configuration")?;
    let mut app = App::new(config, EnvWallet::from_env());

    let account = app.connect().await.context("wallet connection failed")?;
    tracing::info!(account = %account, "session established");

    if let Err(err) = app.refresh_roles().await {
        tracing::warn!(%err, "role query failed; role-gated modules are hidden");
    }
    apply_pending_wallet_events(&mut app);

    match command.as_str() {
        "register" => run_register(&mut app, &flags).await,
        "transfer" => run_transfer(&mut app, &flags).await,
        "trace" => run_trace(&mut app, &positionals, &flags).await,
        "roles" => run_roles(&app),
        "grant" => run_role_action(&mut app, &positionals, true).await,
        "revoke" => run_role_action(&mut app, &positionals, false).await,
        other => bail!("unknown command `{other}`; run `blockfarm help`"),
    }
}

async fn run_register<P: WalletProvider>(
    app: &mut App<P>,
    flags: &HashMap<String, String>,
) -> Result<()> {
    app.lot_form.set(LotField::MedicineName, flag(flags, "medicine")?);
    if flags.contains_key("generate-code") {
        let code = app.lot_form.generate_series_code().to_string();
        println!("Generated series code: {code}");
    } else {
        app.lot_form.set(LotField::SeriesCode, flag(flags, "series")?);
    }
    app.lot_form.set(LotField::MfgDate, flag(flags, "mfg")?);
    app.lot_form.set(LotField::ExpDate, flag(flags, "exp")?);
    app.lot_form.set(LotField::Quantity, flag(flags, "qty")?);

    app.legal_form.set(LegalField::FullName, flag(flags, "rep-name")?);
    app.legal_form.set(LegalField::NationalId, flag(flags, "rep-id")?);
    if let Some(phone) = flags.get("rep-phone") {
        app.legal_form.set(LegalField::Phone, phone.clone());
    }
    if let Some(email) = flags.get("rep-email") {
        app.legal_form.set(LegalField::Email, email.clone());
    }

    let summary = app.register_lot().await?;
    println!(
        "Lot {} ({}) registered by {:#x}",
        summary.series_code, summary.medicine_name, summary.account
    );
    println!("  quantity: {}", summary.quantity);
    println!(
        "  responsible: {} ({})",
        summary.responsible.full_name, summary.responsible.national_id
    );
    print_tx(summary.transaction_hash, summary.explorer_url.as_deref());
    Ok(())
}

async fn run_transfer<P: WalletProvider>(
    app: &mut App<P>,
    flags: &HashMap<String, String>,
) -> Result<()> {
    app.transfer_form.set(TransferField::SeriesCode, flag(flags, "series")?);
    app.transfer_form.set(TransferField::Recipient, flag(flags, "to")?);
    app.transfer_form.set(TransferField::Quantity, flag(flags, "qty")?);

    let outcome = app.transfer_lot().await?;
    println!("Transfer confirmed");
    print_tx(
        outcome.transaction_hash,
        app.config().tx_url(outcome.transaction_hash).as_deref(),
    );
    Ok(())
}

async fn run_trace<P: WalletProvider>(
    app: &mut App<P>,
    positionals: &[String],
    flags: &HashMap<String, String>,
) -> Result<()> {
    let Some(series_code) = positionals.first() else {
        bail!("usage: blockfarm trace <series-code> [--json]");
    };

    let trace = app.trace(series_code).await?;
    if flags.contains_key("json") {
        println!("{}", serde_json::to_string_pretty(&TraceOutput::from(&trace))?);
    } else {
        print_trace(series_code, &trace);
    }
    Ok(())
}

fn run_roles<P: WalletProvider>(app: &App<P>) -> Result<()> {
    use blockfarm_app::{short_address, RoleGate};

    if let Some(account) = app.account() {
        println!("Account: {}", short_address(account));
    }
    match app.session.gate() {
        RoleGate::Ready(roles) => {
            if roles.is_empty() {
                println!("No operational roles are assigned to this account.");
                println!("Ask an administrator to grant one.");
            } else {
                let held: Vec<String> =
                    roles.held().iter().map(|role| role.to_string()).collect();
                println!("Held roles: {}", held.join(", "));
            }
        }
        RoleGate::Failed(message) => {
            println!("Role membership could not be loaded: {message}");
            println!("Retry the command to query again.");
        }
        RoleGate::Loading | RoleGate::Disconnected => {
            println!("Role membership is not available.");
        }
    }

    let modules: Vec<&str> = app
        .session
        .visible_tabs()
        .iter()
        .map(|tab| tab.label())
        .collect();
    println!("Available modules: {}", modules.join(", "));
    Ok(())
}

async fn run_role_action<P: WalletProvider>(
    app: &mut App<P>,
    positionals: &[String],
    grant: bool,
) -> Result<()> {
    let action = if grant { "grant" } else { "revoke" };
    let [role, address] = positionals else {
        bail!("usage: blockfarm {action} <role> <address>");
    };

    app.role_form.select_role(role.parse::<Role>()?);
    app.role_form.set_target(address.clone());

    let outcome = if grant {
        app.assign_role().await?
    } else {
        app.revoke_role().await?
    };
    println!("Role {action} confirmed");
    print_tx(
        outcome.transaction_hash,
        app.config().tx_url(outcome.transaction_hash).as_deref(),
    );
    Ok(())
}

/// Machine-readable form of a traceability result.
#[derive(Serialize)]
struct TraceOutput<'a> {
    lot_id: String,
    lot: &'a blockfarm_chain::Lot,
    timeline: Option<&'a [OwnershipRecord]>,
    timeline_error: Option<String>,
}

impl<'a> From<&'a LotTrace> for TraceOutput<'a> {
    fn from(trace: &'a LotTrace) -> Self {
        TraceOutput {
            lot_id: format!("{:#x}", H256::from(trace.lot_id)),
            lot: &trace.lot,
            timeline: trace.timeline.as_ref().ok().map(|records| records.as_slice()),
            timeline_error: trace.timeline.as_ref().err().map(|err| err.to_string()),
        }
    }
}

fn print_trace(series_code: &str, trace: &LotTrace) {
    let lot = &trace.lot;
    println!("Lot {series_code}: {}", lot.medicine_name);
    println!("  lot id: {:#x}", H256::from(trace.lot_id));
    println!("  active ingredient: {}", lot.active_ingredient);
    println!("  health registration: {}", lot.health_registration);
    println!("  quantity: {}", lot.quantity);
    println!(
        "  manufactured {} / expires {}",
        format_date(lot.manufacture_date),
        format_date(lot.expiry_date)
    );
    println!(
        "  responsible: {} ({})",
        lot.responsible.full_name, lot.responsible.national_id
    );
    println!("  current owner: {:#x}", lot.owner);

    match &trace.timeline {
        Ok(records) => {
            println!("Ownership timeline:");
            for (index, record) in records.iter().enumerate() {
                let origin = match record.from {
                    Some(from) => format!("{from:#x}"),
                    None => "genesis".to_string(),
                };
                let marker = if record.is_current_owner { "  [current owner]" } else { "" };
                println!(
                    "  {}. {} -> {:#x} at {} (block {}, log {}){marker}",
                    index + 1,
                    origin,
                    record.to,
                    format_date(record.timestamp),
                    record.block_number,
                    record.log_index,
                );
            }
        }
        Err(err) => {
            println!("Ownership timeline unavailable: {err}");
            println!("Lot details above are current; retry to rebuild the timeline.");
        }
    }
}

fn print_tx(hash: H256, explorer_url: Option<&str>) {
    println!("  transaction: {hash:#x}");
    if let Some(url) = explorer_url {
        println!("  explorer: {url}");
    }
}

fn format_date(epoch_seconds: u64) -> String {
    i64::try_from(epoch_seconds)
        .ok()
        .and_then(|seconds| chrono::DateTime::from_timestamp(seconds, 0))
        .map(|instant| instant.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| epoch_seconds.to_string())
}

/// Apply change signals the provider delivered since connecting.
fn apply_pending_wallet_events<P: WalletProvider>(app: &mut App<P>) {
    let Some(mut events) = app.wallet_events() else { return };
    while let Ok(event) = events.try_recv() {
        app.apply_wallet_event(event);
    }
}

/// Split arguments into positionals and `--flag [value]` pairs. A flag
/// followed by another flag (or nothing) is boolean-valued.
fn parse_args(args: &[String]) -> Result<(Vec<String>, HashMap<String, String>)> {
    let mut positionals = Vec::new();
    let mut flags = HashMap::new();
    let mut index = 0;
    while index < args.len() {
        let arg = &args[index];
        if let Some(name) = arg.strip_prefix("--") {
            if name.is_empty() {
                bail!("empty flag name");
            }
            let value = match args.get(index + 1) {
                Some(next) if !next.starts_with("--") => {
                    index += 1;
                    next.clone()
                }
                _ => "true".to_string(),
            };
            flags.insert(name.to_string(), value);
        } else {
            positionals.push(arg.clone());
        }
        index += 1;
    }
    Ok((positionals, flags))
}

fn flag<'a>(flags: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    flags
        .get(name)
        .map(String::as_str)
        .with_context(|| format!("missing required flag --{name}"))
}

fn help_text() -> String {
    [
        "blockfarm - pharmaceutical batch registry client",
        "",
        "Usage: blockfarm <command> [options]",
        "",
        "Commands:",
        "  register   Register a new lot",
        "             --medicine <name> --series <code> | --generate-code",
        "             --mfg <YYYY-MM-DD> --exp <YYYY-MM-DD> --qty <n>",
        "             --rep-name <name> --rep-id <id> [--rep-phone <p>] [--rep-email <e>]",
        "  transfer   Transfer a lot: --series <code> --to <address> --qty <n>",
        "  trace      Reconstruct a lot's ownership timeline: trace <series-code> [--json]",
        "  roles      Show the connected account's roles and available modules",
        "  grant      Grant a role: grant <role> <address>",
        "  revoke     Revoke a role: revoke <role> <address>",
        "  help       Show this message",
        "",
        "Roles: admin, manufacturer, distributor, pharmacy",
        "",
        "Environment:",
        "  BLOCKFARM_RPC_URL           JSON-RPC endpoint (required)",
        "  BLOCKFARM_CONTRACT_ADDRESS  Registry contract address (required)",
        "  BLOCKFARM_CHAIN_ID          Chain id for signing (required)",
        "  BLOCKFARM_PRIVATE_KEY       Signing key for the session (required)",
        "  BLOCKFARM_EXPLORER_URL      Block-explorer base for tx links (optional)",
        "",
    ]
    .join("\n")
}
