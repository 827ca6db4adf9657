//! digiseal: command line client for the DigiSeal API.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use digiseal_types::{ProductRegistration, Role};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use digiseal_cli::api::{AccountRoles, ProductHistory, UnregisteredProduct};
use digiseal_cli::{product_id_from_payload, ClientError, DigiSealClient};

/// DigiSeal: product authenticity on the blockchain
#[derive(Parser, Debug)]
#[command(name = "digiseal", version)]
#[command(about = "Register, transfer and verify products through the DigiSeal API")]
struct Args {
    /// DigiSeal API base URL
    #[arg(short, long, env = "DIGISEAL_API", default_value = "http://127.0.0.1:5000")]
    endpoint: String,

    /// Request timeout in seconds (writes wait for the transaction to be mined)
    #[arg(short, long, default_value = "120")]
    timeout: u64,

    /// Print raw JSON instead of a summary
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show API and node status
    Health,
    /// Show a product's details
    Product { product_id: String },
    /// Verify a product from its id or a scanned QR payload
    Verify { payload: String },
    /// Register a new product (caller must hold the manufacturer role)
    Register {
        product_id: String,
        #[arg(long)]
        manufacturer: String,
        #[arg(long)]
        details: String,
        #[arg(long)]
        location: String,
    },
    /// Transfer a product to a new owner
    Transfer { product_id: String, new_owner: String },
    /// Report a product as counterfeit
    Report { product_id: String, reason: String },
    /// Show transfer and verification history
    History { product_id: String },
    /// Grant the seller role to an account
    RegisterSeller { address: String },
    /// List products owned by an account
    Owned { address: String },
    /// List products manufactured by an account
    Manufactured { address: String },
    /// Show an account's roles, or check a single one
    Roles {
        address: String,
        /// manufacturer, seller or admin
        role: Option<Role>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let client = DigiSealClient::new(&args.endpoint, Duration::from_secs(args.timeout))?;
    let json = args.json;

    match args.command {
        Command::Health => {
            let health = client.health().await?;
            emit(json, &health, || {
                println!("{} {} ({})", health.service, health.version, health.status);
                if let Some(node) = &health.blockchain {
                    println!("blockchain: {}", node);
                }
            })
        }
        Command::Product { product_id } => {
            let found = client.product(&product_id).await?;
            emit(json, &found, || print_product(&found.product))
        }
        Command::Verify { payload } => {
            let product_id = product_id_from_payload(&payload)?;
            let outcome = match client.verify(&product_id).await {
                Err(ClientError::Api { status, message }) if status.as_u16() == 404 => {
                    let verdict = UnregisteredProduct::new(&product_id, message);
                    return emit(json, &verdict, || {
                        println!("{}: NOT REGISTERED - possible counterfeit", verdict.product_id)
                    });
                }
                other => other?,
            };
            emit(json, &outcome, || {
                let verdict = if outcome.is_authentic { "AUTHENTIC" } else { "NOT AUTHENTIC" };
                println!("{}: {}", outcome.product_id, verdict);
                print_product(&outcome.product);
                println!("tx: {}", outcome.transaction_hash);
            })
        }
        Command::Register {
            product_id,
            manufacturer,
            details,
            location,
        } => {
            let registration = ProductRegistration {
                product_id,
                manufacturer_name: manufacturer,
                product_details: details,
                manufacturing_location: location,
            };
            let outcome = client.register(&registration).await?;
            emit(json, &outcome, || {
                println!("{}: {}", outcome.product_id, outcome.message);
                println!("tx: {}", outcome.transaction_hash);
            })
        }
        Command::Transfer {
            product_id,
            new_owner,
        } => {
            let outcome = client.transfer(&product_id, &new_owner).await?;
            emit(json, &outcome, || {
                println!("{}", outcome.message);
                println!("tx: {}", outcome.transaction_hash);
            })
        }
        Command::Report { product_id, reason } => {
            let outcome = client.report(&product_id, &reason).await?;
            emit(json, &outcome, || {
                println!("{}", outcome.message);
                println!("tx: {}", outcome.transaction_hash);
            })
        }
        Command::History { product_id } => {
            let history = client.history(&product_id).await?;
            emit(json, &history, || print_history(&history))
        }
        Command::RegisterSeller { address } => {
            let outcome = client.register_seller(&address).await?;
            emit(json, &outcome, || {
                println!("{}", outcome.message);
                println!("tx: {}", outcome.transaction_hash);
            })
        }
        Command::Owned { address } => {
            let list = client.owned(&address).await?;
            emit(json, &list, || print_list(&list.products))
        }
        Command::Manufactured { address } => {
            let list = client.manufactured(&address).await?;
            emit(json, &list, || print_list(&list.products))
        }
        Command::Roles { address, role: None } => {
            let roles = client.roles(&address).await?;
            emit(json, &roles, || print_roles(&roles))
        }
        Command::Roles {
            address,
            role: Some(role),
        } => {
            let check = client.has_role(&address, role).await?;
            emit(json, &check, || {
                println!("{} {}: {}", check.address, check.role, yes_no(check.has_role))
            })
        }
    }
}

/// Prints `value` as JSON, or runs the human-readable printer.
fn emit<T: Serialize>(
    json: bool,
    value: &T,
    human: impl FnOnce(),
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human();
    }
    Ok(())
}

fn print_product(product: &digiseal_types::Product) {
    println!("  id:           {}", product.product_id);
    println!("  manufacturer: {} ({:?})", product.manufacturer_name, product.manufacturer);
    println!("  owner:        {:?}", product.current_owner);
    println!("  made in:      {}", product.manufacturing_location);
    println!("  made at:      {}", product.manufacture_date);
    println!("  details:      {}", product.product_details);
    println!("  status:       {}", product.status);
    println!("  authentic:    {}", yes_no(product.is_authentic));
}

fn print_history(history: &ProductHistory) {
    println!("{}", history.product_id);
    println!("transfers:");
    if history.transfer_history.is_empty() {
        println!("  (none)");
    }
    for t in &history.transfer_history {
        println!("  {}  {:?} -> {:?}", t.timestamp, t.from, t.to);
    }
    println!("verifications:");
    if history.verification_history.is_empty() {
        println!("  (none)");
    }
    for v in &history.verification_history {
        println!("  {}  {:?}  {}", v.timestamp, v.verifier, yes_no(v.is_authentic));
    }
}

fn print_list(products: &[String]) {
    if products.is_empty() {
        println!("(none)");
    }
    for id in products {
        println!("{}", id);
    }
}

fn print_roles(account: &AccountRoles) {
    println!("{}", account.address);
    println!("  manufacturer: {}", yes_no(account.roles.manufacturer));
    println!("  seller:       {}", yes_no(account.roles.seller));
    println!("  admin:        {}", yes_no(account.roles.admin));
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
