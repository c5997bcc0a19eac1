mod seed;

use allergo_core::config::transition_policy_from_env_value;
use allergo_core::constants::{
    DEFAULT_BOT_USERNAME, DEFAULT_PUBLIC_BASE_URL, DEFAULT_TELEGRAM_API_BASE,
    DEFAULT_NOTIFY_TIMEOUT_SECS,
};
use allergo_core::{
    CoreConfig, DisabledNotifier, JsonFileOrderStore, Order, OrderService, OrderStore,
    QrPngEncoder, RandomCodeGenerator, ReferralBuilder, ResultsMap, TelegramConfig,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "allergo")]
#[command(about = "AllergoProba order store CLI")]
struct Cli {
    /// Directory holding the order files
    #[arg(long, env = "ORDER_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load demo patients and orders (codes 98711-98718)
    Seed,
    /// List all orders
    List,
    /// Show one order
    Show {
        /// 5-digit order code
        code: String,
    },
    /// List orders for a patient
    FindByIin {
        /// 12-character patient IIN
        iin: String,
    },
    /// Mark blood as taken
    BloodTaken {
        /// 5-digit order code
        code: String,
    },
    /// Upload results and mark the order ready
    UploadResults {
        /// 5-digit order code
        code: String,
        /// Results as Allergen=Label pairs
        #[arg(value_parser = parse_result_pair, required = true)]
        results: Vec<(String, String)>,
    },
}

/// Parses one `Allergen=Label` argument.
fn parse_result_pair(s: &str) -> Result<(String, String), String> {
    let (allergen, label) = s
        .split_once('=')
        .ok_or_else(|| format!("expected Allergen=Label, got '{s}'"))?;
    let allergen = allergen.trim();
    if allergen.is_empty() {
        return Err(format!("missing allergen name in '{s}'"));
    }
    Ok((allergen.to_string(), label.trim().to_string()))
}

fn print_order(order: &Order) {
    println!(
        "Code: {}, Status: {}, Patient: {} ({}), Clinic: {}, Doctor: {}, Tariff: {}",
        order.code,
        order.status,
        order.patient.full_name,
        order.patient.iin,
        order.clinic_name,
        order.doctor_name,
        order.tariff
    );
}

fn print_order_details(order: &Order) {
    print_order(order);
    println!("  Allergens: {}", order.allergens.join(", "));
    println!("  Referral: {}", order.referral.telegram_url);
    match &order.results {
        Some(results) if !results.is_empty() => {
            for (allergen, label) in results {
                println!("  {allergen}: {label}");
            }
        }
        Some(_) => println!("  Results: (empty)"),
        None => println!("  Results: not uploaded"),
    }
}

fn core_config() -> anyhow::Result<Arc<CoreConfig>> {
    // Delivery is off in the CLI; the messaging settings only need to be valid.
    let telegram = TelegramConfig::new(
        None,
        None,
        DEFAULT_TELEGRAM_API_BASE,
        Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS),
    )?;
    let bot_username =
        std::env::var("TELEGRAM_BOT_USERNAME").unwrap_or_else(|_| DEFAULT_BOT_USERNAME.into());
    let public_base_url =
        std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.into());

    Ok(Arc::new(CoreConfig::new(
        &public_base_url,
        &bot_username,
        telegram,
        transition_policy_from_env_value(std::env::var("TRANSITION_POLICY").ok())?,
    )?))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("allergo_cli=info".parse()?)
                .add_directive("allergo_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(command) = cli.command else {
        println!("Use 'allergo --help' for commands");
        return Ok(());
    };

    let Some(data_dir) = cli.data_dir else {
        anyhow::bail!("no data directory given; pass --data-dir or set ORDER_DATA_DIR");
    };

    let cfg = core_config()?;
    let store: Arc<dyn OrderStore> = Arc::new(JsonFileOrderStore::open(&data_dir)?);
    let service = OrderService::new(
        cfg.clone(),
        store.clone(),
        Arc::new(RandomCodeGenerator),
        ReferralBuilder::new(cfg.bot_username(), Arc::new(QrPngEncoder)),
        Arc::new(DisabledNotifier),
    );

    match command {
        Commands::Seed => {
            let report = seed::seed(cfg, store)?;
            println!(
                "Seeded {} orders ({} already present)",
                report.created, report.skipped
            );
        }
        Commands::List => {
            let mut orders = store.list_all()?;
            if orders.is_empty() {
                println!("No orders found.");
            } else {
                orders.sort_by_key(|o| o.id);
                for order in &orders {
                    print_order(order);
                }
            }
        }
        Commands::Show { code } => {
            let order = service.get(&code)?;
            print_order_details(&order);
        }
        Commands::FindByIin { iin } => {
            let orders = service.find_by_iin(&iin)?;
            if orders.is_empty() {
                println!("No orders found for IIN {iin}.");
            }
            for order in &orders {
                print_order(order);
            }
        }
        Commands::BloodTaken { code } => {
            let order = service.mark_blood_taken(&code)?;
            println!("Order {} is now {}", order.code, order.status);
        }
        Commands::UploadResults { code, results } => {
            let results: ResultsMap = results.into_iter().collect();
            let order = service.upload_results(&code, results)?;
            println!("Order {} is now {}", order.code, order.status);
        }
    }

    Ok(())
}
