#![forbid(unsafe_code)]
//! AgriChain command-line front end

use agrichain::analytics::{block_value, Analytics};
use agrichain::blockchain::{BlockFields, ChainStatus};
use agrichain::cli::load_ledger_from_config;
use agrichain::export::{self, CsvMode};
use agrichain::supply_chain::{
    create_contract, execute_contract_by_id, record_tracking_event, ContractKind, NewContract,
    NewTrackingEvent, QualityGrade, TrackingStatus,
};
use agrichain::synthetic::{SyntheticGenerator, MONTHS};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Produce-tracking ledger for agricultural supply chains", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./agrichain.toml, then ~/.agrichain/agrichain.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Records a produce transaction
    Add {
        #[arg(long)]
        farmer: String,
        #[arg(long)]
        crop: String,
        /// Quantity in kg
        #[arg(long)]
        quantity: String,
        /// Price per kg
        #[arg(long)]
        price: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Lists every block
    List,
    /// Prints one block as JSON
    Show { index: usize },
    /// Verifies every hash and link in the ledger
    Verify,
    /// Verifies a single block, optionally against a known hash
    VerifyBlock {
        index: usize,
        #[arg(long)]
        expected_hash: Option<String>,
    },
    /// Exports the ledger or its analytics
    Export {
        #[arg(value_enum)]
        kind: ExportKind,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Override the configured CSV mode
        #[arg(long)]
        csv: Option<CsvMode>,
    },
    /// Deletes every block (irreversible)
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Records a supply chain event for an existing block
    Track {
        block_index: usize,
        #[arg(long)]
        location: String,
        #[arg(long)]
        handler: String,
        #[arg(long, value_enum, default_value_t = StatusArg::Transit)]
        status: StatusArg,
        #[arg(long, value_enum, default_value_t = QualityArg::A)]
        quality: QualityArg,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        humidity: Option<f64>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Creates or executes smart contracts
    Contract {
        #[command(subcommand)]
        action: ContractAction,
    },
    /// Prints a synthetic monthly demand curve
    Predict {
        #[arg(long)]
        crop: String,
        #[arg(long)]
        season: i32,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Prints synthetic IoT sensor readings
    Sensors {
        #[arg(default_value_t = 5)]
        count: usize,
        #[arg(long, default_value = "SHIPMENT-1")]
        shipment: String,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ContractAction {
    /// Creates a pending contract
    Create {
        #[arg(long, value_enum, default_value_t = KindArg::SupplyChain)]
        kind: KindArg,
        /// Comma separated parties
        #[arg(long)]
        parties: String,
        #[arg(long)]
        terms: String,
        /// Conditions, one per line
        #[arg(long, default_value = "")]
        conditions: String,
    },
    /// Executes a contract by id
    Execute { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Ledger,
    Csv,
    Analytics,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Origin,
    Transit,
    Storage,
    Processing,
    Delivered,
}

impl From<StatusArg> for TrackingStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Origin => TrackingStatus::Origin,
            StatusArg::Transit => TrackingStatus::Transit,
            StatusArg::Storage => TrackingStatus::Storage,
            StatusArg::Processing => TrackingStatus::Processing,
            StatusArg::Delivered => TrackingStatus::Delivered,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QualityArg {
    A,
    B,
    C,
}

impl From<QualityArg> for QualityGrade {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::A => QualityGrade::A,
            QualityArg::B => QualityGrade::B,
            QualityArg::C => QualityGrade::C,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    SupplyChain,
    QualityAssurance,
    Payment,
    Insurance,
}

impl From<KindArg> for ContractKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::SupplyChain => ContractKind::SupplyChain,
            KindArg::QualityAssurance => ContractKind::QualityAssurance,
            KindArg::Payment => ContractKind::Payment,
            KindArg::Insurance => ContractKind::Insurance,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = match cli.command {
        Commands::Predict { crop, season, seed } => {
            predict(&crop, season, seed);
            return Ok(());
        }
        Commands::Sensors {
            count,
            shipment,
            seed,
        } => return sensors(count, &shipment, seed),
        other => other,
    };

    let (config, mut ledger) = load_ledger_from_config(cli.config.as_deref())?;

    match command {
        Commands::Add {
            farmer,
            crop,
            quantity,
            price,
            notes,
        } => {
            let fields = BlockFields::new(farmer, crop, quantity, price).with_notes(notes);
            fields.validate_required()?;
            let block = ledger.append(fields)?;
            println!("{}", "✅ Block added".bright_green().bold());
            println!("   Index:     #{}", block.index);
            println!("   Hash:      {}", block.hash.bright_yellow());
            println!("   Previous:  {}", block.prev_hash);
            println!("   Timestamp: {}", block.timestamp);
        }
        Commands::List => list(&ledger, &config.export.currency),
        Commands::Show { index } => {
            let block = ledger
                .get(index)
                .ok_or(agrichain::error::ChainError::InvalidIndex {
                    index,
                    len: ledger.len(),
                })?;
            println!("{}", serde_json::to_string_pretty(block)?);
        }
        Commands::Verify => {
            let report = ledger.verify();
            match report.status() {
                ChainStatus::Empty => {
                    println!("{}", "📭 No ledger data to verify. Add some blocks first.".yellow());
                }
                ChainStatus::Valid => {
                    println!(
                        "{}",
                        format!("🔒 Ledger valid: all {} block(s) are properly linked.", report.per_block.len())
                            .bright_green()
                            .bold()
                    );
                }
                ChainStatus::Compromised => {
                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .set_content_arrangement(ContentArrangement::Dynamic)
                        .set_header(vec![
                            Cell::new("Block").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
                            Cell::new("Hash").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
                            Cell::new("Link").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
                        ]);
                    for r in report.per_block.iter().filter(|r| !r.valid) {
                        table.add_row(vec![
                            Cell::new(format!("#{}", r.index)),
                            check_cell(r.hash_valid),
                            check_cell(r.prev_hash_valid),
                        ]);
                    }
                    println!("{}", "⚠️  Ledger compromised: some blocks have invalid hashes or links.".red().bold());
                    println!("{}", table);
                    return Err(format!(
                        "{} of {} block(s) failed verification",
                        report.invalid_blocks().len(),
                        report.per_block.len()
                    )
                    .into());
                }
            }
        }
        Commands::VerifyBlock {
            index,
            expected_hash,
        } => {
            let result = ledger.verify_block(index, expected_hash.as_deref())?;
            if result.valid {
                println!("{}", format!("✅ Block #{} is valid and verified.", index).bright_green());
            } else {
                println!(
                    "{}",
                    format!("❌ Block #{} verification failed.", index).red().bold()
                );
                println!("   Hash recomputed:  {}", yes_no(result.hash_valid));
                println!("   Link to previous: {}", yes_no(result.prev_hash_valid));
                if let Some(matched) = result.expected_match {
                    println!("   Expected hash:    {}", yes_no(matched));
                }
                return Err(format!("block #{} failed verification", index).into());
            }
        }
        Commands::Export { kind, out, csv } => {
            let content = match kind {
                ExportKind::Ledger => ledger.export_json()?,
                ExportKind::Csv => {
                    ledger.export_csv(csv.unwrap_or(config.export.csv), &config.export.currency)
                }
                ExportKind::Analytics => export::analytics_json(ledger.blocks())?,
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    eprintln!("{}", format!("📦 Exported to {}", path.display()).bright_green());
                }
                None => println!("{}", content),
            }
        }
        Commands::Clear { yes } => {
            if !yes {
                eprintln!(
                    "{}",
                    "Refusing to clear the ledger without --yes. This cannot be undone.".yellow()
                );
                return Err("clear not confirmed".into());
            }
            let count = ledger.len();
            ledger.clear()?;
            println!("{}", format!("🗑️  Ledger cleared ({} block(s) removed).", count).bright_red());
        }
        Commands::Track {
            block_index,
            location,
            handler,
            status,
            quality,
            temperature,
            humidity,
            notes,
        } => {
            let (event, block) = record_tracking_event(
                &mut ledger,
                NewTrackingEvent {
                    block_index,
                    location,
                    status: status.into(),
                    temperature,
                    humidity,
                    quality: quality.into(),
                    handler,
                    notes,
                },
            )?;
            println!(
                "{}",
                format!(
                    "🚚 {} event {} recorded for block #{} (new block #{})",
                    event.status, event.id, event.block_index, block.index
                )
                .bright_green()
            );
        }
        Commands::Contract { action } => match action {
            ContractAction::Create {
                kind,
                parties,
                terms,
                conditions,
            } => {
                let (contract, block) = create_contract(
                    &mut ledger,
                    NewContract {
                        kind: kind.into(),
                        parties,
                        terms,
                        conditions,
                    },
                )?;
                println!(
                    "{}",
                    format!("📜 Contract {} created (block #{})", contract.id, block.index).bright_green()
                );
                println!("{}", serde_json::to_string_pretty(&contract)?);
            }
            ContractAction::Execute { id } => {
                let block = execute_contract_by_id(&mut ledger, &id)?;
                println!(
                    "{}",
                    format!("⚡ Contract {} is now active (block #{})", id, block.index).bright_green()
                );
            }
        },
        Commands::Predict { .. } | Commands::Sensors { .. } => {}
    }

    Ok(())
}

fn check_cell(ok: bool) -> Cell {
    if ok {
        Cell::new("ok").fg(TableColor::Green)
    } else {
        Cell::new("MISMATCH").fg(TableColor::Red).add_attribute(Attribute::Bold)
    }
}

fn yes_no(ok: bool) -> ColoredString {
    if ok {
        "ok".green()
    } else {
        "mismatch".red()
    }
}

fn list(ledger: &agrichain::blockchain::Ledger, currency: &str) {
    if ledger.is_empty() {
        println!("{}", "📭 The ledger is empty. Record some produce with 'agrichain add'.".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Block").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Farmer").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Crop").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Qty (kg)").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new(format!("Price ({}/kg)", currency))
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new(format!("Value ({})", currency))
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Hash").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Timestamp").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
        ]);

    for block in ledger.blocks() {
        table.add_row(vec![
            Cell::new(format!("#{}", block.index)).fg(TableColor::White),
            Cell::new(&block.farmer).fg(TableColor::Green),
            Cell::new(&block.crop),
            Cell::new(&block.quantity),
            Cell::new(&block.price),
            Cell::new(format!("{:.2}", block_value(block))),
            Cell::new(format!("{}…", block.short_hash())).fg(TableColor::Yellow),
            Cell::new(&block.timestamp).fg(TableColor::Grey),
        ]);
    }

    println!("{}", table);

    let summary = Analytics::from_blocks(ledger.blocks()).summary();
    println!();
    println!("{}", "📊 SUMMARY".bright_blue().bold());
    println!("   Blocks:          {}", summary.total_blocks);
    println!("   Total quantity:  {} kg", summary.total_quantity);
    println!("   Total value:     {}{:.2}", currency, summary.total_value);
    println!("   Unique crops:    {}", summary.unique_crops);
    println!("   Unique farmers:  {}", summary.unique_farmers);
}

fn predict(crop: &str, season: i32, seed: Option<u64>) {
    let mut generator = match seed {
        Some(seed) => SyntheticGenerator::seeded(seed),
        None => SyntheticGenerator::from_entropy(),
    };
    let prediction = generator.predict_demand(crop, season);

    println!(
        "{}",
        format!("📈 Predicted demand for {} (season {})", prediction.crop, prediction.season)
            .bright_cyan()
            .bold()
    );
    for (month, value) in MONTHS.iter().zip(&prediction.data) {
        let bar = "█".repeat((*value / 5) as usize);
        println!("   {} {:>4} {}", month, value, bar.green());
    }
}

fn sensors(count: usize, shipment: &str, seed: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let mut generator = match seed {
        Some(seed) => SyntheticGenerator::seeded(seed),
        None => SyntheticGenerator::from_entropy(),
    };
    for _ in 0..count {
        let reading = generator.sensor_reading(shipment);
        println!("{}", serde_json::to_string(&reading)?);
    }
    Ok(())
}
