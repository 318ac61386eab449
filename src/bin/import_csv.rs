use std::{error::Error, path::PathBuf, process::exit};

use clap::Parser;
use rusqlite::Connection;

use ledger_rs::{get_balance, import_transactions_from_file, initialize_db};

/// A utility for importing transactions from a CSV file into a ledger_rs database.
///
/// The CSV file must have a header row followed by rows with the columns
/// title, type, value and category. The file is deleted after a successful import.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The CSV file to import.
    csv_path: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if !args.csv_path.is_file() {
        eprintln!("No file found at {:#?}!", args.csv_path);
        exit(1);
    }

    let conn = Connection::open(&args.db_path)?;
    initialize_db(&conn)?;

    println!("Importing transactions from {:#?}...", args.csv_path);
    let transactions = import_transactions_from_file(&args.csv_path, &conn)?;
    println!("Imported {} transactions.", transactions.len());

    let balance = get_balance(&conn)?;
    println!(
        "Balance: income {:.2}, outcome {:.2}, total {:.2}",
        balance.income, balance.outcome, balance.total
    );

    Ok(())
}
