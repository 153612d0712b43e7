//! Extracts a single filing and prints its figures

use std::env;
use ukaccounts::extract_file;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <filing>", args[0]);
        std::process::exit(1);
    }

    let row = extract_file(&args[1])?;

    println!("Company {} ({})", row.company_number, row.balance_sheet_date);
    println!("  Name: {}", row.registered_name.as_deref().unwrap_or("-"));
    for figure in &row.figures {
        match &figure.selected {
            Some(v) => println!(
                "  {}: {} ({} to {})",
                figure.concept, v.value, v.period.start, v.period.end
            ),
            None => println!("  {}: -", figure.concept),
        }
    }

    Ok(())
}
