use clap::Parser;
use trihash::HashTable;
use trihash::hashing::DefaultHashing;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Fraction of the entries to remove before refilling the table
    #[arg(short = 'r', long = "remove_fraction", default_value_t = 0.5)]
    remove_fraction: f64,
}

fn print_histogram(hist: &[usize]) {
    let total: usize = hist.iter().sum();
    println!("=== Probe Length Histogram ===");
    for (length, &count) in hist.iter().enumerate() {
        if count == 0 {
            continue;
        }
        println!(
            "{:>4} steps: {:>8} ({:.2}%)",
            length,
            count,
            count as f64 / total.max(1) as f64 * 100.0
        );
    }
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64, u64, _> = HashTable::new_map(DefaultHashing::default());
    if let Err(err) = table.reserve(args.target_capacity) {
        eprintln!("cannot reserve capacity: {err}");
        return;
    }
    println!("Actual capacity: {}", table.capacity());

    let num_values = table.max_occupied() as u64;
    println!("Filling table with {num_values} u64 values...");
    for value in 0..num_values {
        if let Err(err) = table.map_set(value, value) {
            eprintln!("insertion failed: {err}");
            return;
        }
    }

    println!("Inserted {} values into table", table.len());
    print_histogram(&table.probe_histogram());
    table.debug_stats().print();

    let removals = (num_values as f64 * args.remove_fraction.clamp(0.0, 1.0)) as u64;
    println!("Removing {removals} values...");
    for value in 0..removals {
        table.map_remove(&value);
    }
    table.debug_stats().print();

    println!("Refilling with {removals} fresh values...");
    for value in num_values..num_values + removals {
        if let Err(err) = table.map_set(value, value) {
            eprintln!("insertion failed: {err}");
            return;
        }
    }

    print_histogram(&table.probe_histogram());
    table.debug_stats().print();
}
