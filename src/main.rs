fn main() {
    if let Err(e) = coinspark::cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
