//! taxlot-price - Fetch current prices for instruments.
//!
//! Primary binary for fetching market prices from online sources.

fn main() -> std::process::ExitCode {
    taxlot::cmd::price_cmd::main()
}
