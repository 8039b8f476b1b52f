//! taxlot-check - Validate a ledger and detect oversells.

fn main() -> std::process::ExitCode {
    taxlot::cmd::check::main()
}
