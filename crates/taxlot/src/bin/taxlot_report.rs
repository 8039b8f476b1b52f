//! taxlot-report - Lot, holdings and tax reports for a ledger.

fn main() -> std::process::ExitCode {
    taxlot::cmd::report_cmd::main()
}
