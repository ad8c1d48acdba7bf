fn main() {
    if let Err(err) = agentdeck::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
