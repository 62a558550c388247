fn main() {
    if let Err(err) = kratts_assistant::cli::main() {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
}
