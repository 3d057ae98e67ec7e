fn main() {
    if let Err(e) = stripcut::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
