fn main() {
    if let Err(error) = staytracker::run() {
        eprintln!("staytracker: {error}");
        std::process::exit(1);
    }
}
