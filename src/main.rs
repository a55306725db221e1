fn main() {
    if let Err(err) = school_locator::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
