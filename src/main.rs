fn main() {
    if let Err(err) = rallycoach_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
