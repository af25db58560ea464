fn main() {
    if let Err(err) = pim_hierarchy::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
