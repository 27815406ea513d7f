fn main() {
    if let Err(err) = flowdash_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
