fn main() {
    let code = wumboc::cli::run(std::env::args().skip(1));
    std::process::exit(code);
}
