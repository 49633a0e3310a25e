fn main() {
    if let Err(e) = app_lib::run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
