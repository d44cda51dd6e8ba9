fn main() {
    flakedot::cli::run();
}
