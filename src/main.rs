fn main() {
    pkgbridge::run_cli();
}
