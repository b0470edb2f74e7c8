fn main() {
    mdcmd_cli::bmd::main(1)
}
