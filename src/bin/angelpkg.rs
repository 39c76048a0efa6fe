fn main() -> anyhow::Result<()> {
    angelpkg::cli::run_cli()
}
