fn main() -> anyhow::Result<()> {
    memoh_mcp::run_cli()
}
