use anyhow::Result;

fn main() -> Result<()> {
    let args = h5shift::cli::parse();
    h5shift::app::run(args)
}
