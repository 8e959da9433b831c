use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    let args = ofx2xlsx::args::parse();
    ofx2xlsx::cli::main(args)
}
