mod cli;

use audiograb::{app, config::Config, observability};
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = Config::load_with(cli.config)?;

    match cli.command {
        Commands::Run => {
            let _guard = observability::init_logging(&config.logging)?;
            app::run(config).await?;
        }
        Commands::Fetch(args) => {
            let _guard = observability::init_logging(&config.logging)?;
            let path = app::fetch(config, &args.url).await?;
            println!("{}", path.display());
        }
        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}
