use anyhow::Result;
use clap::Parser;
use tracing::debug;

use freight_quote::{
    app::App,
    cli::Cli,
    config::load_settings,
    init_tracing,
    util::version::{APP_NAME, APP_VERSION},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing();
    debug!(version = APP_VERSION, "{APP_NAME} starting");

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        settings.storage.data_dir = Some(dir);
    }

    let mut app = App::from_settings(&settings)?;
    let output = app.run(args.command).await?;
    println!("{}", output.text);

    if output.failed {
        std::process::exit(1);
    }
    Ok(())
}
