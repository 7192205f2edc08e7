// Entrypoint for the CLI application.
// - Keeps `main` small: create an API client and hand it to the menu loop.
// - Returns `anyhow::Result`; user-initiated cancellation never reaches
//   here as an error, so every normal path exits with code 0.

use vaccination_cli::{api::CatalogClient, ui};

fn main() -> anyhow::Result<()> {
    // Logging is off by default; RUST_LOG=debug shows token refills and
    // retry activity without disturbing the prompts.
    env_logger::init();

    ui::print_banner();

    // Base URLs and the token batch size come from the environment, with
    // the production endpoints as defaults. See `api::Config::from_env`.
    let mut api = CatalogClient::from_env()?;

    // Blocks until the user exits the menu.
    ui::main_menu(&mut api)?;
    Ok(())
}
