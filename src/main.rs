mod assets;
mod cli;
mod layout;
mod logging;
mod materialize;
mod runner;
mod walk;

fn main() -> anyhow::Result<()> {
    let app = cli::parse();
    logging::init(app.verbose);
    runner::run(app)
}
