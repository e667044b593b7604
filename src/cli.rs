use clap::Subcommand;

mod check;
mod quote;
mod serve;

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check the price API and the display")]
    Check(Box<check::CheckCommand>),

    #[command(about = "Look up one day's price of a stock")]
    Quote(Box<quote::QuoteCommand>),

    #[command(about = "Run the web application")]
    #[clap(visible_aliases = &["run"])]
    Serve(Box<serve::ServeCommand>),
}
