use std::path::Path;

use colored::Colorize;
use quoteboard::{
    api,
    utils::datetime::{date_from_str, date_to_str},
};
use tabled::settings::{Color, object::Rows};

#[derive(clap::Args)]
pub struct QuoteCommand {
    stock_name: String,

    #[arg(short = 'd', long = "date", help = "Trading date, defaults to 3 days ago")]
    date: Option<String>,
}

impl QuoteCommand {
    pub async fn exec(&self, config_path: Option<&Path>) {
        let config = match api::load_config(config_path) {
            Ok(config) => config,
            Err(err) => {
                println!("[!] {}", err.to_string().red());
                return;
            }
        };

        let date = match &self.date {
            Some(date_str) => date_from_str(date_str),
            None => api::default_quote_date(),
        };
        let date = match date {
            Ok(date) => date,
            Err(err) => {
                println!("[!] {}", err.to_string().red());
                return;
            }
        };

        let quotes = api::fetch_quote(&config, &self.stock_name, &date).await;
        if quotes.is_empty() {
            println!(
                "[!] No price of '{}' on {}",
                self.stock_name.yellow(),
                date_to_str(&date)
            );
            return;
        }

        let mut table_data: Vec<Vec<String>> = vec![vec![
            "Name".to_string(),
            "Date".to_string(),
            "Close".to_string(),
            "Change".to_string(),
            "Change Rate".to_string(),
            "High".to_string(),
            "Low".to_string(),
        ]];
        for quote in quotes {
            table_data.push(vec![
                quote.stock_name,
                date_to_str(&quote.date),
                quote.close_price,
                quote.change_amount,
                format!("{}%", quote.change_rate),
                quote.high_price,
                quote.low_price,
            ]);
        }

        let mut table = tabled::builder::Builder::from_iter(&table_data).build();
        table.modify(Rows::first(), Color::FG_CYAN);
        println!("{table}");
    }
}
