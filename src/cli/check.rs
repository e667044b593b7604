use std::path::Path;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use quoteboard::api;
use tabled::settings::{
    Color,
    object::{Columns, Object, Rows},
};
use tokio::time::Duration;

#[derive(clap::Args)]
pub struct CheckCommand;

impl CheckCommand {
    pub async fn exec(&self, config_path: Option<&Path>) {
        let config = match api::load_config(config_path) {
            Ok(config) => config,
            Err(err) => {
                println!("[!] {}", err.to_string().red());
                return;
            }
        };

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{msg}[{elapsed}] {spinner:.cyan}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(100));

        match api::check(&config).await {
            Ok(status) => {
                spinner.finish_and_clear();

                let mut table_data: Vec<Vec<String>> = vec![];
                let mut failed_rows: Vec<usize> = vec![];
                for (i, (title, optional_error)) in status.into_iter().enumerate() {
                    match optional_error {
                        Some(err) => {
                            table_data.push(vec![title, "✘".to_string(), err]);
                            failed_rows.push(i);
                        }
                        None => {
                            table_data.push(vec![title, "✔".to_string(), String::new()]);
                        }
                    }
                }

                let mut table = tabled::builder::Builder::from_iter(&table_data).build();
                table.modify(Columns::first(), Color::FG_CYAN);
                for i in 0..table_data.len() {
                    let color = if failed_rows.contains(&i) {
                        Color::FG_RED
                    } else {
                        Color::FG_GREEN
                    };
                    table.modify(Rows::new(i..i + 1).not(Columns::first()), color);
                }
                println!("{table}");
            }
            Err(err) => {
                spinner.finish_with_message(format!("{} ", err.to_string().red()));
            }
        }
    }
}
