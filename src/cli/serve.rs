use std::{path::Path, process};

use colored::Colorize;
use quoteboard::api;

#[derive(clap::Args)]
pub struct ServeCommand {
    #[arg(short = 'b', long = "bind", help = "Address to listen on, e.g. 0.0.0.0:5000")]
    bind: Option<String>,

    #[arg(long = "no-display", help = "Do not drive the OLED display")]
    no_display: bool,
}

impl ServeCommand {
    pub async fn exec(&self, config_path: Option<&Path>) {
        let mut config = match api::load_config(config_path) {
            Ok(config) => config,
            Err(err) => {
                println!("[!] {}", err.to_string().red());
                process::exit(1);
            }
        };

        if let Some(bind) = &self.bind {
            config.bind = bind.to_string();
        }
        if self.no_display {
            config.display = quoteboard::config::DisplayKind::None;
        }

        if let Err(err) = api::serve(&config).await {
            println!("[!] {}", err.to_string().red());
            process::exit(1);
        }
    }
}
