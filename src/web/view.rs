use std::fmt::Write;

use chrono::NaiveDate;

use crate::{
    data::quote::Quote,
    utils::{datetime::date_to_str, net::path_with_query, text::escape_html},
    web::PageData,
};

static STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse}td,th{border:1px solid #999;padding:.3em .6em}\
nav a{margin-right:1em}";

pub fn render_page(page: Option<&PageData>) -> String {
    let stock_name = page.map(|p| p.stock_name.as_str()).unwrap_or_default();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>Stock Price</title>\n<style>{STYLE}</style>");
    html.push_str("</head>\n<body>\n<h1>Stock Price</h1>\n");

    let _ = writeln!(
        html,
        "<form method=\"post\" action=\"/\">\
         <input type=\"text\" name=\"stock_name\" value=\"{}\" placeholder=\"Stock name\" required> \
         <button type=\"submit\">Search</button></form>",
        escape_html(stock_name)
    );

    if let Some(page) = page {
        let _ = writeln!(
            html,
            "<h2>{} <small>{}</small></h2>",
            escape_html(&page.stock_name),
            date_to_str(&page.date)
        );

        if page.quotes.is_empty() {
            let _ = writeln!(
                html,
                "<p class=\"empty\">No price data for {}.</p>",
                date_to_str(&page.date)
            );
        } else {
            html.push_str(&quotes_table(&page.quotes));
        }

        html.push_str(&navigation(&page.stock_name, &page.date));

        let _ = writeln!(
            html,
            "<h3>Reference <small>{}</small></h3>",
            date_to_str(&page.secondary_date)
        );
        if page.secondary_quotes.is_empty() {
            html.push_str("<p class=\"empty\">No reference price.</p>\n");
        } else {
            html.push_str(&quotes_table(&page.secondary_quotes));
        }
    }

    html.push_str("</body>\n</html>\n");

    html
}

fn navigation(stock_name: &str, date: &NaiveDate) -> String {
    let stock_date = date_to_str(date);
    let query = [("stock_name", stock_name), ("stock_date", stock_date.as_str())];

    format!(
        "<nav><a href=\"{}\">&laquo; Previous day</a><a href=\"{}\">Next day &raquo;</a></nav>\n",
        escape_html(&path_with_query("/prev", &query)),
        escape_html(&path_with_query("/next", &query)),
    )
}

fn quotes_table(quotes: &[Quote]) -> String {
    let mut html = String::from(
        "<table>\n<tr><th>Name</th><th>Date</th><th>Close</th><th>Change</th>\
         <th>Change rate (%)</th><th>High</th><th>Low</th></tr>\n",
    );

    for quote in quotes {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&quote.stock_name),
            date_to_str(&quote.date),
            escape_html(&quote.close_price),
            escape_html(&quote.change_amount),
            escape_html(&quote.change_rate),
            escape_html(&quote.high_price),
            escape_html(&quote.low_price),
        );
    }

    html.push_str("</table>\n");

    html
}
