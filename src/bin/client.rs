use std::process::exit;

use clap::Parser;

use chord::{Client, ClientError};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Node to contact.
    host: String,
    port: u16,
    /// `get` or `put`.
    verb: String,
    key: String,
    /// Omit to remove the key on a put.
    value: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let client = Client::new(cli.host, cli.port);

    match client.send(&cli.verb, &cli.key, cli.value.as_deref()) {
        Ok(response) => {
            for line in response.lines() {
                println!("{line}");
            }
        }
        Err(ClientError::Timeout) => println!("REQUEST TIMED OUT"),
        Err(error) => {
            eprintln!("{error}");
            exit(1);
        }
    }
}
