//! Client for kv_server.
//!
//! With a subcommand it sends that one request. Without one it reads
//! commands from stdin until `exit` or end of input:
//!
//! ```text
//! add KEY VALUE...      POST /kv/KEY
//! get KEY               GET /kv/KEY
//! update KEY VALUE...   PUT /kv/KEY
//! delete KEY            DELETE /kv/KEY
//! exit
//! ```
//!
//! Each request prints its latency, status and body.

use std::io::Write;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, Method, Url};
use tokio::io::{AsyncBufReadExt, BufReader};

use kv_server::loadgen::REQUEST_TIMEOUT;

#[derive(Parser, Debug)]
#[command(name = "kv_client", about = "Send requests to a kv_server")]
struct Args {
    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Run one command instead of the interactive prompt
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Read a key
    Get { key: String },
    /// Create a new key
    #[command(alias = "add")]
    Create { key: String, value: String },
    /// Update an existing key
    Update { key: String, value: String },
    /// Delete a key
    Delete { key: String },
}

impl Command {
    fn method(&self) -> Method {
        match self {
            Command::Get { .. } => Method::GET,
            Command::Create { .. } => Method::POST,
            Command::Update { .. } => Method::PUT,
            Command::Delete { .. } => Method::DELETE,
        }
    }

    fn key(&self) -> &str {
        match self {
            Command::Get { key }
            | Command::Create { key, .. }
            | Command::Update { key, .. }
            | Command::Delete { key } => key,
        }
    }

    fn body(&self) -> Option<serde_json::Value> {
        match self {
            Command::Create { key, value } | Command::Update { key, value } => {
                Some(serde_json::json!({ "key": key, "value": value }))
            }
            _ => None,
        }
    }
}

/// One line typed at the prompt.
#[derive(Debug, PartialEq)]
enum Input {
    Run(Command),
    Exit,
    Blank,
}

/// Parses `VERB KEY [VALUE...]`. The value is the rest of the line.
fn parse_line(line: &str) -> Result<Input> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (line, ""),
    };
    let (key, value) = match rest.split_once(char::is_whitespace) {
        Some((key, value)) => (key.to_string(), value.trim().to_string()),
        None => (rest.to_string(), String::new()),
    };

    let needs_key = |key: String| {
        if key.is_empty() {
            Err(anyhow!("usage: {} KEY", verb))
        } else {
            Ok(key)
        }
    };
    let needs_value = |value: String| {
        if value.is_empty() {
            Err(anyhow!("usage: {} KEY VALUE", verb))
        } else {
            Ok(value)
        }
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "" => return Ok(Input::Blank),
        "exit" | "quit" => return Ok(Input::Exit),
        "get" => Command::Get { key: needs_key(key)? },
        "delete" => Command::Delete { key: needs_key(key)? },
        "add" | "create" => Command::Create {
            key: needs_key(key)?,
            value: needs_value(value)?,
        },
        "update" => Command::Update {
            key: needs_key(key)?,
            value: needs_value(value)?,
        },
        other => bail!(
            "unknown command '{}'; use add, get, update, delete or exit",
            other
        ),
    };
    Ok(Input::Run(command))
}

/// `{server}/kv/{key}` with the key percent-encoded as one path segment.
fn request_url(server: &str, key: &str) -> Result<Url> {
    let mut url = Url::parse(server).with_context(|| format!("invalid server URL {}", server))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("server URL {} cannot take a path", server))?
        .pop_if_empty()
        .push("kv")
        .push(key);
    Ok(url)
}

async fn send(client: &Client, server: &str, command: &Command) -> Result<()> {
    let url = request_url(server, command.key())?;
    let mut request = client.request(command.method(), url.clone());
    if let Some(body) = command.body() {
        request = request.json(&body);
    }

    let started = Instant::now();
    let response = request
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;
    let status = response.status();
    let body = response.text().await.context("failed to read response body")?;
    let latency = started.elapsed();

    println!("Latency: {:.3} ms", latency.as_secs_f64() * 1000.0);
    println!("Status:  {}", status);
    println!("Body:    {}", body);
    Ok(())
}

async fn interactive(client: &Client, server: &str) -> Result<()> {
    println!("kv_client connected to {}", server);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_line(&line) {
            Ok(Input::Run(command)) => {
                if let Err(e) = send(client, server, &command).await {
                    eprintln!("Error: {:#}", e);
                }
            }
            Ok(Input::Exit) => break,
            Ok(Input::Blank) => {}
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    request_url(&args.server, "")?;

    match args.command {
        Some(command) => send(&client, &args.server, &command).await,
        None => interactive(&client, &args.server).await,
    }
}
