//! Subcommands, each mapped onto one storage operation

use anyhow::Context;
use clap::Subcommand;
use std::collections::HashMap;
use std::path::PathBuf;
use swift_client::{HeaderMap, ListOptions, Listing, PutFile, StorageClient};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show metadata of the account, a container or an object
    Stat {
        path: Option<String>,
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
    /// Set metadata headers on a container or object
    Post {
        path: String,
        #[arg(short = 'H', long = "header", value_parser = parse_header, required = true)]
        headers: Vec<(String, String)>,
    },
    /// Delete an object or an empty container
    Delete { path: String },
    /// Upload a local file
    Upload {
        src: PathBuf,
        dst: String,
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
    /// Download an object to a file, or to stdout
    Download {
        path: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create a container
    Create { container: String },
    /// Server-side copy
    Copy { src: String, dst: String },
    /// List containers, or objects in a container
    List {
        container: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        marker: Option<String>,
        #[arg(long)]
        delimiter: Option<String>,
    },
}

/// Parse `Name: value` (or `Name=value`)
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .or_else(|| raw.split_once('='))
        .ok_or_else(|| format!("expected NAME:VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

pub async fn run(client: &StorageClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Stat { path, headers } => {
            let headers: HashMap<_, _> = headers.into_iter().collect();
            let meta = client
                .get_meta(path.as_deref(), Some(&headers))
                .await
                .context("stat failed")?;
            print_headers(&meta);
        }
        Command::Post { path, headers } => {
            let headers: HashMap<_, _> = headers.into_iter().collect();
            let meta = client
                .set_meta(&path, &headers)
                .await
                .with_context(|| format!("failed to update metadata of {path}"))?;
            print_headers(&meta);
        }
        Command::Delete { path } => {
            client
                .delete_file(&path)
                .await
                .with_context(|| format!("failed to delete {path}"))?;
        }
        Command::Upload { src, dst, headers } => {
            let upload = PutFile {
                src,
                dst,
                headers: headers.into_iter().collect(),
            };
            let url = client.put_file(upload).await.context("upload failed")?;
            println!("{url}");
        }
        Command::Download { path, output } => {
            let data = client
                .get_file(&path)
                .await
                .with_context(|| format!("failed to download {path}"))?;
            match output {
                Some(file) => tokio::fs::write(&file, &data)
                    .await
                    .with_context(|| format!("failed to write {}", file.display()))?,
                None => {
                    use tokio::io::AsyncWriteExt;
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
            }
        }
        Command::Create { container } => {
            client
                .create(&container)
                .await
                .with_context(|| format!("failed to create container {container}"))?;
        }
        Command::Copy { src, dst } => {
            client
                .copy(&src, &dst)
                .await
                .with_context(|| format!("failed to copy {src} to {dst}"))?;
        }
        Command::List {
            container,
            prefix,
            limit,
            marker,
            delimiter,
        } => {
            let opts = ListOptions {
                prefix,
                limit,
                marker,
                delimiter,
                ..Default::default()
            };
            let listing = client
                .list(container.as_deref(), Some(&opts))
                .await
                .context("list failed")?;
            match listing {
                Listing::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Listing::Text(text) => print!("{text}"),
            }
        }
    }
    Ok(())
}

fn print_headers(headers: &HeaderMap) {
    let mut lines: Vec<_> = headers
        .iter()
        .map(|(name, value)| (name.as_str(), value.to_str().unwrap_or("<binary>")))
        .collect();
    lines.sort();
    for (name, value) in lines {
        println!("{name}: {value}");
    }
}
