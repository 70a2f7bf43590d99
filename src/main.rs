//! stalecache - stale-while-revalidate HTTP cache
//!
//! Runs requests through a generation-tagged cache: stored responses are
//! served immediately and refreshed in the background before the process
//! exits.

use std::error::Error;

use clap::Parser;
use futures::future::join_all;
use tracing::warn;

use stalecache::cache::{CacheStorage, DiskStorage, MemoryStorage, RequestDescriptor};
use stalecache::cli::{Cli, Command, StartupConfig, StorageChoice};
use stalecache::fetch::HttpFetcher;
use stalecache::github::{GithubClient, RepoDirectory};
use stalecache::interceptor::{Interceptor, Outcome};
use stalecache::telemetry;

type AppInterceptor<S> = Interceptor<HttpFetcher, S>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    telemetry::init(cli.log_format)?;

    let fetcher = HttpFetcher::with_timeout(config.timeout)?;
    let result = match config.storage {
        StorageChoice::Memory => {
            let interceptor = Interceptor::new(config.interceptor, fetcher, MemoryStorage::new());
            run(cli.command, interceptor).await
        }
        StorageChoice::Disk(root) => {
            let interceptor =
                Interceptor::new(config.interceptor, fetcher, DiskStorage::with_dir(root));
            run(cli.command, interceptor).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Runs a command, then waits for every refresh it scheduled even if it failed
async fn run<S: CacheStorage>(
    command: Command,
    interceptor: AppInterceptor<S>,
) -> Result<(), Box<dyn Error>> {
    let result = execute(command, &interceptor).await;
    interceptor.wait_idle().await;
    result
}

async fn execute<S: CacheStorage>(
    command: Command,
    interceptor: &AppInterceptor<S>,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Fetch { urls, body } => fetch_urls(interceptor, &urls, body).await?,
        Command::Show { url } => show(interceptor, &url).await?,
        Command::Generations => {
            let current = interceptor.generation().name();
            for name in interceptor.store().generations().await? {
                let marker = if name == current { "*" } else { " " };
                println!("{} {}", marker, name);
            }
        }
        Command::Sweep => {
            interceptor.install();
            let cleared = interceptor.activate().await?;
            if cleared.is_empty() {
                println!("No old generations to clear");
            }
            for name in cleared {
                println!("Cleared {}", name);
            }
        }
        Command::Repos {
            user,
            per_page,
            page,
        } => {
            let client = GithubClient::new(interceptor.clone())?;
            for repo in client.user_repos(&user, per_page, page).await? {
                println!("{}", repo.full_name);
            }
        }
        Command::Contents { owner, repo, path } => {
            let client = GithubClient::new(interceptor.clone())?;
            let root = RepoDirectory {
                owner,
                repo,
                name: String::new(),
                path: String::new(),
            };
            for dir in client.directories(&root, &path).await? {
                println!("{}/", dir.path);
            }
            for file in client.files(&root, &path).await? {
                println!("{}", file.path);
            }
        }
    }
    Ok(())
}

/// Fetches every URL concurrently and prints one line (or the body) per URL
async fn fetch_urls<S: CacheStorage>(
    interceptor: &AppInterceptor<S>,
    urls: &[String],
    print_body: bool,
) -> Result<(), Box<dyn Error>> {
    let results = join_all(urls.iter().map(|url| async move {
        let request = match RequestDescriptor::parse_get(url) {
            Ok(request) => request,
            Err(e) => return Err(e.to_string()),
        };
        interceptor
            .handle(request)
            .await
            .map_err(|e| e.to_string())
    }))
    .await;

    let mut failed = 0;
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(served) => {
                if print_body {
                    println!("{}", served.response.text());
                } else {
                    let outcome = match served.outcome {
                        Outcome::Hit => "hit",
                        Outcome::Miss => "miss",
                    };
                    println!(
                        "{} {} {} bytes {} {}",
                        served.response.status.as_u16(),
                        outcome,
                        served.response.body.len(),
                        served.response.header("content-type").unwrap_or("-"),
                        url
                    );
                }
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                eprintln!("{}: {}", url, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} requests failed", failed, urls.len()).into());
    }
    Ok(())
}

/// Prints the stored response for `url` in the current generation
async fn show<S: CacheStorage>(
    interceptor: &AppInterceptor<S>,
    url: &str,
) -> Result<(), Box<dyn Error>> {
    let request = RequestDescriptor::parse_get(url)?;
    let partition = interceptor.store().open(&interceptor.generation()).await?;

    match partition.get(&request).await? {
        Some(snapshot) => {
            println!("{} {}", snapshot.status.as_u16(), snapshot.url);
            println!("fetched-at: {}", snapshot.fetched_at.to_rfc3339());
            for (name, value) in &snapshot.headers {
                println!("{}: {}", name, value);
            }
            println!();
            println!("{}", snapshot.text());
            Ok(())
        }
        None => Err(format!("{} is not cached in {}", url, partition.name()).into()),
    }
}
