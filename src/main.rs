use anyhow::{Context, Result};
use clap::Parser;
use http_utils::http::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS};
use http_utils::{ExecutorConfig, Method, Request, RequestExecutor, RequestOptions};
use std::path::PathBuf;

/// http-utils - issue one HTTP request with timeouts and timeout retries
///
/// The response body is written to stdout. Only timed-out attempts are
/// retried, immediately and at most --retries times.
///
/// Examples:
///   http-utils get http://localhost:8080/get -H 'X-Id: 1' --retries 3
///   http-utils post http://localhost:8080/post --data '{"name":"widget"}'
///   http-utils get 'http://localhost:8080/users/{id}' --var id=42
#[derive(Parser, Debug)]
#[command(author, version = env!("HTTP_UTILS_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Request header as 'Name: value' (repeatable)
    #[arg(
        short = 'H',
        long = "header",
        value_name = "NAME: VALUE",
        value_parser = parse_header,
        global = true
    )]
    headers: Vec<(String, String)>,

    /// Value for a {name} placeholder in the URL (repeatable)
    #[arg(
        long = "var",
        value_name = "NAME=VALUE",
        value_parser = parse_variable,
        global = true
    )]
    vars: Vec<(String, String)>,

    /// Connect timeout in milliseconds
    #[arg(
        long,
        env = "HTTP_UTILS_CONNECT_TIMEOUT",
        value_name = "MS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_MS,
        global = true
    )]
    connect_timeout: u64,

    /// Read timeout in milliseconds
    #[arg(
        long,
        env = "HTTP_UTILS_READ_TIMEOUT",
        value_name = "MS",
        default_value_t = DEFAULT_READ_TIMEOUT_MS,
        global = true
    )]
    read_timeout: u64,

    /// Extra attempts allowed after a timed-out attempt
    #[arg(long, env = "HTTP_UTILS_RETRIES", value_name = "N", default_value_t = 0, global = true)]
    retries: u32,

    /// Print the status line before the body
    #[arg(short = 'i', long, global = true)]
    include: bool,

    /// Exit with an error when the status is 400 or above
    #[arg(long, global = true)]
    fail: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send a GET request
    Get(UrlArgs),

    /// Send a POST request with an optional JSON body
    Post(BodyArgs),

    /// Send a PUT request with an optional JSON body
    Put(BodyArgs),

    /// Send a DELETE request
    Delete(UrlArgs),
}

#[derive(clap::Args, Debug)]
struct UrlArgs {
    /// Absolute URL, optionally with {name} placeholders
    #[arg(value_name = "URL")]
    url: String,
}

#[derive(clap::Args, Debug)]
struct BodyArgs {
    /// Absolute URL, optionally with {name} placeholders
    #[arg(value_name = "URL")]
    url: String,

    /// JSON request body
    #[arg(long, value_name = "JSON", conflicts_with = "data_file")]
    data: Option<String>,

    /// Read the JSON request body from a file
    #[arg(long = "data-file", value_name = "PATH")]
    data_file: Option<PathBuf>,
}

impl BodyArgs {
    fn json_body(&self) -> Result<Option<serde_json::Value>> {
        let text = match (&self.data, &self.data_file) {
            (Some(data), _) => data.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read request body from {:?}", path))?,
            (None, None) => return Ok(None),
        };

        let body = serde_json::from_str(&text).context("Request body is not valid JSON")?;
        Ok(Some(body))
    }
}

impl Cli {
    fn build_request(&self) -> Result<Request> {
        let (method, url, body) = match &self.command {
            Commands::Get(args) => (Method::Get, &args.url, None),
            Commands::Delete(args) => (Method::Delete, &args.url, None),
            Commands::Post(args) => (Method::Post, &args.url, args.json_body()?),
            Commands::Put(args) => (Method::Put, &args.url, args.json_body()?),
        };

        let mut options = RequestOptions::new()
            .with_connect_timeout_ms(self.connect_timeout)
            .with_read_timeout_ms(self.read_timeout)
            .with_max_retries(self.retries);
        for (name, value) in &self.headers {
            options = options.with_header(name, value);
        }
        for (name, value) in &self.vars {
            options = options.with_uri_variable(name, value);
        }
        if let Some(body) = body {
            options = options.with_json(&body);
        }

        Ok(Request::new(method, url.as_str()).with_options(options))
    }
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid header '{}': expected 'Name: value'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{}': empty name", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_variable(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid variable '{}': expected NAME=VALUE", s))?;
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let request = cli.build_request()?;
    let executor = RequestExecutor::new(ExecutorConfig::default());

    let response = executor
        .execute(&request)
        .await
        .with_context(|| format!("{} {} failed", request.method, request.url))?;

    if cli.include {
        println!("HTTP {}", response.status());
    }
    if !response.body().is_empty() {
        println!("{}", response.body());
    }

    if cli.fail && !response.is_success() {
        anyhow::bail!("Server answered HTTP {}", response.status());
    }
    Ok(())
}
