use anyhow::{Result, bail};
use clap::Parser;
use partner_portal::commands::{self, Services};
use partner_portal::config::ApiClientConfig;
use partner_portal::http::RetryPolicy;
use partner_portal::portal::{ApiKeyEnvironment, CreateApiKey};
use partner_portal::runtime::RealRuntime;
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;

/// portal - Partner Portal API client
///
/// Talks to the partner portal backend with the portal's timeout, retry and
/// error handling rules.
///
/// Examples:
///   portal get /partners/p1
///   portal post /partners/p1/api-keys -d '{"name":"ci"}'
///   portal key partner-analytics p1
#[derive(Parser, Debug)]
#[command(author, version = env!("PORTAL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(clap::Args, Debug)]
struct GlobalArgs {
    /// API base URL (defaults to http://localhost:8000)
    #[arg(long = "api-url", env = "NEXT_PUBLIC_API_URL", value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Session token sent as a bearer token
    #[arg(long, env = "PORTAL_TOKEN", value_name = "TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Request timeout in milliseconds (defaults to 30000)
    #[arg(long = "timeout-ms", value_name = "MS", global = true)]
    timeout_ms: Option<u64>,

    /// Fail on the first error instead of retrying
    #[arg(long = "no-retry", global = true)]
    no_retry: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// GET an endpoint
    Get(GetArgs),
    /// POST to an endpoint
    Post(BodyArgs),
    /// PUT to an endpoint
    Put(BodyArgs),
    /// PATCH an endpoint
    Patch(BodyArgs),
    /// DELETE an endpoint
    Delete(EndpointArgs),
    /// Sign in with email and password
    Login(LoginArgs),
    /// Show a partner
    Partner(PartnerArgs),
    /// List or create a partner's API keys
    ApiKeys(ApiKeysArgs),
    /// Show backend health
    Health,
    /// Print the cache key for a resource
    Key(KeyArgs),
    /// Print the retry delay schedule
    Backoff(BackoffArgs),
}

#[derive(clap::Args, Debug)]
struct GetArgs {
    /// Endpoint path, e.g. /partners/p1
    endpoint: String,

    /// Query parameter, repeatable
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

#[derive(clap::Args, Debug)]
struct BodyArgs {
    endpoint: String,

    /// JSON request body
    #[arg(short = 'd', long = "data", value_name = "JSON")]
    data: Option<String>,

    /// Extra header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,
}

#[derive(clap::Args, Debug)]
struct EndpointArgs {
    endpoint: String,
}

#[derive(clap::Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,

    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(clap::Args, Debug)]
struct PartnerArgs {
    id: String,

    /// Show analytics instead of the profile
    #[arg(long)]
    analytics: bool,
}

#[derive(clap::Args, Debug)]
struct ApiKeysArgs {
    partner_id: String,

    /// Create a key with this name instead of listing
    #[arg(long, value_name = "NAME")]
    create: Option<String>,

    /// Scope of the new key, repeatable
    #[arg(long = "scope", requires = "create")]
    scopes: Vec<String>,

    /// Create a sandbox key instead of a production key
    #[arg(long, requires = "create")]
    sandbox: bool,
}

#[derive(clap::Args, Debug)]
struct KeyArgs {
    /// Key name, e.g. partner-analytics
    name: String,

    /// Identifier segments
    args: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct BackoffArgs {
    /// Number of retries to show
    #[arg(long, default_value_t = 6)]
    attempts: u32,
}

fn parse_param(s: &str) -> Result<(String, String)> {
    commands::parse_param(s)
}

fn parse_header(s: &str) -> Result<(String, String)> {
    commands::parse_header_arg(s)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_services(global: &GlobalArgs) -> Result<Services> {
    let mut config = ApiClientConfig::from_runtime(&RealRuntime)?;
    if let Some(url) = &global.api_url {
        config.base_url = url.clone();
    }
    if let Some(ms) = global.timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }

    let mut policy = RetryPolicy::default();
    if global.no_retry {
        policy.query_max_retries = 0;
        policy.mutation_max_retries = 0;
    }

    commands::build_services(config, global.token.as_deref(), policy)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    // Only commands that talk to the backend build the client
    let services = || build_services(&cli.global);

    match cli.command {
        Commands::Key(args) => print_json(&commands::key_for(&args.name, &args.args)?)?,
        Commands::Backoff(args) => print_backoff(args.attempts),
        Commands::Get(args) => print_json(
            &commands::run_query(&services()?, &args.endpoint, &args.params).await?,
        )?,
        Commands::Post(args) => send(&services()?, Method::POST, args).await?,
        Commands::Put(args) => send(&services()?, Method::PUT, args).await?,
        Commands::Patch(args) => send(&services()?, Method::PATCH, args).await?,
        Commands::Delete(args) => print_json(
            &commands::run_mutation(&services()?, Method::DELETE, &args.endpoint, None, &[])
                .await?,
        )?,
        Commands::Login(args) => {
            match services()?.portal().login(&args.email, &args.password).await {
                Some(user) => print_json(&user)?,
                None => bail!("Login failed for {}", args.email),
            }
        }
        Commands::Partner(args) => {
            let portal = services()?.portal();
            if args.analytics {
                print_json(&portal.partner_analytics(&args.id).await?)?
            } else {
                print_json(&portal.partner(&args.id).await?)?
            }
        }
        Commands::ApiKeys(args) => api_keys(&services()?, args).await?,
        Commands::Health => print_json(&services()?.portal().health_status().await?)?,
    }
    Ok(())
}

fn print_backoff(attempts: u32) {
    let schedule = commands::backoff_schedule(&RetryPolicy::default(), attempts);
    for (i, delay) in schedule.iter().enumerate() {
        println!("retry {}: {}ms", i + 1, delay.as_millis());
    }
}

async fn api_keys(services: &Services, args: ApiKeysArgs) -> Result<()> {
    let portal = services.portal();
    match args.create {
        Some(name) => {
            let request = CreateApiKey {
                name,
                scopes: args.scopes,
                environment: if args.sandbox {
                    ApiKeyEnvironment::Sandbox
                } else {
                    ApiKeyEnvironment::Production
                },
            };
            print_json(&portal.create_api_key(&args.partner_id, &request).await?)
        }
        None => print_json(&portal.api_keys(&args.partner_id).await?),
    }
}

async fn send(services: &Services, method: Method, args: BodyArgs) -> Result<()> {
    let value = commands::run_mutation(
        services,
        method,
        &args.endpoint,
        args.data.as_deref(),
        &args.headers,
    )
    .await?;
    print_json(&value)
}
