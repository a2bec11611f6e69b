use callscope::CaptureConfig;
use facet::Facet;
use figue as args;

mod greeter;
mod loopback;
mod scenarios;

type AnyResult<T> = Result<T, String>;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    /// Byte cap for captured bodies (overrides CALLSCOPE_MAX_CONTENT_LENGTH).
    #[facet(args::named, default)]
    max_content_length: Option<u64>,
    /// Comma-separated header names to redact.
    #[facet(args::named, default)]
    redact: Option<String>,
    #[facet(args::subcommand)]
    command: CommandKind,
}

#[derive(Facet, Debug, Clone, Copy)]
#[repr(u8)]
enum CommandKind {
    Unary,
    ServerStream,
    ClientStream,
    Bidi,
    Failure,
    All,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> AnyResult<()> {
    let cli = parse_cli()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config_from_cli(&cli)?;
    let harness = scenarios::Harness::new(config);
    dispatch_command(&harness, cli.command).await
}

fn parse_cli() -> AnyResult<Cli> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("callscope-examples")
                .description("Drive captured RPC calls against an in-process greeter")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();

    args::Driver::new(figue_config)
        .run()
        .into_result()
        .map(|v| v.value)
        .map_err(|e| e.to_string())
}

fn config_from_cli(cli: &Cli) -> AnyResult<CaptureConfig> {
    let mut config =
        CaptureConfig::from_env().map_err(|e| format!("invalid capture config: {e}"))?;
    if let Some(max_content_length) = cli.max_content_length {
        config = config.with_max_content_length(max_content_length);
    }
    if let Some(redact) = cli.redact.as_deref() {
        config = config.redact_headers(callscope::parse_header_list(redact));
    }
    Ok(config)
}

async fn dispatch_command(harness: &scenarios::Harness, command: CommandKind) -> AnyResult<()> {
    match command {
        CommandKind::Unary => scenarios::unary::run(harness).await,
        CommandKind::ServerStream => scenarios::server_stream::run(harness).await,
        CommandKind::ClientStream => scenarios::client_stream::run(harness).await,
        CommandKind::Bidi => scenarios::bidi::run(harness).await,
        CommandKind::Failure => scenarios::failure::run(harness).await,
        CommandKind::All => {
            scenarios::unary::run(harness).await?;
            scenarios::server_stream::run(harness).await?;
            scenarios::client_stream::run(harness).await?;
            scenarios::bidi::run(harness).await?;
            scenarios::failure::run(harness).await
        }
    }
}
