use clap::{ArgAction, CommandFactory, Parser};
use httpshare::common::config::{load_config, ConfigOverrides};
use httpshare::server::{start_share_server, ShareRequest};
use httpshare::share::Archiver;
use httpshare::transport::local::BindScope;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// -h is handled by hand: usage always exits with status 2
#[derive(Parser)]
#[command(name = "httpshare")]
#[command(about = "Share a file or directory over HTTP for a limited number of downloads")]
#[command(disable_help_flag = true)]
#[command(after_help = "Link words are read from first_words.txt and second_words.txt in \
    `words_dir` (config file or HTTPSHARE_WORDS_DIR), else <exe dir>/words, else <exe dir>. \
    Without them the link is a timestamp.")]
struct Cli {
    #[arg(
        short = 'f',
        long = "from",
        alias = "From",
        value_name = "PATH",
        help = "File or directory to share (required)"
    )]
    from: Option<PathBuf>,

    #[arg(
        short = 'p',
        long = "port",
        alias = "Port",
        help = "HTTP server TCP port [default: 8000]"
    )]
    port: Option<u16>,

    #[arg(
        short = 'd',
        long = "downloads",
        alias = "Downloads",
        help = "Max number of downloads, 0 for unlimited [default: 1]"
    )]
    downloads: Option<u64>,

    #[arg(
        short = 'a',
        long = "archiver",
        alias = "Archiver",
        value_enum,
        ignore_case = true,
        help = "Archiver used when sharing a directory [default: gz]"
    )]
    archiver: Option<Archiver>,

    #[arg(long, help = "Listen on 127.0.0.1 only")]
    loopback: bool,

    #[arg(long, help = "Print the download link as a QR code")]
    qr: bool,

    #[arg(long = "no-clipboard", help = "Do not copy the link to the clipboard")]
    no_clipboard: bool,

    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue, help = "Print usage")]
    help: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            downloads: self.downloads,
            archiver: self.archiver,
            bind: self.loopback.then_some(BindScope::Loopback),
            show_qr: self.qr.then_some(true),
            clipboard: self.no_clipboard.then_some(false),
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn usage_exit(message: Option<String>) -> ! {
    if let Some(message) = message {
        eprintln!("{}\n", message);
    }
    let _ = Cli::command().print_help();
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> ExitCode {
    // Reads std::env::args(); malformed values exit with status 2
    let cli = Cli::parse();

    if cli.help {
        usage_exit(None);
    }

    let Some(source) = cli.from.clone() else {
        usage_exit(None);
    };

    // fail fast on no file
    if !source.exists() {
        usage_exit(Some(format!(
            "*** Unable to locate the file / directory: {}",
            source.display()
        )));
    }

    let config = match load_config(&cli.overrides()) {
        Ok(config) => config,
        Err(err) => usage_exit(Some(format!("*** {:#}", err))),
    };

    init_logging();

    match start_share_server(ShareRequest { source, config }).await {
        Ok(end) => {
            tracing::debug!(?end, "Share finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
