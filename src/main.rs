use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod debounce;
mod domain;
mod fields;
mod inputter;
mod loader;
mod model;
mod row;
mod surface;
mod table_controller;
mod theme;
mod ui;

use controller::Controller;
use domain::{BSConfig, BSError};
use model::{Model, Status};
use table_controller::View;
use theme::Theme;
use ui::TableUI;

/// Browse the Ball Street athlete database in the terminal.
#[derive(Parser, Debug)]
#[command(name = "ballstreet", version, about)]
struct CliArgs {
    /// Athlete export to open (csv, parquet, arrow or json)
    path: PathBuf,

    /// Initial view: table or cards
    #[arg(long, default_value = "table", value_parser = View::from_str)]
    view: View,

    /// Color theme, overrides the stored preference
    #[arg(long, value_parser = Theme::from_str)]
    theme: Option<Theme>,

    /// Quiet period before a typed search is applied
    #[arg(long, default_value_t = 200)]
    debounce_ms: u64,

    /// Input poll interval
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Write logs to this file
    #[arg(long)]
    log: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Where the chosen theme is remembered
    #[arg(long, default_value = "~/.ballstreet-theme")]
    theme_file: String,
}

impl CliArgs {
    fn to_config(&self) -> BSConfig {
        let theme_file = PathBuf::from(shellexpand::tilde(&self.theme_file).into_owned());
        BSConfig::default()
            .with_initial_view(self.view)
            .with_theme(self.theme)
            .with_search_debounce(Duration::from_millis(self.debounce_ms))
            .with_event_poll_time(self.poll_ms)
            .with_theme_file(Some(theme_file))
    }
}

fn init_logging(args: &CliArgs) -> Result<(), BSError> {
    let Some(path) = args.log.as_ref() else {
        return Ok(());
    };
    let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
    let file = File::create(&path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: CliArgs) -> Result<(), BSError> {
    init_logging(&args)?;
    let cfg = args.to_config();
    info!("Starting ballstreet with {:?}", cfg);

    // Load before taking over the terminal so errors print normally
    let mut model = Model::init(&cfg, 0, 0);
    model.load_data_file(args.path.clone())?;

    let mut ui = TableUI::new();
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = (|| -> Result<(), BSError> {
        let size = terminal.size()?;
        model.update(Some(domain::Message::Resize(
            size.width as usize,
            size.height as usize,
        )))?;

        while model.status != Status::Quitting {
            terminal.draw(|f| ui.draw(&model, f))?;
            let message = controller.handle_event(&model)?;
            model.update(message)?;
        }
        Ok(())
    })();
    ratatui::restore();
    result
}
