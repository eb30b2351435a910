use std::{path::PathBuf, process::ExitCode};

use clap::{error::ErrorKind, Parser};
use mri_classify_core::{AppConfig, ClassifyError, Prediction, Request, WeightsSource};
use serde::Serialize;
use tracing::{error, info, Level};

/// Classify a brain MRI slice as AD, CN or MCI.
#[derive(Parser)]
struct Args {
    /// JSON request: {"image": "<data-url-or-base64>"}
    request: Option<String>,

    /// Read the image from a file instead of the JSON request.
    #[arg(long, conflicts_with = "request")]
    image_file: Option<PathBuf>,

    /// Weights file (.pth or .safetensors).
    #[arg(long)]
    weights: Option<PathBuf>,

    #[arg(long)]
    config: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Response {
    Success {
        #[serde(flatten)]
        prediction: Prediction,
        success: bool,
    },
    Failure {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        traceback: Option<String>,
        success: bool,
    },
}

impl Response {
    fn failure(err: &anyhow::Error) -> Self {
        let invalid_input = err
            .downcast_ref::<ClassifyError>()
            .is_some_and(ClassifyError::is_invalid_input);
        Response::Failure {
            error: err.to_string(),
            traceback: (!invalid_input).then(|| format!("{:?}", err)),
            success: false,
        }
    }
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn render(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        serde_json::json!({ "error": e.to_string(), "success": false }).to_string()
    })
}

/// stdout carries the JSON response and nothing else.
fn emit(response: &Response) {
    println!("{}", render(response));
}

fn fail(err: anyhow::Error) -> ExitCode {
    error!("{:#}", err);
    emit(&Response::failure(&err));
    ExitCode::FAILURE
}

fn run(args: &Args, config: &AppConfig) -> anyhow::Result<Prediction> {
    info!("Current working directory: {:?}", std::env::current_dir()?);

    let request = match (&args.image_file, &args.request) {
        (Some(path), _) => Request::from_file(path)?,
        (None, Some(arg)) => Request::parse(arg)?,
        (None, None) => return Err(ClassifyError::MissingImage.into()),
    };

    let weights = WeightsSource::resolve(args.weights.clone().or(config.weights.clone()))?;
    let prediction = mri_classify_core::classify(&request.image, &weights)?;
    info!(
        "prediction: {} ({:.4}%)",
        prediction.label,
        prediction.probability(prediction.label) * 100.0
    );
    Ok(prediction)
}

pub fn main() -> ExitCode {
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        std::env::set_var("RUST_BACKTRACE", "full");
    }
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            init_logging(Level::INFO);
            return fail(anyhow::anyhow!("{}", e.render()));
        }
    };

    let config = match args.config.as_deref().map(AppConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            init_logging(Level::INFO);
            return fail(e);
        }
    };

    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.level().ok().flatten().unwrap_or(Level::INFO)
    };
    init_logging(level);

    match run(&args, &config) {
        Ok(prediction) => {
            emit(&Response::Success {
                prediction,
                success: true,
            });
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
