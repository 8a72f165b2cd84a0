use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process,
};

use scrivo::{
    application::error::AppError,
    application::render::{
        LiteralTable, PipelineKind, RenderOutcome, deferred_renderer, extract_literals,
        immediate_renderer,
    },
    config::{self, Command, LiteralsArgs, RenderArgs},
    infra::{error::InfraError, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, debug, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

const STDIN_MARKER: &str = "-";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Command::Render(args) => run_render(&settings, args).await,
        Command::Literals(args) => run_literals(args).await,
    }
}

#[derive(Debug, Serialize)]
struct RenderReport {
    pipeline: PipelineKind,
    degraded: bool,
    html: String,
}

async fn run_render(settings: &config::Settings, args: RenderArgs) -> Result<(), AppError> {
    let pipeline = args
        .pipeline
        .map(PipelineKind::from)
        .unwrap_or(settings.render.pipeline);
    let markdown = read_input(args.input.as_deref()).await?;

    debug!(
        target = "scrivo::render",
        pipeline = pipeline.as_str(),
        bytes = markdown.len(),
        "rendering document"
    );

    let RenderOutcome { html, degraded } = match pipeline {
        PipelineKind::Deferred => deferred_renderer().render_outcome(&markdown).await,
        PipelineKind::Immediate => RenderOutcome {
            html: immediate_renderer().render(&markdown)?,
            degraded: false,
        },
    };

    if args.json {
        let report = RenderReport {
            pipeline,
            degraded,
            html,
        };
        write_json(&report)
    } else {
        write_stdout(&html)
    }
}

async fn run_literals(args: LiteralsArgs) -> Result<(), AppError> {
    let markdown = read_input(args.input.as_deref()).await?;
    let table: LiteralTable = extract_literals(&markdown);

    debug!(
        target = "scrivo::literals",
        spans = table.spans.len(),
        "extracted literal spans"
    );
    write_json(&table.spans)
}

async fn read_input(path: Option<&Path>) -> Result<String, AppError> {
    match path {
        Some(path) if path != Path::new(STDIN_MARKER) => tokio::fs::read_to_string(path)
            .await
            .map_err(|err| AppError::from(InfraError::read_input(PathBuf::from(path), err))),
        _ => tokio::task::spawn_blocking(|| {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map(|_| buffer)
        })
        .await
        .map_err(|err| AppError::unexpected(format!("stdin reader stopped: {err}")))?
        .map_err(|err| AppError::from(InfraError::read_input(STDIN_MARKER, err))),
    }
}

fn write_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    write_stdout(&json)
}

fn write_stdout(text: &str) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes()).map_err(InfraError::from)?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n").map_err(InfraError::from)?;
    }
    stdout.flush().map_err(InfraError::from)?;
    Ok(())
}
