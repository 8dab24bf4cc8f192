use anyhow::{bail, Context};
use clap::Parser;
use framewatch_classifiers::{
    resolve_model_files, scaffold_model, CandleImageModel, ClassificationController,
    ControllerState, LabelPoller, ModelDescriptor, MonitorSettings,
};
use framewatch_core::{InMemorySource, LastClass, SourceId};
use framewatch_demo::cli::{Cli, Commands};
use framewatch_demo::stream::{FrameGenerator, StreamConfig, SyntheticStream};
use framewatch_telemetry::describe_metrics;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            model,
            settings,
            threshold,
            source,
            width,
            height,
            components,
            pattern,
            rate,
            duration,
            seed,
            json,
            verbose,
        } => {
            init_logging(verbose);
            describe_metrics();

            let settings = match settings {
                Some(path) => MonitorSettings::from_file(&path)
                    .with_context(|| format!("Failed to read settings {}", path.display()))?,
                None => MonitorSettings::default(),
            };
            let Some(model) = model.or_else(|| settings.model_path.clone()) else {
                bail!("no model given; pass --model or set model_path in the settings file");
            };
            let threshold = threshold.unwrap_or(settings.threshold);

            let config = StreamConfig {
                width,
                height,
                components,
                pattern,
                rate,
                seed,
            };

            let source = SourceId::new(source);
            run(model, settings, threshold, source, config, duration, json).await?;
        }

        Commands::Scaffold {
            output,
            name,
            size,
            channels,
            labels,
            verbose,
        } => {
            init_logging(verbose);

            let mut descriptor = ModelDescriptor::simple_cnn(name, size, channels);
            if let Some(labels) = labels {
                descriptor = descriptor.with_labels(labels);
            }

            let files = scaffold_model(&descriptor, &output)?;
            println!("Wrote {}", files.descriptor.display());
            println!("Wrote {}", files.weights.display());
        }

        Commands::Inspect { model, verbose } => {
            init_logging(verbose);
            inspect(&model)?;
        }
    }

    Ok(())
}

async fn run(
    model: PathBuf,
    settings: MonitorSettings,
    threshold: f32,
    source: SourceId,
    config: StreamConfig,
    duration: u64,
    json: bool,
) -> anyhow::Result<()> {
    let frames = Arc::new(InMemorySource::new());
    let stream = Arc::new(SyntheticStream::new(frames.clone(), source.clone()));
    let mut generator = FrameGenerator::new(config.clone());
    stream.prime(&mut generator)?;

    let poll_interval = settings.poll_interval();
    let emit_unchanged = settings.emit_unchanged;
    let mut controller = ClassificationController::new(frames.clone(), settings);

    if !controller.load_model(&model) {
        bail!("Failed to load model from {}", model.display());
    }
    controller.start(&source, threshold)?;

    println!();
    println!(
        "  Source:    {} ({}x{}x{}, {:?})",
        source, config.width, config.height, config.components, config.pattern
    );
    println!("  Model:     {}", model.display());
    println!("  Threshold: {:.2}", threshold);
    println!();

    let poller = LabelPoller::spawn(
        controller.last_class_state(),
        poll_interval,
        emit_unchanged,
        move |class: &LastClass| {
            if json {
                match class.to_json() {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(error = %e, "Failed to serialize label"),
                }
            } else {
                println!(
                    "  [{:>6}] {:<8} {:6.2}%",
                    class.sequence,
                    class.label,
                    class.score * 100.0
                );
            }
        },
    );

    let (stop_tx, stop_signal) = oneshot::channel();
    let producer = {
        let stream = stream.clone();
        tokio::spawn(async move { stream.run(generator, stop_signal).await })
    };

    if duration > 0 {
        tokio::time::sleep(Duration::from_secs(duration)).await;
    } else {
        println!("Press Ctrl+C to stop.");
        tokio::signal::ctrl_c().await?;
    }

    let _ = stop_tx.send(());
    let published = producer.await?;
    poller.stop().await;

    // A second start toggles classification off.
    let state = controller.start(&source, threshold)?;
    debug_assert_eq!(state, ControllerState::Idle);

    let snapshot = controller.metrics().snapshot();
    println!();
    println!("  Frames published:  {}", published);
    println!("  Frames classified: {}", snapshot.frames_classified);
    println!("  Frames gated:      {}", snapshot.frames_gated);
    println!("  Frames failed:     {}", snapshot.frames_failed);
    println!("  Avg latency:       {} us", snapshot.avg_latency_us());

    Ok(())
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let files = resolve_model_files(path)?;
    let descriptor = ModelDescriptor::from_file(&files.descriptor)?;

    println!("Name:        {}", descriptor.name);
    println!("Version:     {}", descriptor.version);
    if !descriptor.description.is_empty() {
        println!("Description: {}", descriptor.description);
    }
    println!("Input shape: {:?}", descriptor.input_shape);
    println!("Labels:      {}", descriptor.labels.join(", "));
    println!("Device:      {:?}", descriptor.device);
    println!("Layers:");
    for (index, layer) in descriptor.layers.iter().enumerate() {
        println!("  {:>2}: {:?}", index, layer);
    }
    println!("Weights:     {}", files.weights.display());

    match CandleImageModel::load(path) {
        Ok(_) => println!("Status:      loads"),
        Err(e) => println!("Status:      fails to load ({})", e),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "framewatch_demo=debug,framewatch_classifiers=debug,framewatch_core=debug"
    } else {
        "framewatch_demo=info,framewatch_classifiers=info,framewatch_core=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
