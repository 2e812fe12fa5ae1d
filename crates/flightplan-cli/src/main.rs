use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flightplan_cli::{load_profile, summarize, InspectArgs, PlanArgs};
use flightplan_core::{create_flightplan, read_mission};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drone survey flight plan generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a flight plan for a project area
    Plan(PlanArgs),
    /// Summarise an existing KMZ mission
    Inspect(InspectArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flightplan_core=info".parse()?)
                .add_directive("flightplan=info".parse()?),
        )
        .init();

    match Cli::parse().command {
        Command::Plan(args) => plan(&args),
        Command::Inspect(args) => inspect(&args),
    }
}

fn plan(args: &PlanArgs) -> Result<()> {
    let profile = load_profile(args.profile.as_deref())?;
    tracing::info!("planning {}", args.project_geojson.display());
    let options = args.to_options()?;
    let plan = create_flightplan(&options, &profile).context("flight plan generation failed")?;

    println!(
        "{} waypoints, agl {:.1} m, gsd {:.2} cm/px, speed {:.2} m/s",
        plan.waypath.waypoints().len(),
        plan.spacing.agl,
        plan.spacing.gsd,
        plan.spacing.ground_speed
    );
    if plan.excluded_by_no_fly > 0 {
        println!("{} grid points excluded by no-fly zones", plan.excluded_by_no_fly);
    }
    if let Some(report) = &plan.elevation {
        if report.degraded() > 0 {
            println!(
                "terrain: {} waypoints used fallback elevation ({} clamped, {} nearest valid, {} flat)",
                report.degraded(),
                report.clamped,
                report.nearest_valid,
                report.flat
            );
        }
    }
    println!("written to {}", args.outfile.display());
    Ok(())
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let placemarks = read_mission(&args.mission)
        .with_context(|| format!("failed to read mission {}", args.mission.display()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&placemarks)?);
    } else {
        print!("{}", summarize(&placemarks));
    }
    Ok(())
}
