//! evroute - plan EV trips and stitch road routes from the command line.
//!
//! Usage:
//!   evroute plan --from 52.52,13.405 --to 48.137,11.575 --range-km 350 --soc 80
//!   evroute stitch 52.52,13.405 51.34,12.37 48.137,11.575
//!
//! Service endpoints come from `EVROUTE_*` environment variables; flags
//! override them. Results are printed as GeoJSON on stdout, logs go to stderr.

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use evroute_cli::{
    parse_lat_lon, plan_trip_until, preview_collection, route_collection, waypoints_to_points,
};
use evroute_core::LatLon;
use evroute_directions::{MapboxDirectionsClient, SegmentStitcher};
use evroute_flow::{build_flow, Config, RouteFlow, TripForm};
use evroute_planner::{ReferencePlanner, RoutePlanner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "EV trip planning and route stitching")]
struct Cli {
    /// Planner service base URL
    #[arg(long, global = true)]
    planner_url: Option<String>,

    /// Directions provider access token
    #[arg(long, global = true)]
    directions_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a trip with charging stops
    Plan(PlanArgs),
    /// Build one road route through the given waypoints
    Stitch(StitchArgs),
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[arg(long, value_parser = parse_lat_lon)]
    from: LatLon,

    #[arg(long, value_parser = parse_lat_lon)]
    to: LatLon,

    /// Vehicle range on a full battery
    #[arg(long)]
    range_km: String,

    /// Current state of charge, percent
    #[arg(long)]
    soc: String,

    /// Charge to keep on arrival, percent
    #[arg(long, default_value = "10")]
    reserve: String,

    #[arg(long)]
    corridor_km: Option<String>,

    #[arg(long)]
    max_stops: Option<String>,

    /// Target charge after each stop, percent
    #[arg(long)]
    charge_after: Option<String>,

    /// Skip road geometry and draw straight segments
    #[arg(long)]
    straight_line: bool,

    /// Use the built-in direct-trip planner instead of the planner service
    #[arg(long)]
    offline: bool,
}

#[derive(Args, Debug)]
struct StitchArgs {
    /// Waypoints as LAT,LON in travel order
    #[arg(required = true, num_args = 2.., value_parser = parse_lat_lon)]
    waypoints: Vec<LatLon>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("evroute=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(url) = cli.planner_url {
        config.planner_url = url;
    }
    if let Some(token) = cli.directions_token {
        config.directions_token = token;
    }

    match cli.command {
        Command::Plan(args) => plan(config, args).await,
        Command::Stitch(args) => stitch(config, args).await,
    }
}

async fn plan(mut config: Config, args: PlanArgs) -> Result<()> {
    if args.straight_line {
        config.stitch_road_geometry = false;
    }
    let form = TripForm {
        start: Some(args.from),
        destination: Some(args.to),
        max_range_km: args.range_km,
        current_soc_percent: args.soc,
        reserve_percent: args.reserve,
        corridor_km: args.corridor_km.unwrap_or_default(),
        max_stops: args.max_stops.unwrap_or_default(),
        charge_after_stop_percent: args.charge_after.unwrap_or_default(),
    };

    let preview = if args.offline {
        let stitcher = SegmentStitcher::new(
            MapboxDirectionsClient::new(config.directions_params())?,
            config.stitch_params(),
        );
        let flow = RouteFlow::new(
            RoutePlanner::new(ReferencePlanner::default()),
            stitcher,
            config.flow_options(),
        );
        plan_trip_until(&flow, &form, tokio::signal::ctrl_c()).await?
    } else {
        let flow = build_flow(&config)?;
        plan_trip_until(&flow, &form, tokio::signal::ctrl_c()).await?
    };

    tracing::info!(
        stops = preview.plan.summary.charging_stops,
        distance_km = preview.plan.summary.distance_km,
        duration_min = preview.plan.summary.duration_min,
        "Trip planned"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&preview_collection(&preview))?
    );
    Ok(())
}

async fn stitch(config: Config, args: StitchArgs) -> Result<()> {
    let stitcher = SegmentStitcher::new(
        MapboxDirectionsClient::new(config.directions_params())?,
        config.stitch_params(),
    );
    let points = waypoints_to_points(&args.waypoints);

    let route = match stitcher.stitch(&points).await {
        Ok(route) => route,
        Err(err) => bail!(err.user_message()),
    };
    tracing::info!(
        waypoints = points.len(),
        vertices = route.polyline.len(),
        distance_km = route.distance_meters / 1000.0,
        "Route stitched"
    );
    println!("{}", serde_json::to_string_pretty(&route_collection(&route))?);
    Ok(())
}
