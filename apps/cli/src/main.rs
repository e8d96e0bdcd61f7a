use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use planner_core::{
    capture::{self, CaptureOptions},
    catalog,
    config::{self, PlannerSettings},
    export::{self, ExportOutcome, ExportPipeline},
    map, AddOutcome, Itinerary, PersistenceAdapter, Planner, ReorderOutcome, RouteTracker,
};
use shared::{
    domain::{Event, EventId, RouteMode},
    error::PlannerError,
};
use storage::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "picnic-planner", about = "Plan a Picnic Day itinerary from the terminal")]
struct Args {
    /// SQLite database holding the saved itinerary.
    #[arg(long)]
    database_url: Option<String>,
    /// JSON catalog to use instead of the built-in events.
    #[arg(long)]
    catalog: Option<PathBuf>,
    #[arg(long)]
    route_mode: Option<RouteMode>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every event in the catalog.
    Catalog,
    /// Case-insensitive name search over the catalog.
    Search { query: String },
    /// Print the itinerary in visit order.
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Append events by id; ids already planned are left where they are.
    Add {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Move the stop at position FROM to position TO (both 1-based).
    Reorder { from: usize, to: usize },
    /// Ask the routing service for the walking route between the stops.
    Route,
    /// Print a walking-directions link for the stop at POSITION (1-based).
    Directions { position: usize },
    /// Write the itinerary and a map snapshot to a PDF.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
        /// Skip map tiles and draw only markers and route.
        #[arg(long)]
        offline: bool,
        #[arg(long, default_value_t = capture::DEFAULT_CAPTURE_SIZE[0])]
        width: u32,
        #[arg(long, default_value_t = capture::DEFAULT_CAPTURE_SIZE[1])]
        height: u32,
        #[arg(long)]
        title: Option<String>,
    },
    /// Forget the saved itinerary.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(url) = args.database_url {
        settings.database_url = url;
    }
    if let Some(path) = args.catalog {
        settings.catalog_path = Some(path);
    }
    if let Some(mode) = args.route_mode {
        settings.route_mode = mode;
    }

    let catalog = Arc::new(settings.load_catalog()?);
    if let Command::Catalog = args.command {
        for event in catalog.events() {
            print_catalog_event(event);
        }
        return Ok(());
    }
    if let Command::Search { query } = &args.command {
        let results = catalog::filter(&catalog, query);
        if results.is_empty() {
            println!("No events match '{query}'.");
        }
        for event in results {
            print_catalog_event(event);
        }
        return Ok(());
    }

    let database_url = config::prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open database '{database_url}'"))?;
    let adapter = PersistenceAdapter::new(Arc::new(storage));

    if let Command::Clear = args.command {
        if adapter.clear().await? {
            println!("Itinerary cleared.");
        } else {
            println!("No saved itinerary.");
        }
        return Ok(());
    }

    let mut planner = Planner::new(catalog);
    let mirror = adapter.spawn_mirror(planner.subscribe_events());
    planner.restore(adapter.load().await);

    let outcome = run(&mut planner, args.command, &settings).await;

    drop(planner);
    let writes = mirror.await.context("persistence task failed")?;
    tracing::debug!(writes, "persistence mirror finished");
    outcome
}

async fn run(planner: &mut Planner, command: Command, settings: &PlannerSettings) -> Result<()> {
    match command {
        Command::Catalog | Command::Search { .. } | Command::Clear => {}
        Command::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(planner.itinerary())?);
            } else {
                print_itinerary(planner.itinerary());
            }
        }
        Command::Add { ids } => {
            for id in ids {
                match planner.add_by_id(EventId(id))? {
                    AddOutcome::Appended { position } => {
                        println!("Added #{id} as stop {}.", position + 1)
                    }
                    AddOutcome::AlreadyPresent { position } => {
                        println!("#{id} is already stop {}.", position + 1)
                    }
                }
            }
            print_itinerary(planner.itinerary());
        }
        Command::Reorder { from, to } => {
            let from = zero_based(from)?;
            let to = zero_based(to)?;
            match planner.reorder(from, to)? {
                ReorderOutcome::Moved { .. } => print_itinerary(planner.itinerary()),
                ReorderOutcome::Unchanged => println!("Order unchanged."),
            }
        }
        Command::Route => {
            let waypoints = planner.itinerary().waypoints();
            if waypoints.len() < 2 {
                println!("Add at least two stops to get a route.");
                return Ok(());
            }
            let router = settings.build_router()?;
            let mut tracker = RouteTracker::new(settings.route_mode);
            let geometry = match tracker.on_waypoints_changed(waypoints) {
                Some(request) => {
                    let result = router.route(&request.waypoints, request.mode).await;
                    tracker.resolve(request.generation, result);
                    tracker.current().cloned()
                }
                None => tracker.current().cloned(),
            };
            match geometry {
                Some(geometry) => {
                    println!("Route with {} points.", geometry.points.len());
                    if let Some(distance) = geometry.distance_m {
                        println!("Distance: {:.0} m", distance);
                    }
                    if let Some(duration) = geometry.duration_s {
                        println!("Walking time: {:.0} min", duration / 60.0);
                    }
                }
                None => println!("No route available."),
            }
        }
        Command::Directions { position } => {
            let index = zero_based(position)?;
            let Some(event) = planner.itinerary().get(index) else {
                return Err(PlannerError::PositionOutOfRange {
                    position,
                    len: planner.itinerary().len(),
                }
                .into());
            };
            println!("{}", map::directions_url(event.position())?);
        }
        Command::Export {
            out,
            offline,
            width,
            height,
            title,
        } => {
            let itinerary = planner.itinerary();
            if itinerary.is_empty() {
                tracing::info!("itinerary is empty; nothing to export");
                return Ok(());
            }
            let tiles = if offline {
                None
            } else {
                Some(planner_core::tiles::TileClient::new(
                    settings.tile_url.clone(),
                    planner_core::tiles::DEFAULT_TILE_TIMEOUT,
                )?)
            };
            let snapshot = capture::capture_view(
                itinerary,
                RouteTracker::new(settings.route_mode),
                settings.build_router()?,
                tiles.as_ref(),
                CaptureOptions {
                    size: [width.max(1), height.max(1)],
                    settle_timeout: settings.route_timeout(),
                },
            )
            .await;

            let path = out.unwrap_or_else(|| settings.default_export_path());
            let title = title.unwrap_or_else(|| settings.export_title.clone());
            match export::export_to_file(
                &ExportPipeline::new(),
                &title,
                itinerary.events(),
                snapshot.as_ref(),
                &path,
            )
            .await?
            {
                ExportOutcome::Written { path, bytes } => {
                    println!("Wrote {} ({bytes} bytes).", path.display())
                }
                ExportOutcome::Skipped(reason) => tracing::info!("export skipped: {reason}"),
            }
        }
    }
    Ok(())
}

fn zero_based(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .context("positions start at 1")
}

fn print_catalog_event(event: &Event) {
    println!("#{:<3} {}", event.id, event.name);
    let meta = event.metadata_line();
    if !meta.is_empty() {
        println!("     {meta}");
    }
}

fn print_itinerary(itinerary: &Itinerary) {
    if itinerary.is_empty() {
        println!("Itinerary is empty.");
        return;
    }
    for marker in map::markers(itinerary) {
        let Some(event) = itinerary.get(marker.number - 1) else {
            continue;
        };
        println!("{:>2}. {} [{}]", marker.number, event.name, marker.color.hex());
        let meta = event.metadata_line();
        if !meta.is_empty() {
            println!("    {meta}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        assert_eq!(zero_based(1).expect("valid"), 0);
        assert!(zero_based(0).is_err());
    }

    #[test]
    fn parses_export_flags() {
        let args = Args::try_parse_from([
            "picnic-planner",
            "--route-mode",
            "straight",
            "export",
            "--offline",
            "--out",
            "plan.pdf",
        ])
        .expect("parse");
        assert_eq!(args.route_mode, Some(RouteMode::Straight));
        let Command::Export {
            out,
            offline,
            width,
            ..
        } = args.command
        else {
            panic!("expected export");
        };
        assert!(offline);
        assert_eq!(out, Some(PathBuf::from("plan.pdf")));
        assert_eq!(width, 1024);
    }

    #[test]
    fn add_requires_an_id() {
        assert!(Args::try_parse_from(["picnic-planner", "add"]).is_err());
    }
}
