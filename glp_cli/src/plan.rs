use std::{fs::File, io::BufWriter, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use glp_optimizer::{
    json::{report::PlanningReport, scenario::JsonPlanningScenario},
    planner::{
        planner_params::PlannerParams,
        planning_outcome::{PlanningOutcome, RejectionReason},
        route_planner::RoutePlanner,
    },
};
use glp_routing::{clock::SimulatedClock, utils::threads::Threads};
use jiff::SignedDuration;
use tracing::{info, warn};

use crate::parsers;

#[derive(Args)]
pub struct PlanArgs {
    /// Scenario file
    #[arg(short, long)]
    scenario: PathBuf,

    /// Write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include the cell path of every route in the report
    #[arg(long)]
    include_paths: bool,

    /// Seed for the ant colony, random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Number of planner threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// How long to wait for all trucks (e.g., "30s", "PT1M")
    #[arg(long, value_parser = parsers::parse_duration)]
    timeout: Option<SignedDuration>,

    /// Plan trucks one after another
    #[arg(long)]
    sequential: bool,

    /// Start every route that does not need an operator
    #[arg(long)]
    dispatch: bool,
}

pub fn run(args: PlanArgs, mut params: PlannerParams) -> Result<(), anyhow::Error> {
    info!("Planning scenario {:?}", args.scenario);

    let scenario = JsonPlanningScenario::from_path(&args.scenario)
        .with_context(|| format!("Failed to load {}", args.scenario.display()))?
        .build()?;

    if let Some(seed) = args.seed {
        params.ant_colony.seed = Some(seed);
    }
    if let Some(threads) = args.threads {
        params.threads = Threads::Multi(threads);
    }
    if let Some(timeout) = args.timeout {
        params.truck_timeout = timeout;
    }
    if args.sequential {
        params.parallel_trucks = false;
    }

    let clock = Arc::new(SimulatedClock::new(scenario.input.now()));
    let planner = RoutePlanner::new(params, scenario.grid, clock)?;
    let mut outcome = planner.plan(scenario.input);
    if args.dispatch {
        let started = outcome.dispatch();
        info!(started, held = outcome.routes.len() - started, "Routes dispatched");
    }

    print_outcome(&outcome);

    if let Some(output) = args.output {
        let report = PlanningReport::from_outcome(&outcome, args.include_paths);
        let file = File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
        info!("Report written to {}", output.display());
    }

    if !planner.shutdown(Duration::from_secs(2)) {
        warn!("Cache refresh workers did not stop cleanly");
    }

    Ok(())
}

fn print_outcome(outcome: &PlanningOutcome) {
    let input = &outcome.input;

    let mut routes = Table::new();
    routes.load_preset(UTF8_FULL).set_header(vec![
        "Truck", "State", "Stops", "Distance (km)", "Fuel (gal)", "Duration", "Return", "Decision",
        "Quality", "Issues",
    ]);
    for planned in &outcome.routes {
        let route = &planned.route;
        routes.add_row(vec![
            input.truck(route.truck()).id().to_owned(),
            format!("{:?}", route.state()),
            route.delivery_count().to_string(),
            format!("{:.1}", route.total_distance_km()),
            format!("{:.2}", route.total_fuel_gal()),
            format!("{:#}", SignedDuration::from_secs(route.total_duration().as_secs())),
            input.warehouse(planned.return_warehouse).id().to_owned(),
            format!("{:?}", planned.return_decision),
            format!("{:.2}", planned.validation.quality.total),
            planned.validation.issues.len().to_string(),
        ]);
    }
    println!("{routes}");

    if !outcome.rejected.is_empty() {
        let mut rejected = Table::new();
        rejected
            .load_preset(UTF8_FULL)
            .set_header(vec!["Truck", "Orders", "Fatal", "Reason"]);
        for rejection in &outcome.rejected {
            let reason = match &rejection.reason {
                RejectionReason::Routing { error } => error.to_string(),
                RejectionReason::Validation { issues, .. } => issues
                    .iter()
                    .map(|issue| format!("{issue:?}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            rejected.add_row(vec![
                input.truck(rejection.truck).id().to_owned(),
                rejection.deliveries.len().to_string(),
                rejection.reason.is_fatal().to_string(),
                reason,
            ]);
        }
        println!("{rejected}");
    }

    for unassigned in &outcome.unassigned {
        warn!(
            order = input.order(unassigned.order).id(),
            volume_m3 = unassigned.volume_m3,
            "Order not assigned to any truck"
        );
    }
    for dropped in outcome.dropped_deliveries() {
        warn!(
            order = input.order(dropped.order).id(),
            truck = input.truck(dropped.truck).id(),
            "Delivery dropped to reach a warehouse"
        );
    }

    let statistics = &outcome.statistics;
    info!(
        strategy = ?statistics.strategy,
        routes = statistics.routes,
        rejected = statistics.rejected,
        searches = statistics.pathfinder.searches,
        cache_hit_ratio = statistics.cache.hit_ratio(),
        elapsed = ?statistics.elapsed,
        requires_intervention = outcome.requires_intervention(),
        "Planning done"
    );
}
