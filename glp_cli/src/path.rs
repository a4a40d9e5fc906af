use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Args;
use glp_optimizer::{json::scenario::JsonPlanningScenario, planner::planner_params::PlannerParams};
use glp_routing::{
    point::Point,
    routing::{
        pathfinder::Pathfinder, pathfinder_statistics::PathfinderStatistics,
        search_params::SearchParams,
    },
};
use tracing::info;

use crate::parsers;

#[derive(Args)]
pub struct PathArgs {
    /// Scenario file providing the grid bounds and obstacles
    #[arg(short, long)]
    scenario: PathBuf,

    /// Origin cell as `x,y`
    #[arg(long, value_parser = parsers::parse_point)]
    from: Point,

    /// Destination cell as `x,y`
    #[arg(long, value_parser = parsers::parse_point)]
    to: Point,

    #[arg(short, long)]
    bidirectional: bool,

    /// Print every cell of the path
    #[arg(long)]
    show: bool,
}

pub fn run(args: PathArgs, params: PlannerParams) -> Result<(), anyhow::Error> {
    let scenario = JsonPlanningScenario::from_path(&args.scenario)
        .with_context(|| format!("Failed to load {}", args.scenario.display()))?
        .build()?;

    let pathfinder = Pathfinder::new(
        params.pathfinder.clone(),
        Some(scenario.grid),
        None,
        Arc::new(PathfinderStatistics::default()),
    )?;
    let search = SearchParams {
        bidirectional: args.bidirectional,
        use_cache: false,
        ..params.pathfinder.search
    };

    let result = pathfinder.find_path(args.from, args.to, &search);
    match result.error {
        None => {
            info!(
                from = %args.from,
                to = %args.to,
                distance = ?result.grid_distance(),
                nodes_explored = result.metrics.nodes_explored,
                elapsed = ?result.metrics.elapsed,
                "Path found"
            );
            if args.show {
                let cells = result
                    .path
                    .iter()
                    .map(|point| point.to_string())
                    .collect::<Vec<_>>();
                println!("{}", cells.join(" -> "));
            }
            Ok(())
        }
        Some(error) => Err(anyhow::anyhow!(
            "No path from {} to {}: {error}",
            args.from,
            args.to
        )),
    }
}
