use encounter_engine::catalog::catalog::StarCatalog;
use encounter_engine::encounter::encounter::{find_encounters, EncounterSummary, ReferenceSelector};
use encounter_engine::kinematics::trajectory::TrajectorySampler;
use encounter_engine::naming::CommonNameMap;
use encounter_engine::{StarRecord, Velocity};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Threshold applied when a request does not carry one, matching the usual
/// "within a handful of light-years" encounter studies.
const DEFAULT_THRESHOLD_LY: f64 = 7.0;

static DEMO_CATALOG: Lazy<StarCatalog> = Lazy::new(|| {
    // Tiny heliocentric demo table with approximate kinematics; production
    // deployments read a snapshot produced by `build_dataset`. Positions in
    // light-years, velocities in light-years per century.
    fn star(
        id: u64,
        proper: Option<&str>,
        designation: Option<&str>,
        pos: [f64; 3],
        vel: [f64; 3],
    ) -> StarRecord {
        StarRecord {
            id,
            proper: proper.map(str::to_string),
            designation: designation.map(str::to_string),
            pos,
            velocity: Velocity::Cartesian(vel),
        }
    }

    StarCatalog::new(vec![
        star(0, Some("Sol"), None, [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
        star(
            1,
            Some("Proxima Centauri"),
            Some("GJ 551"),
            [-1.54, -1.18, -3.77],
            [0.0035, 0.0027, 0.0065],
        ),
        star(2, None, Some("GJ 699"), [-0.06, -5.95, 0.49], [0.03, 0.0338, -0.0028]),
        star(
            3,
            Some("Ross 248"),
            Some("GJ 905"),
            [7.62, -0.60, 7.14],
            [-0.016, 0.006, -0.016],
        ),
        star(
            4,
            Some("Wolf 359"),
            Some("GJ 406"),
            [-7.50, 2.15, 0.96],
            [0.004, 0.0105, -0.001],
        ),
    ])
});

static COMMON_NAMES: Lazy<CommonNameMap> =
    Lazy::new(|| CommonNameMap::from([(2, "Barnards Star".to_string())]));

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EngineRequest {
    Encounters {
        reference: ReferenceSelector,
        threshold_ly: Option<f64>,
    },
    Trajectory {
        star_id: u64,
        t_start: f64,
        t_end: f64,
        step: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EngineResponse {
    Encounters {
        encounters: Vec<EncounterEntry>,
        summary: EncounterSummary,
    },
    Trajectory {
        samples: Vec<TrajectoryPoint>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Serialize)]
struct EncounterEntry {
    id: u64,
    name: String,
    d_min_ly: f64,
    t_min_centuries: f64,
    /// Same instant in thousands of years, the unit used on rendered plots.
    t_min_kyr: f64,
}

#[derive(Debug, Serialize)]
struct TrajectoryPoint {
    t_centuries: f64,
    distance_ly: f64,
}

async fn handler(event: LambdaEvent<EngineRequest>) -> Result<EngineResponse, Error> {
    match event.payload {
        EngineRequest::Encounters {
            reference,
            threshold_ly,
        } => {
            let threshold = threshold_ly.unwrap_or(DEFAULT_THRESHOLD_LY);
            match find_encounters(&DEMO_CATALOG, &reference, threshold, None, &COMMON_NAMES) {
                Ok(search) => Ok(EngineResponse::Encounters {
                    encounters: search
                        .encounters
                        .iter()
                        .map(|encounter| EncounterEntry {
                            id: encounter.id,
                            name: encounter.name.clone(),
                            d_min_ly: encounter.d_min,
                            t_min_centuries: encounter.t_min,
                            t_min_kyr: encounter.t_min / 10.0,
                        })
                        .collect(),
                    summary: search.summary,
                }),
                Err(err) => Ok(EngineResponse::Error {
                    message: err.to_string(),
                }),
            }
        }
        EngineRequest::Trajectory {
            star_id,
            t_start,
            t_end,
            step,
        } => {
            let catalog = &*DEMO_CATALOG;
            let Some(record) = catalog.index_of_id(star_id).and_then(|idx| catalog.get(idx))
            else {
                return Ok(EngineResponse::Error {
                    message: format!("Unknown star_id {}", star_id),
                });
            };
            let vel = match record.velocity_ly_cy(None) {
                Ok(vel) => vel,
                Err(err) => {
                    return Ok(EngineResponse::Error {
                        message: err.to_string(),
                    })
                }
            };
            let sampler = match step {
                Some(step) => TrajectorySampler::with_step(record.pos, vel, t_start, t_end, step),
                None => TrajectorySampler::new(record.pos, vel, t_start, t_end),
            };
            let samples = sampler
                .map(|(t, distance)| TrajectoryPoint {
                    t_centuries: t,
                    distance_ly: distance,
                })
                .collect();
            Ok(EngineResponse::Trajectory { samples })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let func = service_fn(handler);
    lambda_runtime::run(func).await
}
