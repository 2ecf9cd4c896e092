use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::astrometry::{AstrometryError, RvPatch};
use crate::catalog::catalog::StarCatalog;
use crate::kinematics::solver::closest_approach;
use crate::kinematics::trajectory::TrajectorySampler;
use crate::naming::{display_name, CommonNameMap};

#[derive(Debug, Error, PartialEq)]
pub enum EncounterError {
    #[error("reference star '{reference}' not found in catalog")]
    ReferenceNotFound { reference: String },
    #[error("reference '{reference}' is ambiguous: {matches} catalog records share it")]
    AmbiguousReference { reference: String, matches: usize },
    #[error("reference star velocity cannot be derived: {0}")]
    ReferenceVelocity(#[from] AstrometryError),
}

/// How the caller designates the reference star.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceSelector {
    Id(u64),
    Name(String),
}

impl fmt::Display for ReferenceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSelector::Id(id) => write!(f, "id {id}"),
            ReferenceSelector::Name(name) => f.write_str(name),
        }
    }
}

/// Position and velocity of the designated reference star. Subtracting them
/// re-centers the catalog on that star, leaving it stationary at the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferenceFrame {
    pub pos: [f64; 3],
    pub vel: [f64; 3],
}

impl ReferenceFrame {
    /// Re-express a position/velocity pair relative to the reference.
    pub fn shift(&self, pos: [f64; 3], vel: [f64; 3]) -> ([f64; 3], [f64; 3]) {
        (
            [
                pos[0] - self.pos[0],
                pos[1] - self.pos[1],
                pos[2] - self.pos[2],
            ],
            [
                vel[0] - self.vel[0],
                vel[1] - self.vel[1],
                vel[2] - self.vel[2],
            ],
        )
    }

    /// Inverse of [`ReferenceFrame::shift`]; restores catalog-frame
    /// quantities.
    pub fn unshift(&self, pos: [f64; 3], vel: [f64; 3]) -> ([f64; 3], [f64; 3]) {
        (
            [
                pos[0] + self.pos[0],
                pos[1] + self.pos[1],
                pos[2] + self.pos[2],
            ],
            [
                vel[0] + self.vel[0],
                vel[1] + self.vel[1],
                vel[2] + self.vel[2],
            ],
        )
    }
}

/// One star that passes within the distance threshold. Derived per query and
/// read-only; the source catalog is never touched.
#[derive(Clone, Debug, Serialize)]
pub struct EncounterResult {
    pub id: u64,
    pub name: String,
    /// Reference-relative position at the epoch, light-years.
    pub pos: [f64; 3],
    /// Reference-relative velocity, light-years per century.
    pub vel: [f64; 3],
    /// Centuries until (or since, if negative) closest approach.
    pub t_min: f64,
    /// Separation at closest approach, light-years.
    pub d_min: f64,
}

impl EncounterResult {
    /// Distance-vs-time samples for this star in the reference frame, for
    /// validation and rendering.
    pub fn trajectory(&self, t_start: f64, t_end: f64) -> TrajectorySampler {
        TrajectorySampler::new(self.pos, self.vel, t_start, t_end)
    }
}

/// Outcome counts for one filter pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct EncounterSummary {
    /// Non-reference records examined.
    pub scanned: usize,
    /// Records dropped because no radial velocity could be found.
    pub missing_radial_velocity: usize,
    /// Records dropped for a non-positive parallax.
    pub non_positive_parallax: usize,
    /// Records whose closest approach fell inside the threshold.
    pub passed: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct EncounterSearch {
    /// Ascending by `d_min`, ties broken by name.
    pub encounters: Vec<EncounterResult>,
    pub summary: EncounterSummary,
}

/// Find every star whose closest approach to the reference star comes within
/// `threshold_ly`.
///
/// The catalog is re-centered on the reference record (which must resolve
/// uniquely), each remaining record is run through the closest-approach
/// solver, and survivors are ordered ascending by `d_min` with name as the
/// tie-break. Records whose velocity cannot be derived are counted in the
/// summary and dropped; they never abort the batch. A failed reference
/// lookup aborts the whole query, since no valid frame exists.
///
/// The pass streams over the catalog once and keeps only survivors, so
/// memory is bounded by the result set. Per-record work depends only on that
/// record and the fixed frame, and the final ordering is independent of scan
/// order.
pub fn find_encounters(
    catalog: &StarCatalog,
    reference: &ReferenceSelector,
    threshold_ly: f64,
    patch: Option<&RvPatch>,
    common_names: &CommonNameMap,
) -> Result<EncounterSearch, EncounterError> {
    let reference_index = resolve_reference(catalog, reference)?;
    let reference_record = &catalog.records[reference_index];
    let frame = ReferenceFrame {
        pos: reference_record.pos,
        vel: reference_record.velocity_ly_cy(patch)?,
    };

    let mut encounters = Vec::new();
    let mut summary = EncounterSummary::default();

    for (index, record) in catalog.records.iter().enumerate() {
        if index == reference_index {
            continue;
        }
        summary.scanned += 1;

        let vel = match record.velocity_ly_cy(patch) {
            Ok(vel) => vel,
            Err(AstrometryError::MissingRadialVelocity { .. }) => {
                summary.missing_radial_velocity += 1;
                continue;
            }
            Err(AstrometryError::NonPositiveParallax { .. }) => {
                summary.non_positive_parallax += 1;
                continue;
            }
        };

        let (pos, vel) = frame.shift(record.pos, vel);
        let approach = closest_approach(pos, vel);
        if approach.d_min <= threshold_ly {
            encounters.push(EncounterResult {
                id: record.id,
                name: display_name(record, common_names),
                pos,
                vel,
                t_min: approach.t_min,
                d_min: approach.d_min,
            });
        }
    }

    summary.passed = encounters.len();
    encounters.sort_by(|a, b| {
        a.d_min
            .partial_cmp(&b.d_min)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(EncounterSearch {
        encounters,
        summary,
    })
}

fn resolve_reference(
    catalog: &StarCatalog,
    reference: &ReferenceSelector,
) -> Result<usize, EncounterError> {
    match reference {
        ReferenceSelector::Id(id) => {
            catalog
                .index_of_id(*id)
                .ok_or_else(|| EncounterError::ReferenceNotFound {
                    reference: reference.to_string(),
                })
        }
        ReferenceSelector::Name(name) => match catalog.indices_of_name(name) {
            [] => Err(EncounterError::ReferenceNotFound {
                reference: reference.to_string(),
            }),
            [index] => Ok(*index),
            matches => Err(EncounterError::AmbiguousReference {
                reference: name.clone(),
                matches: matches.len(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::astrometry::Observables;
    use crate::{StarRecord, Velocity};

    fn star(id: u64, name: &str, pos: [f64; 3], vel: [f64; 3]) -> StarRecord {
        StarRecord {
            id,
            proper: Some(name.to_string()),
            designation: None,
            pos,
            velocity: Velocity::Cartesian(vel),
        }
    }

    fn star_without_rv(id: u64, name: &str, pos: [f64; 3]) -> StarRecord {
        StarRecord {
            id,
            proper: Some(name.to_string()),
            designation: None,
            pos,
            velocity: Velocity::Astrometric(Observables {
                ra_deg: 45.0,
                dec_deg: 10.0,
                parallax_mas: 250.0,
                pm_ra_mas_yr: 120.0,
                pm_dec_mas_yr: -80.0,
                rv_km_s: None,
            }),
        }
    }

    fn sample_catalog() -> StarCatalog {
        StarCatalog::new(vec![
            star(0, "Sol", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            star(1, "Incoming", [10.0, 0.0, 0.0], [-1.0, 0.0, 0.0]),
            star(2, "Sideways", [0.0, 5.0, 0.0], [1.0, 0.0, 0.0]),
            star(3, "Distant", [0.0, 0.0, 40.0], [1.0, 0.0, 0.0]),
        ])
    }

    #[test]
    fn results_are_sorted_and_reference_free() {
        let search = find_encounters(
            &sample_catalog(),
            &ReferenceSelector::Name("Sol".to_string()),
            7.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap();

        let names: Vec<&str> = search.encounters.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Incoming", "Sideways"]);
        assert_approx_eq!(search.encounters[0].t_min, 10.0, 1e-12);
        assert_approx_eq!(search.encounters[0].d_min, 0.0, 1e-12);
        assert_eq!(search.encounters[1].t_min, 0.0);
        assert_eq!(search.encounters[1].d_min, 5.0);
        assert_eq!(search.summary.scanned, 3);
        assert_eq!(search.summary.passed, 2);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let catalog = StarCatalog::new(vec![
            star(0, "Sol", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            star(1, "Edge", [0.0, 5.0, 0.0], [1.0, 0.0, 0.0]),
        ]);
        let reference = ReferenceSelector::Id(0);

        let at = find_encounters(&catalog, &reference, 5.0, None, &CommonNameMap::new()).unwrap();
        assert_eq!(at.encounters.len(), 1);

        let under =
            find_encounters(&catalog, &reference, 4.999, None, &CommonNameMap::new()).unwrap();
        assert!(under.encounters.is_empty());
        assert_eq!(under.summary.scanned, 1);
        assert_eq!(under.summary.passed, 0);
    }

    #[test]
    fn moving_reference_frame_is_subtracted() {
        // Both stars drift with the same (1, 0, 0); relative motion is what
        // remains.
        let catalog = StarCatalog::new(vec![
            star(0, "Ref", [1.0, 1.0, 1.0], [1.0, 0.0, 0.0]),
            star(1, "Target", [11.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
        ]);
        let search = find_encounters(
            &catalog,
            &ReferenceSelector::Id(0),
            20.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap();

        let target = &search.encounters[0];
        assert_eq!(target.pos, [10.0, 0.0, 0.0]);
        assert_eq!(target.vel, [-1.0, 0.0, 0.0]);
        assert_approx_eq!(target.t_min, 10.0, 1e-12);
        assert_approx_eq!(target.d_min, 0.0, 1e-12);
    }

    #[test]
    fn ties_on_distance_order_by_name() {
        let catalog = StarCatalog::new(vec![
            star(0, "Sol", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            star(1, "Zeta", [0.0, 3.0, 0.0], [1.0, 0.0, 0.0]),
            star(2, "Alpha", [3.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ]);
        let search = find_encounters(
            &catalog,
            &ReferenceSelector::Id(0),
            7.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap();

        let names: Vec<&str> = search.encounters.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Zeta"]);
    }

    #[test]
    fn missing_reference_aborts() {
        let err = find_encounters(
            &sample_catalog(),
            &ReferenceSelector::Name("Vega".to_string()),
            7.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EncounterError::ReferenceNotFound { .. }));

        let err = find_encounters(
            &sample_catalog(),
            &ReferenceSelector::Id(77),
            7.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EncounterError::ReferenceNotFound { .. }));
    }

    #[test]
    fn ambiguous_reference_name_aborts() {
        let catalog = StarCatalog::new(vec![
            star(0, "Twin", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            star(1, "Twin", [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
        ]);
        let err = find_encounters(
            &catalog,
            &ReferenceSelector::Name("Twin".to_string()),
            7.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EncounterError::AmbiguousReference {
                reference: "Twin".to_string(),
                matches: 2,
            }
        );
    }

    #[test]
    fn records_without_radial_velocity_are_counted_not_fatal() {
        let catalog = StarCatalog::new(vec![
            star(0, "Sol", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            star(1, "Incoming", [10.0, 0.0, 0.0], [-1.0, 0.0, 0.0]),
            star_without_rv(2, "Ghost A", [4.0, 0.0, 0.0]),
            star_without_rv(3, "Ghost B", [0.0, 4.0, 0.0]),
        ]);
        let search = find_encounters(
            &catalog,
            &ReferenceSelector::Id(0),
            7.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap();

        assert_eq!(search.summary.scanned, 3);
        assert_eq!(search.summary.missing_radial_velocity, 2);
        assert_eq!(search.summary.passed, 1);
        assert_eq!(search.encounters[0].name, "Incoming");
    }

    #[test]
    fn patched_radial_velocity_rescues_a_record() {
        let catalog = StarCatalog::new(vec![
            star(0, "Sol", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            star_without_rv(2, "Ghost", [4.0, 0.0, 0.0]),
        ]);
        let patch =
            RvPatch::new().with_source(std::collections::HashMap::from([(2, -20.0)]));

        let search = find_encounters(
            &catalog,
            &ReferenceSelector::Id(0),
            // Velocity is small in ly/century, so current separation bounds
            // d_min well under this.
            10.0,
            Some(&patch),
            &CommonNameMap::new(),
        )
        .unwrap();

        assert_eq!(search.summary.missing_radial_velocity, 0);
        assert_eq!(search.summary.passed, 1);
        assert_eq!(search.encounters[0].id, 2);
    }

    #[test]
    fn bad_parallax_is_counted_separately() {
        let mut ghost = star_without_rv(2, "Ghost", [4.0, 0.0, 0.0]);
        if let Velocity::Astrometric(obs) = &mut ghost.velocity {
            obs.parallax_mas = 0.0;
            obs.rv_km_s = Some(10.0);
        }
        let catalog = StarCatalog::new(vec![
            star(0, "Sol", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            ghost,
        ]);
        let search = find_encounters(
            &catalog,
            &ReferenceSelector::Id(0),
            7.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap();

        assert_eq!(search.summary.non_positive_parallax, 1);
        assert_eq!(search.summary.missing_radial_velocity, 0);
        assert_eq!(search.summary.passed, 0);
    }

    #[test]
    fn shift_then_unshift_is_identity() {
        let frame = ReferenceFrame {
            pos: [1.5, -2.0, 3.25],
            vel: [0.1, 0.2, -0.3],
        };
        let pos = [10.0, 20.0, -30.0];
        let vel = [-1.0, 0.5, 0.25];

        let (sp, sv) = frame.shift(pos, vel);
        let (rp, rv) = frame.unshift(sp, sv);
        for axis in 0..3 {
            assert_approx_eq!(rp[axis], pos[axis], 1e-12);
            assert_approx_eq!(rv[axis], vel[axis], 1e-12);
        }
    }

    #[test]
    fn input_catalog_is_untouched() {
        let catalog = sample_catalog();
        let before = catalog.records.clone();
        let _ = find_encounters(
            &catalog,
            &ReferenceSelector::Id(0),
            7.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap();
        assert_eq!(catalog.records, before);
    }

    #[test]
    fn threshold_sweep_partitions_exactly() {
        let catalog = sample_catalog();
        let reference = ReferenceSelector::Id(0);
        for threshold in [0.0, 1.0, 4.999, 5.0, 7.0, 50.0] {
            let search =
                find_encounters(&catalog, &reference, threshold, None, &CommonNameMap::new())
                    .unwrap();
            for encounter in &search.encounters {
                assert!(encounter.d_min <= threshold);
            }
            let expected = [(1u64, 0.0), (2, 5.0), (3, 40.0)]
                .iter()
                .filter(|(_, d)| *d <= threshold)
                .count();
            assert_eq!(search.encounters.len(), expected);
        }
    }

    #[test]
    fn encounter_trajectory_samples_the_shifted_state() {
        let search = find_encounters(
            &sample_catalog(),
            &ReferenceSelector::Id(0),
            7.0,
            None,
            &CommonNameMap::new(),
        )
        .unwrap();
        let incoming = &search.encounters[0];

        let samples: Vec<(f64, f64)> = incoming.trajectory(0.0, 10.0).collect();
        assert_approx_eq!(samples[0].1, 10.0, 1e-12);
        assert_approx_eq!(samples.last().unwrap().1, 0.0, 1e-9);
    }
}
