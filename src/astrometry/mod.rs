//! Derivation of Cartesian space velocity from astrometric observables.
//!
//! A catalog row gives angular position (RA/Dec), parallax, proper motion
//! and radial velocity. Combining them yields the full (U, V, W) velocity
//! vector in the galactic frame. Rotation constants follow "The Hipparcos
//! and Tycho Catalogues" and "Reconsidering the Galactic coordinate system".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::units::PM_OVER_PARALLAX_TO_KM_S;

/// Equatorial-to-galactic orientation (J2000).
const GALACTIC_ORIENTATION: [[f64; 3]; 3] = [
    [-0.066988739410, -0.872755765850, -0.483538914637],
    [0.492728466081, -0.450346958020, 0.744584633279],
    [-0.867600811149, -0.188374601732, 0.460199784785],
];

/// ICRS frame-bias rotation applied before the galactic orientation.
const FRAME_BIAS: [[f64; 3]; 3] = [
    [0.999925679496, 0.011181483239, 0.004859003772],
    [-0.011181483221, 0.999937484893, -0.000027170294],
    [-0.004859003815, -0.000027162595, 0.999988194602],
];

#[derive(Debug, Error, PartialEq)]
pub enum AstrometryError {
    /// Without a positive parallax there is no distance, so proper motion
    /// cannot be scaled into a tangential velocity.
    #[error("parallax must be positive to derive a velocity, got {parallax_mas} mas")]
    NonPositiveParallax { parallax_mas: f64 },
    /// No radial velocity on the record and none supplied by a patch source.
    #[error("star {id} has no radial velocity after consulting patch sources")]
    MissingRadialVelocity { id: u64 },
}

/// Per-star observational quantities as shipped by astrometric catalogs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Observables {
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub parallax_mas: f64,
    pub pm_ra_mas_yr: f64,
    pub pm_dec_mas_yr: f64,
    /// Line-of-sight velocity in km/s; `None` (or a non-finite value) means
    /// the survey had no measurement.
    pub rv_km_s: Option<f64>,
}

/// Ordered radial-velocity patch sources keyed by catalog id, filled from
/// cross-match surveys. Sources are consulted in insertion order and the
/// first one holding the star wins.
#[derive(Clone, Debug, Default)]
pub struct RvPatch {
    sources: Vec<HashMap<u64, f64>>,
}

impl RvPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: HashMap<u64, f64>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn lookup(&self, id: u64) -> Option<f64> {
        self.sources.iter().find_map(|source| source.get(&id).copied())
    }
}

/// Derive the (U, V, W) space velocity in km/s for star `id`.
///
/// Tangential components are proper motion over parallax scaled by
/// [`PM_OVER_PARALLAX_TO_KM_S`]; a direction matrix built from RA/Dec maps
/// (tangential-RA, tangential-Dec, radial) onto equatorial axes, and the two
/// fixed rotations carry the result into the galactic frame.
///
/// A missing or non-finite radial velocity is looked up in `patch` before
/// giving up; zero is never silently substituted.
pub fn space_velocity(
    id: u64,
    obs: &Observables,
    patch: Option<&RvPatch>,
) -> Result<[f64; 3], AstrometryError> {
    if !(obs.parallax_mas > 0.0) {
        return Err(AstrometryError::NonPositiveParallax {
            parallax_mas: obs.parallax_mas,
        });
    }

    let rv = obs
        .rv_km_s
        .filter(|rv| rv.is_finite())
        .or_else(|| patch.and_then(|p| p.lookup(id)))
        .ok_or(AstrometryError::MissingRadialVelocity { id })?;

    let (sin_a, cos_a) = obs.ra_deg.to_radians().sin_cos();
    let (sin_d, cos_d) = obs.dec_deg.to_radians().sin_cos();

    // Columns: tangential-RA, tangential-Dec, radial directions on
    // equatorial axes.
    let direction = [
        [-sin_a, -sin_d * cos_a, cos_d * cos_a],
        [cos_a, -sin_d * sin_a, cos_d * sin_a],
        [0.0, cos_d, sin_d],
    ];

    let velocity = [
        PM_OVER_PARALLAX_TO_KM_S * obs.pm_ra_mas_yr / obs.parallax_mas,
        PM_OVER_PARALLAX_TO_KM_S * obs.pm_dec_mas_yr / obs.parallax_mas,
        rv,
    ];

    let orientation = mat_mul(GALACTIC_ORIENTATION, FRAME_BIAS);
    Ok(mat_vec(mat_mul(orientation, direction), velocity))
}

fn mat_mul(a: [[f64; 3]; 3], b: [[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in a.iter().enumerate() {
        for j in 0..3 {
            out[i][j] = row[0] * b[0][j] + row[1] * b[1][j] + row[2] * b[2][j];
        }
    }
    out
}

fn mat_vec(m: [[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}
