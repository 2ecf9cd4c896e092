pub mod astrometry;
pub mod catalog;
pub mod data;
pub mod encounter;
pub mod kinematics;
pub mod naming;

use serde::{Deserialize, Serialize};

use crate::astrometry::{space_velocity, AstrometryError, Observables, RvPatch};
use crate::catalog::units::KM_S_TO_LY_PER_CENTURY;

/// How a record's motion is known: either the catalog ships a Cartesian
/// velocity directly, or it ships raw astrometric observables and the
/// velocity is derived on demand.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Velocity {
    /// Velocity in light-years per century, in the same frame as the position.
    Cartesian([f64; 3]),
    /// Raw observables, resolved through [`astrometry::space_velocity`].
    /// Positions for such records must be galactic Cartesian, since the
    /// derived velocity is.
    Astrometric(Observables),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StarRecord {
    pub id: u64,
    pub proper: Option<String>,
    /// Alternate designation, e.g. a Gliese or HIP number.
    pub designation: Option<String>,
    /// Position in 3D space (light-years, already unit-converted)
    pub pos: [f64; 3],
    pub velocity: Velocity,
}

impl StarRecord {
    /// Cartesian velocity in light-years per century, deriving it from
    /// astrometric observables when the catalog did not supply one.
    pub fn velocity_ly_cy(&self, patch: Option<&RvPatch>) -> Result<[f64; 3], AstrometryError> {
        match &self.velocity {
            Velocity::Cartesian(vel) => Ok(*vel),
            Velocity::Astrometric(obs) => {
                let uvw = space_velocity(self.id, obs, patch)?;
                Ok([
                    uvw[0] * KM_S_TO_LY_PER_CENTURY,
                    uvw[1] * KM_S_TO_LY_PER_CENTURY,
                    uvw[2] * KM_S_TO_LY_PER_CENTURY,
                ])
            }
        }
    }

    pub fn distance_to_point(&self, p: [f64; 3]) -> f64 {
        let dx = self.pos[0] - p[0];
        let dy = self.pos[1] - p[1];
        let dz = self.pos[2] - p[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}
