use super::checks::clashes::contact_distance;
use super::collaborators::{Cancellation, CollaboratorError, EnergyMinimizer, MinimizationOutcome, MinimizationProblem};
use crate::core::spatial::SpatialIndex;
use nalgebra::{Point3, Vector3};
use tracing::{debug, trace};

const NEIGHBOR_REBUILD_INTERVAL: usize = 10;
const MIN_STEP: f64 = 1e-6;
const MAX_STEP_GROWTH: f64 = 4.0;

/// Restrained steepest-descent minimizer used as the built-in clash-relief collaborator.
///
/// The energy has three terms: harmonic bonds around their reference lengths, harmonic
/// positional restraints to the input coordinates, and a soft quadratic repulsion between
/// non-excluded pairs closer than their contact distance plus a margin.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteepestDescentMinimizer;

struct Pair {
    i: usize,
    j: usize,
    limit: f64,
}

struct Evaluator<'a> {
    problem: &'a MinimizationProblem,
    reference: &'a [Point3<f64>],
}

impl<'a> Evaluator<'a> {
    fn neighbor_pairs(&self, positions: &[Point3<f64>]) -> Vec<Pair> {
        let params = &self.problem.params;
        let index = SpatialIndex::build(positions, params.cutoff);
        index
            .pairs_within(params.cutoff)
            .into_iter()
            .filter(|&(i, j, _)| {
                self.problem.active[i]
                    && self.problem.active[j]
                    && self.problem.exclusions[i].binary_search(&j).is_err()
            })
            .map(|(i, j, _)| Pair {
                i,
                j,
                limit: contact_distance(
                    &self.problem.chemistry[i],
                    &self.problem.chemistry[j],
                    &self.problem.thresholds,
                ) + params.clash_margin,
            })
            .collect()
    }

    fn energy(&self, positions: &[Point3<f64>], pairs: &[Pair]) -> f64 {
        self.evaluate(positions, pairs, None)
    }

    fn energy_and_gradient(&self, positions: &[Point3<f64>], pairs: &[Pair]) -> (f64, Vec<Vector3<f64>>) {
        let mut gradient = vec![Vector3::zeros(); positions.len()];
        let energy = self.evaluate(positions, pairs, Some(&mut gradient));
        (energy, gradient)
    }

    fn evaluate(&self, x: &[Point3<f64>], pairs: &[Pair], mut gradient: Option<&mut Vec<Vector3<f64>>>) -> f64 {
        let params = &self.problem.params;
        let mut energy = 0.0;

        for &(i, j, length) in &self.problem.bonds {
            let delta = x[i] - x[j];
            let d = delta.norm();
            let stretch = d - length;
            energy += params.bond_weight * stretch * stretch;
            if let Some(g) = gradient.as_deref_mut() {
                if d > 1e-12 {
                    let force = delta * (2.0 * params.bond_weight * stretch / d);
                    g[i] += force;
                    g[j] -= force;
                }
            }
        }

        for (i, (p, p0)) in x.iter().zip(self.reference).enumerate() {
            let offset = p - p0;
            energy += params.restraint_weight * offset.norm_squared();
            if let Some(g) = gradient.as_deref_mut() {
                g[i] += offset * (2.0 * params.restraint_weight);
            }
        }

        for pair in pairs {
            let delta = x[pair.i] - x[pair.j];
            let d = delta.norm();
            if d >= pair.limit {
                continue;
            }
            let overlap = pair.limit - d;
            energy += params.repulsion_weight * overlap * overlap;
            if let Some(g) = gradient.as_deref_mut() {
                if d > 1e-12 {
                    let force = delta * (-2.0 * params.repulsion_weight * overlap / d);
                    g[pair.i] += force;
                    g[pair.j] -= force;
                }
            }
        }
        energy
    }
}

impl EnergyMinimizer for SteepestDescentMinimizer {
    fn minimize(&self, problem: MinimizationProblem, cancel: &Cancellation) -> Result<MinimizationOutcome, CollaboratorError> {
        let n = problem.positions.len();
        if problem.chemistry.len() != n || problem.active.len() != n || problem.exclusions.len() != n {
            return Err(CollaboratorError::InvalidOutput(
                "per-atom tables disagree with the coordinate count".to_string(),
            ));
        }
        if problem.bonds.iter().any(|&(i, j, _)| i >= n || j >= n) {
            return Err(CollaboratorError::InvalidOutput("bond refers to a missing atom".to_string()));
        }
        if problem.positions.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(CollaboratorError::NonConvergence(
                "input coordinates are not finite".to_string(),
            ));
        }

        let reference = problem.positions.clone();
        let evaluator = Evaluator {
            problem: &problem,
            reference: &reference,
        };
        let params = problem.params;
        let mut x = problem.positions.clone();
        let mut pairs = evaluator.neighbor_pairs(&x);
        let (mut energy, mut gradient) = evaluator.energy_and_gradient(&x, &pairs);
        let initial_energy = energy;
        let mut step = params.step_size;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < params.max_iterations {
            if !energy.is_finite() {
                return Err(CollaboratorError::NonConvergence(format!(
                    "energy became {energy} after {iterations} iterations"
                )));
            }
            let max_gradient = gradient.iter().map(|g| g.norm()).fold(0.0, f64::max);
            if max_gradient < params.tolerance || step < MIN_STEP {
                converged = true;
                break;
            }
            if cancel.is_cancelled() {
                debug!(iterations, "Minimization cancelled.");
                break;
            }
            iterations += 1;

            let scale = step / max_gradient;
            let trial: Vec<Point3<f64>> = x.iter().zip(&gradient).map(|(p, g)| p - g * scale).collect();
            let trial_energy = evaluator.energy(&trial, &pairs);
            if trial_energy < energy {
                x = trial;
                step = (step * 1.2).min(params.step_size * MAX_STEP_GROWTH);
            } else {
                step *= 0.5;
            }

            if iterations % NEIGHBOR_REBUILD_INTERVAL == 0 {
                pairs = evaluator.neighbor_pairs(&x);
            }
            (energy, gradient) = evaluator.energy_and_gradient(&x, &pairs);
            trace!(iterations, energy, step, "Minimization step.");
        }

        debug!(iterations, initial_energy, final_energy = energy, converged, "Minimization finished.");
        Ok(MinimizationOutcome {
            coordinates: x,
            iterations,
            initial_energy,
            final_energy: energy,
            converged,
        })
    }
}
