//! Kindling optimizer.
//!
//! Rewrites a [`Program`] into templates that each fit one plot line:
//!
//! ```text
//! Program ─▶ per unit: greedy fit ─▶ scope promotion ─▶ Vec<Template>
//! ```
//!
//! Every template weighs at most the capacity. Splits only ever add
//! linkage calls into hidden continuation functions named `<unit>~<n>`;
//! [`reassemble`] inlines them again.

mod error;
mod fitter;
mod promote;
mod reassemble;
mod tier;

use kindling_ir::{Program, Template};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use error::{OptimizeError, OptimizeResult};
pub use kindling_ir::weight::instruction as weight;
pub use promote::ScopePromotion;
pub use reassemble::reassemble;
pub use tier::PlotTier;

use fitter::Fitter;

/// Optimizer output: every template in delivery order, plus the scope
/// changes made to keep split bodies correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimized {
    pub templates: Vec<Template>,
    pub promotions: Vec<ScopePromotion>,
}

/// Pack `program` into templates of at most `capacity` slots.
///
/// Units are processed in order; each unit's templates are contiguous in the
/// output and start with the unit's own header.
pub fn optimize(program: &Program, capacity: usize) -> OptimizeResult<Optimized> {
    let mut templates = Vec::new();
    let mut bounds = Vec::with_capacity(program.units.len());
    for unit in &program.units {
        let name = unit.header.unit_name();
        let fitted = Fitter::new(name.clone(), capacity).fit(unit.header.clone(), unit.body.clone())?;
        debug!(unit = %name, templates = fitted.len(), "fitted unit");
        let start = templates.len();
        templates.extend(fitted);
        bounds.push((name, start..templates.len()));
    }

    let mut taken = promote::game_names(&templates);
    let mut promotions = Vec::new();
    for (name, range) in bounds {
        promotions.extend(promote::promote_unit(&name, &mut templates[range], &mut taken));
    }

    info!(
        units = program.units.len(),
        templates = templates.len(),
        promotions = promotions.len(),
        capacity,
        "optimized program"
    );
    Ok(Optimized {
        templates,
        promotions,
    })
}

/// [`optimize`] with the capacity of `tier`.
pub fn optimize_for(program: &Program, tier: PlotTier) -> OptimizeResult<Optimized> {
    optimize(program, tier.capacity())
}
