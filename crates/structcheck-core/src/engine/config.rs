use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

fn ensure_positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            parameter,
            reason: format!("must be a positive finite number, got {value}"),
        })
    }
}

/// Per-category distance thresholds for clash classification, in Angstroms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClashThresholds {
    /// Pairs farther apart than this are never examined.
    pub cutoff: f64,
    /// Any non-excluded pair closer than this is a severe clash.
    pub severe: f64,
    pub apolar: f64,
    /// Donor-donor and acceptor-acceptor contacts.
    pub polar: f64,
    /// Like-charged contacts.
    pub ionic: f64,
}

impl Default for ClashThresholds {
    fn default() -> Self {
        Self {
            cutoff: 3.5,
            severe: 2.0,
            apolar: 2.9,
            polar: 3.1,
            ionic: 3.5,
        }
    }
}

impl ClashThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("clashes.cutoff", self.cutoff)?;
        ensure_positive("clashes.severe", self.severe)?;
        ensure_positive("clashes.apolar", self.apolar)?;
        ensure_positive("clashes.polar", self.polar)?;
        ensure_positive("clashes.ionic", self.ionic)?;
        for (parameter, value) in [
            ("clashes.apolar", self.apolar),
            ("clashes.polar", self.polar),
            ("clashes.ionic", self.ionic),
        ] {
            if value < self.severe || value > self.cutoff {
                return Err(ConfigError::InvalidParameter {
                    parameter,
                    reason: format!(
                        "{value} must lie between the severe threshold ({}) and the cutoff ({})",
                        self.severe, self.cutoff
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Geometric criteria for judging Asn/Gln amide orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmideCriteria {
    /// Maximum heavy-atom distance for a hydrogen-bond partner.
    pub contact_distance: f64,
    /// Minimum `carbon - amide atom - partner` angle, in degrees.
    pub min_angle: f64,
}

impl Default for AmideCriteria {
    fn default() -> Self {
        Self {
            contact_distance: 3.5,
            min_angle: 90.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CheckConfig {
    pub clashes: ClashThresholds,
    pub amide: AmideCriteria,
    pub disulfide_cutoff: f64,
    /// Fraction of atoms above which a molecule type dominates a chain.
    pub chain_type_threshold: f64,
    pub peptide_bond_max: f64,
    /// Allowed excess of summed altloc occupancies above 1.
    pub altloc_occupancy_tolerance: f64,
    /// Pairs separated by at most this many covalent bonds are never clashes. Pairs one
    /// bond further apart only clash below the severe threshold.
    pub bond_exclusion_depth: usize,
    pub include_water_clashes: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            clashes: ClashThresholds::default(),
            amide: AmideCriteria::default(),
            disulfide_cutoff: 2.5,
            chain_type_threshold: 0.5,
            peptide_bond_max: 2.0,
            altloc_occupancy_tolerance: 0.02,
            bond_exclusion_depth: 2,
            include_water_clashes: false,
        }
    }
}

impl CheckConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clashes.validate()?;
        ensure_positive("amide.contact-distance", self.amide.contact_distance)?;
        if !(0.0..=180.0).contains(&self.amide.min_angle) {
            return Err(ConfigError::InvalidParameter {
                parameter: "amide.min-angle",
                reason: format!("{} is not an angle in [0, 180]", self.amide.min_angle),
            });
        }
        ensure_positive("disulfide-cutoff", self.disulfide_cutoff)?;
        ensure_positive("peptide-bond-max", self.peptide_bond_max)?;
        if !(self.chain_type_threshold > 0.0 && self.chain_type_threshold < 1.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "chain-type-threshold",
                reason: format!("{} is not a fraction in (0, 1)", self.chain_type_threshold),
            });
        }
        if !(self.altloc_occupancy_tolerance >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "altloc-occupancy-tolerance",
                reason: "must not be negative".to_string(),
            });
        }
        if self.bond_exclusion_depth == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "bond-exclusion-depth",
                reason: "must exclude at least directly bonded pairs".to_string(),
            });
        }
        Ok(())
    }

    /// Largest radius any check queries the spatial index with.
    pub fn search_radius(&self) -> f64 {
        self.clashes
            .cutoff
            .max(self.disulfide_cutoff)
            .max(self.amide.contact_distance)
    }
}

#[derive(Default)]
pub struct CheckConfigBuilder {
    config: CheckConfig,
}

impl CheckConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clash_thresholds(mut self, thresholds: ClashThresholds) -> Self {
        self.config.clashes = thresholds;
        self
    }
    pub fn amide_criteria(mut self, criteria: AmideCriteria) -> Self {
        self.config.amide = criteria;
        self
    }
    pub fn disulfide_cutoff(mut self, cutoff: f64) -> Self {
        self.config.disulfide_cutoff = cutoff;
        self
    }
    pub fn chain_type_threshold(mut self, threshold: f64) -> Self {
        self.config.chain_type_threshold = threshold;
        self
    }
    pub fn peptide_bond_max(mut self, distance: f64) -> Self {
        self.config.peptide_bond_max = distance;
        self
    }
    pub fn altloc_occupancy_tolerance(mut self, tolerance: f64) -> Self {
        self.config.altloc_occupancy_tolerance = tolerance;
        self
    }
    pub fn bond_exclusion_depth(mut self, depth: usize) -> Self {
        self.config.bond_exclusion_depth = depth;
        self
    }
    pub fn include_water_clashes(mut self, include: bool) -> Self {
        self.config.include_water_clashes = include;
        self
    }

    pub fn build(self) -> Result<CheckConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Rule for choosing which alternate-location copy survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AltlocChoice {
    /// Highest mean occupancy per residue; ties go to the lexicographically first label and
    /// are reported.
    #[default]
    HighestOccupancy,
    /// Keep this label wherever a residue carries it.
    Label(char),
}

/// Selects heteroatom residues (ions and ligands) for removal by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RemovalSelector {
    None,
    #[default]
    All,
    Names(BTreeSet<String>),
}

impl RemovalSelector {
    pub fn matches(&self, residue_name: &str) -> bool {
        match self {
            RemovalSelector::None => false,
            RemovalSelector::All => true,
            RemovalSelector::Names(names) => names.contains(residue_name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinimizationParams {
    /// Neighbor-list radius for repulsive contacts.
    pub cutoff: f64,
    pub max_iterations: usize,
    /// Convergence threshold on the largest gradient component.
    pub tolerance: f64,
    /// Initial (and maximum) per-iteration displacement, in Angstroms.
    pub step_size: f64,
    pub restraint_weight: f64,
    pub bond_weight: f64,
    pub repulsion_weight: f64,
    /// Extra separation sought beyond the clash threshold of a pair.
    pub clash_margin: f64,
}

impl Default for MinimizationParams {
    fn default() -> Self {
        Self {
            cutoff: 4.0,
            max_iterations: 500,
            tolerance: 1e-3,
            step_size: 0.05,
            restraint_weight: 1.0,
            bond_weight: 100.0,
            repulsion_weight: 10.0,
            clash_margin: 0.1,
        }
    }
}

impl MinimizationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("minimization.cutoff", self.cutoff)?;
        ensure_positive("minimization.tolerance", self.tolerance)?;
        ensure_positive("minimization.step-size", self.step_size)?;
        ensure_positive("minimization.bond-weight", self.bond_weight)?;
        ensure_positive("minimization.repulsion-weight", self.repulsion_weight)?;
        if !(self.restraint_weight >= 0.0) || !(self.clash_margin >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "minimization",
                reason: "restraint weight and clash margin must not be negative".to_string(),
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "minimization.max-iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollaboratorConfig {
    pub modeling_timeout: Duration,
    pub minimization_timeout: Duration,
    /// Opaque token handed to the homology modeling collaborator.
    pub license: Option<String>,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            modeling_timeout: Duration::from_secs(300),
            minimization_timeout: Duration::from_secs(120),
            license: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairConfig {
    /// 1-based model serial that proceeds through the pipeline.
    pub model: usize,
    /// Chains to keep; `None` keeps all.
    pub chains: Option<Vec<String>>,
    pub altloc: AltlocChoice,
    pub accept_disulfides: bool,
    pub remove_hetero: RemovalSelector,
    pub remove_hydrogens: bool,
    pub remove_water: bool,
    pub fix_amides: bool,
    pub fix_chirality: bool,
    pub complete_sidechains: bool,
    pub complete_backbone: bool,
    pub relieve_clashes: bool,
    pub renumber: bool,
    pub minimization: MinimizationParams,
    pub collaborators: CollaboratorConfig,
    /// Upper bound on passes over the geometric fix stages.
    pub max_cycles: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            model: 1,
            chains: None,
            altloc: AltlocChoice::default(),
            accept_disulfides: true,
            remove_hetero: RemovalSelector::default(),
            remove_hydrogens: true,
            remove_water: true,
            fix_amides: true,
            fix_chirality: true,
            complete_sidechains: true,
            complete_backbone: true,
            relieve_clashes: true,
            renumber: true,
            minimization: MinimizationParams::default(),
            collaborators: CollaboratorConfig::default(),
            max_cycles: 1,
        }
    }
}

impl RepairConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "model",
                reason: "model serials are 1-based".to_string(),
            });
        }
        if let Some(chains) = &self.chains {
            if chains.is_empty() {
                return Err(ConfigError::InvalidParameter {
                    parameter: "chains",
                    reason: "an explicit chain selection must name at least one chain".to_string(),
                });
            }
        }
        if self.max_cycles == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "max-cycles",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.collaborators.modeling_timeout.is_zero() || self.collaborators.minimization_timeout.is_zero() {
            return Err(ConfigError::InvalidParameter {
                parameter: "collaborators",
                reason: "timeouts must be non-zero".to_string(),
            });
        }
        self.minimization.validate()
    }
}

#[derive(Default)]
pub struct RepairConfigBuilder {
    config: RepairConfig,
}

impl RepairConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, index: usize) -> Self {
        self.config.model = index;
        self
    }
    pub fn chains(mut self, chains: Vec<String>) -> Self {
        self.config.chains = Some(chains);
        self
    }
    pub fn altloc(mut self, choice: AltlocChoice) -> Self {
        self.config.altloc = choice;
        self
    }
    pub fn accept_disulfides(mut self, accept: bool) -> Self {
        self.config.accept_disulfides = accept;
        self
    }
    pub fn remove_hetero(mut self, selector: RemovalSelector) -> Self {
        self.config.remove_hetero = selector;
        self
    }
    pub fn remove_hydrogens(mut self, remove: bool) -> Self {
        self.config.remove_hydrogens = remove;
        self
    }
    pub fn remove_water(mut self, remove: bool) -> Self {
        self.config.remove_water = remove;
        self
    }
    pub fn fix_amides(mut self, fix: bool) -> Self {
        self.config.fix_amides = fix;
        self
    }
    pub fn fix_chirality(mut self, fix: bool) -> Self {
        self.config.fix_chirality = fix;
        self
    }
    pub fn complete_sidechains(mut self, complete: bool) -> Self {
        self.config.complete_sidechains = complete;
        self
    }
    pub fn complete_backbone(mut self, complete: bool) -> Self {
        self.config.complete_backbone = complete;
        self
    }
    pub fn relieve_clashes(mut self, relieve: bool) -> Self {
        self.config.relieve_clashes = relieve;
        self
    }
    pub fn renumber(mut self, renumber: bool) -> Self {
        self.config.renumber = renumber;
        self
    }
    pub fn minimization(mut self, params: MinimizationParams) -> Self {
        self.config.minimization = params;
        self
    }
    pub fn collaborators(mut self, config: CollaboratorConfig) -> Self {
        self.config.collaborators = config;
        self
    }
    pub fn max_cycles(mut self, cycles: usize) -> Self {
        self.config.max_cycles = cycles;
        self
    }

    pub fn build(self) -> Result<RepairConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Check thresholds and repair settings for a full check/repair run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineConfig {
    pub checks: CheckConfig,
    pub repair: RepairConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.checks.validate()?;
        self.repair.validate()
    }
}
