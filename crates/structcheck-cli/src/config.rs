use crate::cli::{CommonArgs, RepairArgs};
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use structcheck::engine::config as core_config;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialClashThresholds {
    cutoff: Option<f64>,
    severe: Option<f64>,
    apolar: Option<f64>,
    polar: Option<f64>,
    ionic: Option<f64>,
}

impl PartialClashThresholds {
    fn merge(self) -> core_config::ClashThresholds {
        let defaults = core_config::ClashThresholds::default();
        core_config::ClashThresholds {
            cutoff: self.cutoff.unwrap_or(defaults.cutoff),
            severe: self.severe.unwrap_or(defaults.severe),
            apolar: self.apolar.unwrap_or(defaults.apolar),
            polar: self.polar.unwrap_or(defaults.polar),
            ionic: self.ionic.unwrap_or(defaults.ionic),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialAmideCriteria {
    contact_distance: Option<f64>,
    min_angle: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialCheckConfig {
    clashes: Option<PartialClashThresholds>,
    amide: Option<PartialAmideCriteria>,
    disulfide_cutoff: Option<f64>,
    chain_type_threshold: Option<f64>,
    peptide_bond_max: Option<f64>,
    altloc_occupancy_tolerance: Option<f64>,
    bond_exclusion_depth: Option<usize>,
    include_water_clashes: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialMinimizationParams {
    cutoff: Option<f64>,
    max_iterations: Option<usize>,
    tolerance: Option<f64>,
    step_size: Option<f64>,
    restraint_weight: Option<f64>,
    bond_weight: Option<f64>,
    repulsion_weight: Option<f64>,
    clash_margin: Option<f64>,
}

impl PartialMinimizationParams {
    fn merge(self) -> core_config::MinimizationParams {
        let defaults = core_config::MinimizationParams::default();
        core_config::MinimizationParams {
            cutoff: self.cutoff.unwrap_or(defaults.cutoff),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            step_size: self.step_size.unwrap_or(defaults.step_size),
            restraint_weight: self.restraint_weight.unwrap_or(defaults.restraint_weight),
            bond_weight: self.bond_weight.unwrap_or(defaults.bond_weight),
            repulsion_weight: self.repulsion_weight.unwrap_or(defaults.repulsion_weight),
            clash_margin: self.clash_margin.unwrap_or(defaults.clash_margin),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialRepairConfig {
    model: Option<usize>,
    chains: Option<Vec<String>>,
    altloc: Option<String>,
    accept_disulfides: Option<bool>,
    remove_ligands: Option<String>,
    remove_hydrogens: Option<bool>,
    remove_water: Option<bool>,
    fix_amides: Option<bool>,
    fix_chirality: Option<bool>,
    complete_sidechains: Option<bool>,
    complete_backbone: Option<bool>,
    relieve_clashes: Option<bool>,
    renumber: Option<bool>,
    max_cycles: Option<usize>,
    minimization: Option<PartialMinimizationParams>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialCollaboratorConfig {
    modeling_timeout_secs: Option<f64>,
    minimization_timeout_secs: Option<f64>,
    license: Option<String>,
}

/// Configuration as read from the TOML file and `-S` overrides, before defaults are applied.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialConfig {
    checks: Option<PartialCheckConfig>,
    repair: Option<PartialRepairConfig>,
    collaborators: Option<PartialCollaboratorConfig>,
}

impl PartialConfig {
    /// Reads the optional config file and applies `KEY=VALUE` overrides on top of it.
    ///
    /// Keys are dotted paths into the file layout (`checks.clashes.apolar`). Values are read
    /// as TOML literals, falling back to plain strings.
    pub fn load(path: Option<&Path>, set_values: &[String]) -> Result<Self> {
        let mut table = match path {
            Some(path) => {
                debug!("Loading configuration from file: {:?}", path);
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<toml::Table>(&content).map_err(|e| CliError::FileParsing {
                    path: path.to_path_buf(),
                    source: e.into(),
                })?
            }
            None => toml::Table::new(),
        };
        for kv_pair in set_values {
            apply_set_value(&mut table, kv_pair)?;
        }
        toml::Value::Table(table)
            .try_into()
            .map_err(|e| CliError::Config(format!("Invalid configuration: {e}")))
    }

    pub fn check_config(&mut self) -> Result<core_config::CheckConfig> {
        let partial = self.checks.take().unwrap_or_default();
        let defaults = core_config::CheckConfig::default();
        let amide = partial.amide.unwrap_or_default();
        core_config::CheckConfigBuilder::new()
            .clash_thresholds(partial.clashes.unwrap_or_default().merge())
            .amide_criteria(core_config::AmideCriteria {
                contact_distance: amide.contact_distance.unwrap_or(defaults.amide.contact_distance),
                min_angle: amide.min_angle.unwrap_or(defaults.amide.min_angle),
            })
            .disulfide_cutoff(partial.disulfide_cutoff.unwrap_or(defaults.disulfide_cutoff))
            .chain_type_threshold(partial.chain_type_threshold.unwrap_or(defaults.chain_type_threshold))
            .peptide_bond_max(partial.peptide_bond_max.unwrap_or(defaults.peptide_bond_max))
            .altloc_occupancy_tolerance(
                partial
                    .altloc_occupancy_tolerance
                    .unwrap_or(defaults.altloc_occupancy_tolerance),
            )
            .bond_exclusion_depth(partial.bond_exclusion_depth.unwrap_or(defaults.bond_exclusion_depth))
            .include_water_clashes(partial.include_water_clashes.unwrap_or(defaults.include_water_clashes))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Builds the full pipeline configuration; command-line flags win over file values.
    pub fn merge_with_repair_args(mut self, args: &RepairArgs) -> Result<core_config::PipelineConfig> {
        let checks = self.check_config()?;
        let repair = self.repair.take().unwrap_or_default();
        let collaborators = self.collaborators.take().unwrap_or_default();
        let defaults = core_config::RepairConfig::default();

        let mut builder = core_config::RepairConfigBuilder::new()
            .model(args.model.or(repair.model).unwrap_or(defaults.model))
            .accept_disulfides(repair.accept_disulfides.unwrap_or(defaults.accept_disulfides))
            .fix_amides(repair.fix_amides.unwrap_or(defaults.fix_amides))
            .fix_chirality(repair.fix_chirality.unwrap_or(defaults.fix_chirality))
            .complete_sidechains(repair.complete_sidechains.unwrap_or(defaults.complete_sidechains))
            .complete_backbone(repair.complete_backbone.unwrap_or(defaults.complete_backbone))
            .max_cycles(args.max_cycles.or(repair.max_cycles).unwrap_or(defaults.max_cycles))
            .minimization(repair.minimization.unwrap_or_default().merge())
            .collaborators(Self::merge_collaborators(collaborators)?);

        builder = Self::merge_flag(builder, args.keep_water, repair.remove_water, |b, v| b.remove_water(v));
        builder = Self::merge_flag(builder, args.keep_hydrogens, repair.remove_hydrogens, |b, v| {
            b.remove_hydrogens(v)
        });
        builder = Self::merge_flag(builder, args.no_minimize, repair.relieve_clashes, |b, v| {
            b.relieve_clashes(v)
        });
        builder = Self::merge_flag(builder, args.no_renumber, repair.renumber, |b, v| b.renumber(v));

        if let Some(chains) = args.chains.clone().or(repair.chains) {
            builder = builder.chains(chains);
        }
        if let Some(altloc) = args.altloc.as_deref().or(repair.altloc.as_deref()) {
            builder = builder.altloc(parse_altloc(altloc)?);
        }
        if let Some(selector) = args.remove_ligands.as_deref().or(repair.remove_ligands.as_deref()) {
            builder = builder.remove_hetero(parse_removal_selector(selector)?);
        }

        let repair = builder.build().map_err(|e| CliError::Config(e.to_string()))?;
        Ok(core_config::PipelineConfig { checks, repair })
    }

    /// A `--keep-*`/`--no-*` flag switches the stage off; otherwise the file decides.
    fn merge_flag(
        builder: core_config::RepairConfigBuilder,
        cli_disable: bool,
        file_val: Option<bool>,
        set: impl FnOnce(core_config::RepairConfigBuilder, bool) -> core_config::RepairConfigBuilder,
    ) -> core_config::RepairConfigBuilder {
        if cli_disable {
            set(builder, false)
        } else if let Some(val) = file_val {
            set(builder, val)
        } else {
            builder
        }
    }

    fn merge_collaborators(partial: PartialCollaboratorConfig) -> Result<core_config::CollaboratorConfig> {
        let defaults = core_config::CollaboratorConfig::default();
        let seconds = |key: &str, value: Option<f64>, default: Duration| -> Result<Duration> {
            match value {
                None => Ok(default),
                Some(secs) => Duration::try_from_secs_f64(secs)
                    .map_err(|e| CliError::Config(format!("Invalid duration for {key}: {e}"))),
            }
        };
        Ok(core_config::CollaboratorConfig {
            modeling_timeout: seconds(
                "collaborators.modeling-timeout-secs",
                partial.modeling_timeout_secs,
                defaults.modeling_timeout,
            )?,
            minimization_timeout: seconds(
                "collaborators.minimization-timeout-secs",
                partial.minimization_timeout_secs,
                defaults.minimization_timeout,
            )?,
            license: partial.license.or(defaults.license),
        })
    }
}

/// Loads the configuration for the `check` subcommand.
pub fn check_config(args: &CommonArgs) -> Result<core_config::CheckConfig> {
    let mut partial = PartialConfig::load(args.config.as_deref(), &args.set_values)?;
    partial.check_config()
}

fn apply_set_value(table: &mut toml::Table, kv_pair: &str) -> Result<()> {
    let Some((key, value_str)) = kv_pair.split_once('=') else {
        return Err(CliError::Config(format!(
            "Invalid --set format: '{}'. Expected KEY=VALUE.",
            kv_pair
        )));
    };
    let path: Vec<&str> = key.trim().split('.').collect();
    if path.iter().any(|segment| segment.is_empty()) {
        return Err(CliError::Config(format!("Invalid configuration key for --set: '{key}'")));
    }
    let value = parse_value(value_str.trim());

    let (last, parents) = path.split_last().ok_or_else(|| CliError::Config("Empty --set key".to_string()))?;
    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        current = match entry {
            toml::Value::Table(inner) => inner,
            _ => {
                return Err(CliError::Config(format!(
                    "Configuration key '{segment}' in '{key}' is not a section"
                )));
            }
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn parse_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

fn parse_altloc(raw: &str) -> Result<core_config::AltlocChoice> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        _ if raw.eq_ignore_ascii_case("occupancy") => Ok(core_config::AltlocChoice::HighestOccupancy),
        (Some(label), None) if label.is_ascii_alphanumeric() => Ok(core_config::AltlocChoice::Label(label)),
        _ => Err(CliError::Argument(format!(
            "Invalid altloc choice '{raw}'. Expected a single label or 'occupancy'."
        ))),
    }
}

fn parse_removal_selector(raw: &str) -> Result<core_config::RemovalSelector> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "all" => Ok(core_config::RemovalSelector::All),
        "none" => Ok(core_config::RemovalSelector::None),
        _ => {
            let names: BTreeSet<String> = raw
                .split(',')
                .map(|name| name.trim().to_ascii_uppercase())
                .filter(|name| !name.is_empty())
                .collect();
            if names.is_empty() {
                return Err(CliError::Argument(format!("Invalid removal selector '{raw}'")));
            }
            Ok(core_config::RemovalSelector::Names(names))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn repair_args(extra: &[&str]) -> RepairArgs {
        let mut args = vec!["structcheck", "repair", "-i", "in.pdb", "-o", "out.pdb"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Repair(args) => args,
            Commands::Check(_) => panic!("Expected 'repair' subcommand"),
        }
    }

    fn pipeline(args: &RepairArgs) -> Result<core_config::PipelineConfig> {
        PartialConfig::load(args.common.config.as_deref(), &args.common.set_values)?.merge_with_repair_args(args)
    }

    #[test]
    fn no_config_file_gives_defaults() {
        let config = pipeline(&repair_args(&[])).unwrap();
        assert_eq!(config, core_config::PipelineConfig::default());
    }

    #[test]
    fn file_values_are_merged_over_defaults() {
        let path = write_config_file(
            "file_values.toml",
            r#"
            [checks]
            disulfide-cutoff = 2.4

            [checks.clashes]
            apolar = 2.8

            [repair]
            chains = ["A", "B"]
            remove-ligands = "SO4, gol"
            max-cycles = 3

            [repair.minimization]
            max-iterations = 50

            [collaborators]
            modeling-timeout-secs = 12.5
            license = "token"
            "#,
        );
        let config = pipeline(&repair_args(&["-c", path.to_str().unwrap()])).unwrap();
        assert_eq!(config.checks.disulfide_cutoff, 2.4);
        assert_eq!(config.checks.clashes.apolar, 2.8);
        assert_eq!(config.checks.clashes.polar, 3.1);
        assert_eq!(config.repair.chains, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(
            config.repair.remove_hetero,
            core_config::RemovalSelector::Names(["GOL".to_string(), "SO4".to_string()].into())
        );
        assert_eq!(config.repair.max_cycles, 3);
        assert_eq!(config.repair.minimization.max_iterations, 50);
        assert_eq!(config.repair.collaborators.modeling_timeout, Duration::from_millis(12_500));
        assert_eq!(config.repair.collaborators.license.as_deref(), Some("token"));
    }

    #[test]
    fn cli_args_override_file_values() {
        let path = write_config_file(
            "override.toml",
            r#"
            [repair]
            chains = ["A"]
            remove-water = true
            renumber = true
            altloc = "occupancy"
            "#,
        );
        let args = repair_args(&[
            "-c",
            path.to_str().unwrap(),
            "--chains",
            "B,C",
            "--keep-water",
            "--no-renumber",
            "--altloc",
            "B",
            "--remove-ligands",
            "none",
        ]);
        let config = pipeline(&args).unwrap();
        assert_eq!(config.repair.chains, Some(vec!["B".to_string(), "C".to_string()]));
        assert!(!config.repair.remove_water);
        assert!(!config.repair.renumber);
        assert_eq!(config.repair.altloc, core_config::AltlocChoice::Label('B'));
        assert_eq!(config.repair.remove_hetero, core_config::RemovalSelector::None);
    }

    #[test]
    fn set_values_override_file_values() {
        let path = write_config_file(
            "set.toml",
            r#"
            [checks.clashes]
            apolar = 2.7
            "#,
        );
        let args = repair_args(&[
            "-c",
            path.to_str().unwrap(),
            "-S",
            "checks.clashes.apolar=2.95",
            "-S",
            "repair.minimization.step-size=0.02",
            "-S",
            "repair.altloc=A",
        ]);
        let config = pipeline(&args).unwrap();
        assert_eq!(config.checks.clashes.apolar, 2.95);
        assert_eq!(config.repair.minimization.step_size, 0.02);
        assert_eq!(config.repair.altloc, core_config::AltlocChoice::Label('A'));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let args = repair_args(&["-S", "checks.clashes.sticky=1.0"]);
        assert!(matches!(pipeline(&args), Err(CliError::Config(_))));

        let path = write_config_file("unknown.toml", "[sampling]\nrotamers = 3\n");
        let args = repair_args(&["-c", path.to_str().unwrap()]);
        assert!(matches!(pipeline(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn invalid_thresholds_surface_as_config_errors() {
        let args = repair_args(&["-S", "checks.clashes.severe=3.0", "-S", "checks.clashes.apolar=2.5"]);
        let result = pipeline(&args);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("clashes.apolar")));
    }

    #[test]
    fn malformed_set_value_is_rejected() {
        let args = repair_args(&["-S", "checks.disulfide-cutoff"]);
        assert!(matches!(pipeline(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn check_config_reads_only_the_checks_section() {
        let path = write_config_file("check_only.toml", "[checks]\ninclude-water-clashes = true\n");
        let cli = Cli::parse_from(["structcheck", "check", "-i", "in.pdb", "-c", path.to_str().unwrap()]);
        let Commands::Check(args) = cli.command else {
            panic!("Expected 'check' subcommand");
        };
        let config = check_config(&args.common).unwrap();
        assert!(config.include_water_clashes);
    }

    #[test]
    fn altloc_and_selector_parsing() {
        assert_eq!(parse_altloc("Occupancy").unwrap(), core_config::AltlocChoice::HighestOccupancy);
        assert_eq!(parse_altloc("C").unwrap(), core_config::AltlocChoice::Label('C'));
        assert!(matches!(parse_altloc("AB"), Err(CliError::Argument(_))));
        assert_eq!(parse_removal_selector("ALL").unwrap(), core_config::RemovalSelector::All);
        assert!(matches!(parse_removal_selector(" , "), Err(CliError::Argument(_))));
    }
}
