use phf::{Map, Set, phf_map, phf_set};

/// Residue names used for water molecules.
pub static WATER_NAMES: Set<&'static str> = phf_set! {
    "HOH", "WAT", "H2O", "DOD", "D2O", "TIP", "TIP3", "TIP4", "SOL", "SPC",
};

/// Recognized monatomic ions, keyed by residue name, with their formal charge.
pub static ION_CHARGES: Map<&'static str, i8> = phf_map! {
    "LI" => 1, "NA" => 1, "K" => 1, "RB" => 1, "CS" => 1, "AG" => 1, "CU1" => 1,
    "MG" => 2, "CA" => 2, "SR" => 2, "BA" => 2, "ZN" => 2, "MN" => 2, "FE2" => 2,
    "CO" => 2, "NI" => 2, "CU" => 2, "CD" => 2, "HG" => 2, "PB" => 2, "PT" => 2,
    "FE" => 3, "AL" => 3, "GD" => 3, "YB" => 3, "SM" => 3, "LA" => 3, "TB" => 3,
    "F" => -1, "CL" => -1, "BR" => -1, "IOD" => -1,
};

/// Common crystallization additives and buffer components.
pub static CRYSTALLIZATION_ADDITIVES: Set<&'static str> = phf_set! {
    "SO4", "PO4", "GOL", "EDO", "PEG", "PG4", "PGE", "1PE", "MPD", "ACT", "ACY",
    "FMT", "DMS", "TRS", "EPE", "MES", "CIT", "BME", "IMD", "NO3", "SCN", "AZI",
    "MLI", "TAR", "BU3", "P6G", "IPA", "EOH", "MOH", "NH4", "CO3", "BCT",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NucleicAcid {
    Dna,
    Rna,
}

static NUCLEOTIDES: Map<&'static str, NucleicAcid> = phf_map! {
    "DA" => NucleicAcid::Dna, "DC" => NucleicAcid::Dna, "DG" => NucleicAcid::Dna,
    "DT" => NucleicAcid::Dna, "DU" => NucleicAcid::Dna, "DI" => NucleicAcid::Dna,
    "A" => NucleicAcid::Rna, "C" => NucleicAcid::Rna, "G" => NucleicAcid::Rna,
    "U" => NucleicAcid::Rna, "I" => NucleicAcid::Rna,
};

/// Single-bond covalent radii in Angstroms, used for bond inference in residues without a
/// template.
static COVALENT_RADII: Map<&'static str, f64> = phf_map! {
    "H" => 0.31, "D" => 0.31, "C" => 0.76, "N" => 0.71, "O" => 0.66, "S" => 1.05,
    "P" => 1.07, "F" => 0.57, "CL" => 1.02, "BR" => 1.20, "I" => 1.39, "SE" => 1.20,
    "B" => 0.84, "SI" => 1.11, "FE" => 1.32, "ZN" => 1.22, "MG" => 1.41, "CU" => 1.32,
};

const DEFAULT_COVALENT_RADIUS: f64 = 1.50;

#[inline]
pub fn is_water(residue_name: &str) -> bool {
    WATER_NAMES.contains(residue_name)
}

#[inline]
pub fn is_ion(residue_name: &str) -> bool {
    ION_CHARGES.contains_key(residue_name)
}

#[inline]
pub fn ion_charge(residue_name: &str) -> Option<i8> {
    ION_CHARGES.get(residue_name).copied()
}

#[inline]
pub fn is_crystallization_additive(residue_name: &str) -> bool {
    CRYSTALLIZATION_ADDITIVES.contains(residue_name)
}

#[inline]
pub fn nucleic_acid_kind(residue_name: &str) -> Option<NucleicAcid> {
    NUCLEOTIDES.get(residue_name).copied()
}

pub fn covalent_radius(element: &str) -> f64 {
    COVALENT_RADII
        .get(element)
        .copied()
        .unwrap_or(DEFAULT_COVALENT_RADIUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waters_and_ions_are_recognized() {
        assert!(is_water("HOH"));
        assert!(!is_water("HOX"));
        assert!(is_ion("ZN"));
        assert_eq!(ion_charge("CL"), Some(-1));
        assert_eq!(ion_charge("SO4"), None);
    }

    #[test]
    fn nucleotides_split_by_sugar() {
        assert_eq!(nucleic_acid_kind("DT"), Some(NucleicAcid::Dna));
        assert_eq!(nucleic_acid_kind("U"), Some(NucleicAcid::Rna));
        assert_eq!(nucleic_acid_kind("ALA"), None);
    }

    #[test]
    fn unknown_elements_use_default_radius() {
        assert_eq!(covalent_radius("C"), 0.76);
        assert_eq!(covalent_radius("XX"), DEFAULT_COVALENT_RADIUS);
    }

    #[test]
    fn additives_include_sulfate() {
        assert!(is_crystallization_additive("SO4"));
        assert!(!is_crystallization_additive("HEM"));
    }
}
