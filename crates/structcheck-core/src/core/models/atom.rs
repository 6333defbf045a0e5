use nalgebra::Point3;

/// An atom of a deposited structure.
///
/// Atoms are owned by their [`Residue`](super::residue::Residue). Within a residue an atom
/// name is unique unless the copies carry distinct alternate-location labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "OG1").
    pub name: String,
    /// Upper-case element symbol (e.g., "C", "ZN").
    pub element: String,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Fractional occupancy in `[0, 1]`.
    pub occupancy: f64,
    /// Alternate-location label, if the site was modelled with alternatives.
    pub altloc: Option<char>,
    /// Isotropic temperature factor.
    pub b_factor: Option<f64>,
    /// Whether the atom came from a heteroatom (non-polymer) record.
    pub is_hetero: bool,
}

impl Atom {
    /// Creates a fully occupied polymer atom without alternate location.
    pub fn new(name: &str, element: &str, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element: element.to_ascii_uppercase(),
            position,
            occupancy: 1.0,
            altloc: None,
            b_factor: None,
            is_hetero: false,
        }
    }

    pub fn with_altloc(mut self, label: char, occupancy: f64) -> Self {
        self.altloc = Some(label);
        self.occupancy = occupancy;
        self
    }

    pub fn as_hetero(mut self) -> Self {
        self.is_hetero = true;
        self
    }

    #[inline]
    pub fn is_hydrogen(&self) -> bool {
        matches!(self.element.as_str(), "H" | "D")
    }

    #[inline]
    pub fn distance(&self, other: &Atom) -> f64 {
        nalgebra::distance(&self.position, &other.position)
    }

    /// Two atoms may coexist in one conformation unless they carry different labels.
    #[inline]
    pub fn shares_conformer_with(&self, other: &Atom) -> bool {
        match (self.altloc, other.altloc) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

/// Infers an element symbol from a PDB-style atom name.
///
/// Single-atom residues whose name equals the atom name (e.g., `ZN`/`ZN`, `CL`/`CL`) keep the
/// full two-letter symbol; otherwise leading digits are skipped and the first letter is used.
pub fn infer_element(atom_name: &str, residue_name: &str) -> String {
    let name = atom_name.trim().to_ascii_uppercase();
    let residue = residue_name.trim().to_ascii_uppercase();
    if name == residue && (1..=2).contains(&name.len()) {
        return name;
    }
    name.chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_string())
        .unwrap_or_else(|| "X".to_string())
}
