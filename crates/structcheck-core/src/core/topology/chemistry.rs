use serde::Serialize;

/// Hydrogen-bonding capability and formal charge sign of a heavy atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct AtomChemistry {
    pub donor: bool,
    pub acceptor: bool,
    pub charge: i8,
}

impl AtomChemistry {
    pub const APOLAR: Self = Self {
        donor: false,
        acceptor: false,
        charge: 0,
    };
    pub const DONOR: Self = Self {
        donor: true,
        acceptor: false,
        charge: 0,
    };
    pub const ACCEPTOR: Self = Self {
        donor: false,
        acceptor: true,
        charge: 0,
    };
    pub const BOTH: Self = Self {
        donor: true,
        acceptor: true,
        charge: 0,
    };

    pub fn charged(charge: i8) -> Self {
        Self {
            charge,
            ..Self::APOLAR
        }
    }

    /// Element-only fallback for residues without a template.
    pub fn from_element(element: &str) -> Self {
        match element {
            "O" => Self::ACCEPTOR,
            "N" => Self::BOTH,
            _ => Self::APOLAR,
        }
    }

    #[inline]
    pub fn is_apolar(&self) -> bool {
        !self.donor && !self.acceptor && self.charge == 0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.charge > 0
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.charge < 0
    }

    #[inline]
    pub fn is_donor_only(&self) -> bool {
        self.donor && !self.acceptor
    }

    #[inline]
    pub fn is_acceptor_only(&self) -> bool {
        self.acceptor && !self.donor
    }
}
