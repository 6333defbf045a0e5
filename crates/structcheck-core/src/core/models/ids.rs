use serde::{Serialize, Serializer};
use std::fmt;

/// Stable identity of a residue within one model: chain identifier, sequence number and
/// optional insertion code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueKey {
    pub chain: String,
    pub number: isize,
    pub insertion_code: Option<char>,
}

impl ResidueKey {
    pub fn new(chain: &str, number: isize, insertion_code: Option<char>) -> Self {
        Self {
            chain: chain.to_string(),
            number,
            insertion_code,
        }
    }
}

impl fmt::Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.number)?;
        if let Some(code) = self.insertion_code {
            write!(f, "{}", code)?;
        }
        Ok(())
    }
}

impl Serialize for ResidueKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identity of one atom copy: its residue, atom name and alternate-location label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AtomKey {
    pub residue: ResidueKey,
    pub residue_name: String,
    pub atom: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altloc: Option<char>,
}

impl fmt::Display for AtomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.residue, self.residue_name, self.atom)?;
        if let Some(label) = self.altloc {
            write!(f, ".{}", label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residue_key_display_includes_insertion_code() {
        assert_eq!(ResidueKey::new("A", 12, None).to_string(), "A:12");
        assert_eq!(ResidueKey::new("B", -3, Some('C')).to_string(), "B:-3C");
    }

    #[test]
    fn residue_keys_order_by_chain_then_number_then_code() {
        let mut keys = vec![
            ResidueKey::new("B", 1, None),
            ResidueKey::new("A", 10, Some('A')),
            ResidueKey::new("A", 10, None),
            ResidueKey::new("A", 2, None),
        ];
        keys.sort();
        let rendered: Vec<_> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["A:2", "A:10", "A:10A", "B:1"]);
    }

    #[test]
    fn residue_key_serializes_as_string() {
        let json = serde_json::to_string(&ResidueKey::new("A", 7, None)).unwrap();
        assert_eq!(json, "\"A:7\"");
    }

    #[test]
    fn atom_key_display_marks_altloc() {
        let key = AtomKey {
            residue: ResidueKey::new("A", 5, None),
            residue_name: "SER".into(),
            atom: "OG".into(),
            altloc: Some('B'),
        };
        assert_eq!(key.to_string(), "A:5/SER/OG.B");
    }
}
