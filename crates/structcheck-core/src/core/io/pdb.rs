use super::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::builder::{ParseError, RawAtom, RawRecord};
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use phf::{Set, phf_set};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Record types that carry nothing the structure model uses.
static IGNORED_RECORDS: Set<&'static str> = phf_set! {
    "REMARK", "TER", "END", "CONECT", "ANISOU", "SSBOND", "LINK", "CISPEP", "SEQRES",
    "HELIX", "SHEET", "CRYST1", "ORIGX1", "ORIGX2", "ORIGX3", "SCALE1", "SCALE2", "SCALE3",
    "MTRIX1", "MTRIX2", "MTRIX3", "MASTER", "COMPND", "SOURCE", "KEYWDS", "AUTHOR", "REVDAT",
    "JRNL", "DBREF", "DBREF1", "DBREF2", "SEQADV", "HET", "HETNAM", "HETSYN", "FORMUL",
    "SITE", "MODRES", "SPRSDE", "OBSLTE", "CAVEAT", "NUMMDL", "MDLTYP", "SPLIT", "SIGATM",
    "SIGUIJ", "HYDBND", "SLTBRG",
};

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    line.get(start..end).unwrap_or("").trim()
}

fn column_char(line: &str, index: usize) -> Option<char> {
    line.get(index..index + 1)
        .and_then(|s| s.chars().next())
        .filter(|c| !c.is_whitespace())
}

fn optional(line: &str, start: usize, end: usize) -> Option<String> {
    let value = slice_and_trim(line, start, end);
    (!value.is_empty()).then(|| value.to_string())
}

/// Tokenizes one PDB line. Blank lines are ignored.
pub fn tokenize_line(line: &str) -> RawRecord {
    let tag = slice_and_trim(line, 0, 6);
    match tag {
        "" => RawRecord::Ignored,
        "ATOM" | "HETATM" => RawRecord::Atom(RawAtom {
            hetero: tag == "HETATM",
            name: slice_and_trim(line, 12, 16).to_string(),
            altloc: column_char(line, 16),
            residue_name: slice_and_trim(line, 17, 21).to_string(),
            chain: slice_and_trim(line, 21, 22).to_string(),
            residue_number: slice_and_trim(line, 22, 26).to_string(),
            insertion_code: column_char(line, 26),
            x: slice_and_trim(line, 30, 38).to_string(),
            y: slice_and_trim(line, 38, 46).to_string(),
            z: slice_and_trim(line, 46, 54).to_string(),
            occupancy: optional(line, 54, 60),
            b_factor: optional(line, 60, 66),
            element: optional(line, 76, 78),
        }),
        "HEADER" => RawRecord::Header {
            entry_id: slice_and_trim(line, 62, 66).to_string(),
        },
        "TITLE" => RawRecord::Title(slice_and_trim(line, 10, 80).to_string()),
        "EXPDTA" => RawRecord::Method(slice_and_trim(line, 10, 79).to_string()),
        "MODEL" => RawRecord::Model {
            serial: slice_and_trim(line, 6, 80).to_string(),
        },
        "ENDMDL" => RawRecord::EndModel,
        "REMARK" => match parse_resolution(line) {
            Some(value) => RawRecord::Resolution(value),
            None => RawRecord::Ignored,
        },
        tag if IGNORED_RECORDS.contains(tag) => RawRecord::Ignored,
        tag => RawRecord::Other {
            tag: tag.to_string(),
        },
    }
}

/// `REMARK   2 RESOLUTION.    1.80 ANGSTROMS.`
fn parse_resolution(line: &str) -> Option<String> {
    if slice_and_trim(line, 6, 10) != "2" {
        return None;
    }
    let text = slice_and_trim(line, 10, 80);
    let value = text.strip_prefix("RESOLUTION.")?.split_whitespace().next()?;
    value
        .parse::<f64>()
        .is_ok()
        .then(|| value.to_string())
}

fn atom_name_field(atom: &Atom) -> String {
    if atom.name.len() < 4 && atom.element.len() == 1 {
        format!(" {:<3}", atom.name)
    } else {
        format!("{:<4}", atom.name)
    }
}

fn chain_char(id: &str) -> char {
    id.chars().next().unwrap_or(' ')
}

fn write_atom(
    writer: &mut impl Write,
    serial: usize,
    chain_id: &str,
    residue: &Residue,
    atom: &Atom,
) -> io::Result<()> {
    writeln!(
        writer,
        "{:<6}{:>5} {}{}{:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
        if atom.is_hetero { "HETATM" } else { "ATOM" },
        serial % 100_000,
        atom_name_field(atom),
        atom.altloc.unwrap_or(' '),
        residue.name,
        chain_char(chain_id),
        residue.number,
        residue.insertion_code.unwrap_or(' '),
        atom.position.x,
        atom.position.y,
        atom.position.z,
        atom.occupancy,
        atom.b_factor.unwrap_or(0.0),
        atom.element,
    )
}

pub struct PdbFile;

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_records(reader: &mut impl BufRead) -> Result<Vec<RawRecord>, Self::Error> {
        let mut records = Vec::new();
        for line in reader.lines() {
            records.push(tokenize_line(&line?));
        }
        Ok(records)
    }

    fn write_to(structure: &Structure, writer: &mut impl Write) -> Result<(), Self::Error> {
        let metadata = structure.metadata();
        if let Some(id) = &metadata.entry_id {
            writeln!(writer, "{:<62}{}", "HEADER", id)?;
        }
        if let Some(title) = &metadata.title {
            writeln!(writer, "TITLE     {title}")?;
        }
        if let Some(method) = &metadata.method {
            writeln!(writer, "EXPDTA    {method}")?;
        }
        if let Some(resolution) = metadata.resolution {
            writeln!(writer, "REMARK   2 RESOLUTION. {resolution:>7.2} ANGSTROMS.")?;
        }

        let primary = structure.primary_model();
        for (serial, link) in structure.disulfides().iter().enumerate() {
            let name_of = |key: &crate::core::models::ids::ResidueKey| {
                primary
                    .find_residue(key)
                    .map_or_else(|| "CYS".to_string(), |r| r.name.clone())
            };
            writeln!(
                writer,
                "SSBOND {:>3} {:>3} {} {:>4}{}   {:>3} {} {:>4}{}",
                serial + 1,
                name_of(&link.first),
                chain_char(&link.first.chain),
                link.first.number,
                link.first.insertion_code.unwrap_or(' '),
                name_of(&link.second),
                chain_char(&link.second.chain),
                link.second.number,
                link.second.insertion_code.unwrap_or(' '),
            )?;
        }

        let multi_model = structure.models().len() > 1;
        for model in structure.models() {
            if multi_model {
                writeln!(writer, "MODEL     {:>4}", model.index)?;
            }
            let mut serial = 1;
            for chain in model.chains() {
                let mut last_polymer: Option<&Residue> = None;
                for residue in chain.residues() {
                    for atom in residue.atoms() {
                        write_atom(writer, serial, &chain.id, residue, atom)?;
                        serial += 1;
                    }
                    if residue.class.is_polymer() {
                        last_polymer = Some(residue);
                    }
                }
                if let Some(residue) = last_polymer {
                    writeln!(
                        writer,
                        "TER   {:>5}      {:>3} {}{:>4}{}",
                        serial % 100_000,
                        residue.name,
                        chain_char(&chain.id),
                        residue.number,
                        residue.insertion_code.unwrap_or(' '),
                    )?;
                    serial += 1;
                }
            }
            if multi_model {
                writeln!(writer, "ENDMDL")?;
            }
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ResidueKey;
    use crate::core::models::structure::DisulfideLink;
    use crate::core::topology::registry::TopologyRegistry;
    use std::io::Cursor;

    const SAMPLE: &str = "\
HEADER    HYDROLASE                               01-JAN-00   1ABC
TITLE     TWO CYSTEINES
EXPDTA    X-RAY DIFFRACTION
REMARK   2 RESOLUTION.    1.80 ANGSTROMS.
ATOM      1  N   CYS A   1      11.104   6.134  -6.504  1.00 20.00           N
ATOM      2  CA  CYS A   1      11.639   6.071  -5.147  1.00 20.00           C
ATOM      3  SG ACYS A   1      12.000   7.000  -4.000  0.60 20.00           S
ATOM      4  SG BCYS A   1      12.300   7.100  -4.100  0.40 20.00           S
ATOM      5  SG  CYS A  10      13.500   8.200  -3.200  1.00 20.00           S
HETATM    6 ZN    ZN A 101       0.000   0.000   0.000  1.00 30.00          ZN
TER       7      CYS A  10
FOOBAR junk
END
";

    fn registry() -> TopologyRegistry {
        TopologyRegistry::builtin().unwrap()
    }

    #[test]
    fn tokenizer_reads_fixed_columns() {
        let line = "ATOM      3  SG ACYS A   1B     12.000   7.000  -4.000  0.60 20.00           S  ";
        let RawRecord::Atom(atom) = tokenize_line(line) else {
            panic!("expected an atom record");
        };
        assert_eq!(atom.name, "SG");
        assert_eq!(atom.altloc, Some('A'));
        assert_eq!(atom.residue_name, "CYS");
        assert_eq!(atom.insertion_code, Some('B'));
        assert_eq!(atom.x, "12.000");
        assert_eq!(atom.occupancy.as_deref(), Some("0.60"));
        assert_eq!(atom.element.as_deref(), Some("S"));
    }

    #[test]
    fn short_atom_lines_leave_optional_fields_empty() {
        let line = "ATOM      1  CA  ALA A   1       1.000   2.000   3.000";
        let RawRecord::Atom(atom) = tokenize_line(line) else {
            panic!("expected an atom record");
        };
        assert!(atom.occupancy.is_none());
        assert!(atom.element.is_none());
        assert_eq!(atom.z, "3.000");
    }

    #[test]
    fn read_from_loads_metadata_atoms_and_warnings() {
        let loaded = PdbFile::read_from(&mut Cursor::new(SAMPLE), &registry()).unwrap();
        let metadata = loaded.structure.metadata();
        assert_eq!(metadata.entry_id.as_deref(), Some("1ABC"));
        assert_eq!(metadata.resolution, Some(1.8));
        assert_eq!(metadata.method.as_deref(), Some("X-RAY DIFFRACTION"));
        assert_eq!(loaded.structure.atom_count(), 6);
        assert_eq!(loaded.warnings.len(), 1);
        let chain = &loaded.structure.primary_model().chains()[0];
        assert_eq!(chain.residues().len(), 3);
    }

    #[test]
    fn written_structure_reads_back_with_disulfides() {
        let structure = PdbFile::read_from(&mut Cursor::new(SAMPLE), &registry())
            .unwrap()
            .structure
            .with_disulfides(vec![DisulfideLink::new(
                ResidueKey::new("A", 1, None),
                ResidueKey::new("A", 10, None),
            )]);
        let mut out = Vec::new();
        PdbFile::write_to(&structure, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("SSBOND   1 CYS A    1    CYS A   10"));
        assert!(text.contains("HETATM    6 ZN    ZN A 101"));

        let reread = PdbFile::read_from(&mut Cursor::new(text), &registry()).unwrap();
        assert!(reread.warnings.is_empty());
        assert_eq!(reread.structure.atom_count(), structure.atom_count());
        let sg = reread.structure.primary_model().chains()[0].residues()[0].atoms()[3].clone();
        assert_eq!(sg.altloc, Some('B'));
        assert!((sg.position.x - 12.3).abs() < 1e-9);
    }
}
