use crate::core::models::builder::{Loaded, ParseError, RawRecord, load};
use crate::core::models::structure::Structure;
use crate::core::topology::registry::TopologyRegistry;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Common interface of structure file adapters.
///
/// Implementors tokenize their format into [`RawRecord`]s and serialize a structure revision
/// back to text. Loading itself is shared and goes through [`load`].
pub trait StructureFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error> + From<ParseError>;

    /// Tokenizes every line of the input into a raw record, one record per line.
    fn read_records(reader: &mut impl BufRead) -> Result<Vec<RawRecord>, Self::Error>;

    /// Writes a structure revision.
    fn write_to(structure: &Structure, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Tokenizes and loads a structure, collecting per-record warnings.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or when no atom could be loaded.
    fn read_from(
        reader: &mut impl BufRead,
        registry: &TopologyRegistry,
    ) -> Result<Loaded, Self::Error> {
        let records = Self::read_records(reader)?;
        Ok(load(&records, registry)?)
    }

    fn read_from_path<P: AsRef<Path>>(
        path: P,
        registry: &TopologyRegistry,
    ) -> Result<Loaded, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, registry)
    }

    fn write_to_path<P: AsRef<Path>>(structure: &Structure, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(structure, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
