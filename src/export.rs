//! Result artifacts: the flagged distribution list and the zipped output tree.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;
use crate::file_writer::table_to_bytes;
use crate::models::{Artifact, DistributionList};

/// Render the distribution list, including the flag column, as a spreadsheet
pub fn export_distribution(list: &DistributionList, file_name: &str) -> Result<Artifact> {
    Ok(Artifact {
        file_name: file_name.to_string(),
        bytes: table_to_bytes(&list.to_table())?,
    })
}

/// Zip everything below `root`; entry names are relative to `root` and use `/`
pub fn archive_folder(root: &Path, file_name: &str) -> Result<Artifact> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    add_dir_contents(&mut zip, root, "")?;

    let bytes = zip.finish()?.into_inner();
    Ok(Artifact {
        file_name: file_name.to_string(),
        bytes,
    })
}

fn add_dir_contents(zip: &mut ZipWriter<Cursor<Vec<u8>>>, dir: &Path, prefix: &str) -> Result<()> {
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let name = format!("{prefix}{}", entry.file_name().to_string_lossy());
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
            add_dir_contents(zip, &path, &format!("{name}/"))?;
        } else {
            zip.start_file(name, options)?;
            zip.write_all(&fs::read(&path)?)?;
        }
    }

    Ok(())
}
